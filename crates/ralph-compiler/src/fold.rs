//! Constant folding.
//!
//! Folds `+ - * / % << >> & | ^` over literal `U256` operands. Used for
//! array sizes and array indices; anything mixed or non-literal is left
//! for runtime. A constant expression that would trap at runtime
//! (overflow, division by zero) is a compile error instead.

use ralph_core::{CompileError, Val, U256};
use ralph_parser::ast::{BinaryOp, Expr, LiteralKind};

/// Try to fold an expression to a compile-time value.
///
/// `Ok(None)` means the expression is not constant; `Err` means it is
/// constant but invalid.
pub fn fold(expr: &Expr<'_>) -> Result<Option<Val>, CompileError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_val(&lit.kind)),
        Expr::Paren(paren) => fold(paren.expr),
        Expr::Binary(binary) => {
            let (Some(left), Some(right)) = (fold(binary.left)?, fold(binary.right)?) else {
                return Ok(None);
            };
            let (Val::U256(a), Val::U256(b)) = (left, right) else {
                return Ok(None);
            };
            fold_u256(binary.op, a, b)
        }
        _ => Ok(None),
    }
}

/// The value of a literal, when it has one.
fn literal_val(kind: &LiteralKind<'_>) -> Option<Val> {
    Some(match kind {
        LiteralKind::U256(v) => Val::U256(*v),
        LiteralKind::I256(v) => Val::I256(*v),
        LiteralKind::Bool(b) => Val::Bool(*b),
        LiteralKind::ByteVec(bs) => Val::ByteVec(bs.to_vec()),
        LiteralKind::Address(bs) => Val::Address(bs.to_vec()),
        LiteralKind::Alph | LiteralKind::String(_) => return None,
    })
}

fn fold_u256(op: BinaryOp, a: U256, b: U256) -> Result<Option<Val>, CompileError> {
    let overflow =
        || CompileError::type_error(format!("Constant expression overflows U256: {a} {} {b}", op.symbol()));
    let value = match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Div => a
            .checked_div(b)
            .ok_or_else(|| CompileError::type_error("Division by zero in constant expression"))?,
        BinaryOp::Mod => a
            .checked_rem(b)
            .ok_or_else(|| CompileError::type_error("Division by zero in constant expression"))?,
        BinaryOp::Shl | BinaryOp::Shr => {
            if b >= U256::from(256u64) {
                return Err(CompileError::type_error(
                    "Shift amount exceeds 255 in constant expression",
                ));
            }
            let shift = b.to::<usize>();
            if op == BinaryOp::Shl {
                a << shift
            } else {
                a >> shift
            }
        }
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::Xor => a ^ b,
        _ => return Ok(None),
    };
    Ok(Some(Val::U256(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ralph_parser::ast::{Item, Parser, Stmt};

    fn fold_index<'a>(arena: &'a Bump, index: &str) -> Result<Option<Val>, CompileError> {
        let source = format!(
            "Contract Foo(a: [U256; 9]) {{ pub fn f() -> U256 {{ return a[{index}] }} }}"
        );
        let text = arena.alloc_str(&source);
        let unit = Parser::parse(text, arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        let Stmt::Return(ret) = contract.funcs[0].body.unwrap().stmts[0] else {
            panic!("expected return");
        };
        let Expr::Index(idx) = &ret.values[0] else {
            panic!("expected index");
        };
        fold(idx.index)
    }

    #[test]
    fn folds_literal_arithmetic() {
        let arena = Bump::new();
        let val = fold_index(&arena, "2 + 3 * 2").unwrap().unwrap();
        assert_eq!(val, Val::U256(U256::from(8u64)));
    }

    #[test]
    fn folds_shifts_and_bitwise() {
        let arena = Bump::new();
        let val = fold_index(&arena, "(1 << 3) | 1").unwrap().unwrap();
        assert_eq!(val, Val::U256(U256::from(9u64)));
    }

    #[test]
    fn leaves_variables_alone() {
        let arena = Bump::new();
        assert_eq!(fold_index(&arena, "n + 1").unwrap(), None);
    }

    #[test]
    fn rejects_constant_division_by_zero() {
        let arena = Bump::new();
        assert!(fold_index(&arena, "4 / 0").is_err());
    }

    #[test]
    fn rejects_constant_overflow() {
        let arena = Bump::new();
        assert!(fold_index(&arena, "0 - 1").is_err());
    }
}
