//! Return-path analysis.
//!
//! A function with a non-empty return type must terminate on every
//! path: each path ends in `return` or `panic!`. An `if` statement
//! terminates only when it has an `else` branch and every branch
//! terminates; loops never count as terminating because their
//! conditions may be false on entry.

use ralph_parser::ast::{CallTarget, Expr, Stmt};

/// Whether a block terminates on every path.
pub fn block_terminates(stmts: &[Stmt<'_>]) -> bool {
    stmts.iter().any(stmt_terminates)
}

/// Whether a statement unconditionally leaves the function.
pub fn stmt_terminates(stmt: &Stmt<'_>) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Expr(expr_stmt) => is_panic(expr_stmt.expr),
        Stmt::If(if_stmt) => {
            let Some(else_block) = &if_stmt.else_block else {
                return false;
            };
            if_stmt
                .branches
                .iter()
                .all(|branch| block_terminates(branch.body.stmts))
                && block_terminates(else_block.stmts)
        }
        _ => false,
    }
}

/// Whether an expression is a `panic!` call.
pub fn is_panic(expr: &Expr<'_>) -> bool {
    matches!(
        expr,
        Expr::Call(call) if matches!(call.target, CallTarget::Builtin(name) if name.name == "panic")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ralph_parser::ast::{Item, Parser};

    fn body_terminates(body: &str) -> bool {
        let arena = Bump::new();
        let source =
            format!("Contract Foo(mut x: U256) {{ pub fn f(c: Bool) -> U256 {{ {body} }} }}");
        let text: &str = &source;
        let unit = Parser::parse(text, &arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        block_terminates(contract.funcs[0].body.unwrap().stmts)
    }

    #[test]
    fn plain_return_terminates() {
        assert!(body_terminates("return 1"));
    }

    #[test]
    fn if_without_else_does_not_terminate() {
        assert!(!body_terminates("if (c) { return 1 }"));
    }

    #[test]
    fn if_else_with_returns_terminates() {
        assert!(body_terminates("if (c) { return 1 } else { return 2 }"));
    }

    #[test]
    fn panic_is_a_terminator() {
        assert!(body_terminates("if (c) { return 1 } else { panic!(0) }"));
    }

    #[test]
    fn loops_never_terminate_paths() {
        assert!(!body_terminates("while (c) { return 1 }"));
    }

    #[test]
    fn else_if_chains_require_final_else() {
        assert!(!body_terminates(
            "if (c) { return 1 } else if (!c) { return 2 }"
        ));
        assert!(body_terminates(
            "if (c) { return 1 } else if (!c) { return 2 } else { panic!() }"
        ));
    }
}
