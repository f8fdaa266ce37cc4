//! Expression lowering.
//!
//! Every method returns the inferred type list of the expression while
//! appending its instructions. Single-valued expressions return a
//! one-element list; calls may return more.

use ralph_core::{CompileError, U256};
use ralph_parser::ast::{
    ArrayFillExpr, ArrayLitExpr, BinaryExpr, BinaryOp, Expr, IfElseExpr, IndexExpr, LiteralExpr,
    LiteralKind, SelectExpr, UnaryExpr,
};

use super::{alph_token_id, Place};
use crate::fold;
use crate::func_compiler::FuncCompiler;
use crate::instr::Instr;
use crate::types::{format_type_list, Type};

impl<'r, 'ast> FuncCompiler<'r, 'ast> {
    /// Check and lower one expression; returns its type list.
    pub(crate) fn compile_expr(&mut self, expr: &Expr<'ast>) -> Result<Vec<Type>, CompileError> {
        match expr {
            Expr::Literal(lit) => self.compile_literal(lit).map(|ty| vec![ty]),
            Expr::Var(ident) => self.compile_var(ident),
            Expr::Select(select) => self.compile_select(select).map(|ty| vec![ty]),
            Expr::Binary(binary) => self.compile_binary(binary).map(|ty| vec![ty]),
            Expr::Unary(unary) => self.compile_unary(unary).map(|ty| vec![ty]),
            Expr::Paren(paren) => self.compile_expr(paren.expr),
            Expr::ArrayLit(array) => self.compile_array_lit(array).map(|ty| vec![ty]),
            Expr::ArrayFill(fill) => self.compile_array_fill(fill).map(|ty| vec![ty]),
            Expr::Index(index) => self.compile_index(index).map(|ty| vec![ty]),
            Expr::Call(call) => self.compile_call(call),
            Expr::IfElse(if_else) => self.compile_if_else(if_else).map(|ty| vec![ty]),
        }
    }

    // =========================================
    // Leaves
    // =========================================

    fn compile_literal(&mut self, lit: &LiteralExpr<'ast>) -> Result<Type, CompileError> {
        match &lit.kind {
            LiteralKind::U256(value) => {
                self.emit(Instr::u256_const(*value));
                Ok(Type::U256)
            }
            LiteralKind::I256(value) => {
                self.emit(Instr::i256_const(*value));
                Ok(Type::I256)
            }
            LiteralKind::Bool(value) => {
                self.emit(Instr::BoolConst(*value));
                Ok(Type::Bool)
            }
            LiteralKind::ByteVec(bytes) => {
                self.emit(Instr::BytesConst(bytes.to_vec()));
                Ok(Type::ByteVec)
            }
            LiteralKind::Address(bytes) => {
                self.emit(Instr::AddressConst(bytes.to_vec()));
                Ok(Type::Address)
            }
            LiteralKind::Alph => {
                self.emit(Instr::BytesConst(alph_token_id()));
                Ok(Type::ByteVec)
            }
            LiteralKind::String(_) => Err(CompileError::type_error(
                "String literals are only allowed as the debug! message",
            )
            .with_span(lit.span)),
        }
    }

    pub(crate) fn compile_var(
        &mut self,
        ident: &ralph_parser::ast::Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        if let Some(var) = self.scope.lookup(ident.name) {
            var.used = true;
            let (base, ty) = (var.base as usize, var.ty.clone());
            self.load_slots(Place::Local(base), 0, ty.flattened_size())?;
            return Ok(vec![ty]);
        }
        if let Some((&key, slot)) = self.meta.field_slots.get_key_value(ident.name) {
            self.used_fields.insert(key);
            let place = if slot.mutable {
                Place::MutField(slot.base)
            } else {
                Place::ImmField(slot.base)
            };
            let ty = slot.ty.clone();
            self.load_slots(place, 0, ty.flattened_size())?;
            return Ok(vec![ty]);
        }
        if let Some((index, ty)) = self.meta.template_param(ident.name) {
            let ty = ty.clone();
            // Contract references are byte vectors on the wire.
            let code = ty.primitive_code().unwrap_or(3);
            let index = self.narrow(index)?;
            self.emit(Instr::TemplateVariable {
                name: ident.name.to_string(),
                ty: code,
                index,
            });
            return Ok(vec![ty]);
        }
        if let Some(constant) = self.meta.constant(ident.name) {
            let value = constant.value.clone();
            self.used_consts.insert(constant.name);
            self.emit_val(&value);
            return Ok(vec![Type::of_val(&value)]);
        }
        Err(CompileError::name(format!(
            "Variable \"{}\" does not exist",
            ident.name
        ))
        .with_span(ident.span))
    }

    /// Enum variant access `Enum.Variant`, folded to its value.
    fn compile_select(&mut self, select: &SelectExpr<'ast>) -> Result<Type, CompileError> {
        let Some(enum_def) = self.meta.enum_def(select.base.name) else {
            return Err(CompileError::name(format!(
                "Enum \"{}\" does not exist",
                select.base.name
            ))
            .with_span(select.base.span));
        };
        let Some((name, value)) = enum_def
            .variants
            .iter()
            .find(|(name, _)| *name == select.field.name)
        else {
            return Err(CompileError::name(format!(
                "Enum variant \"{}.{}\" does not exist",
                select.base.name, select.field.name
            ))
            .with_span(select.field.span));
        };
        let (enum_name, name, value) = (enum_def.name, *name, value.clone());
        self.used_enum_variants.insert((enum_name, name));
        self.emit_val(&value);
        Ok(Type::of_val(&value))
    }

    // =========================================
    // Operators
    // =========================================

    fn compile_binary(&mut self, binary: &BinaryExpr<'ast>) -> Result<Type, CompileError> {
        if binary.op.is_logical() {
            return self.compile_short_circuit(binary);
        }

        let left = self.compile_expr(binary.left)?;
        let left = self.expect_single(left, binary.left.span())?;
        let right = self.compile_expr(binary.right)?;
        let right = self.expect_single(right, binary.right.span())?;
        let operands = [left.clone(), right.clone()];
        let mismatch = |expected: &str| {
            CompileError::type_error(format!(
                "Invalid operand types {} for operator \"{}\", expected {expected}",
                format_type_list(&operands),
                binary.op.symbol()
            ))
            .with_span(binary.span)
        };

        if binary.op.is_comparison() {
            if !left.is_scalar() || left != right {
                return Err(mismatch("two equal scalar types"));
            }
            let instr = match binary.op {
                BinaryOp::Eq => Instr::Eq,
                BinaryOp::Neq => Instr::Neq,
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => match left {
                    Type::U256 => match binary.op {
                        BinaryOp::Lt => Instr::U256Lt,
                        BinaryOp::Le => Instr::U256Le,
                        BinaryOp::Gt => Instr::U256Gt,
                        _ => Instr::U256Ge,
                    },
                    Type::I256 => match binary.op {
                        BinaryOp::Lt => Instr::I256Lt,
                        BinaryOp::Le => Instr::I256Le,
                        BinaryOp::Gt => Instr::I256Gt,
                        _ => Instr::I256Ge,
                    },
                    _ => return Err(mismatch("two equal numeric types")),
                },
                _ => unreachable!("comparison operators are covered"),
            };
            self.emit(instr);
            return Ok(Type::Bool);
        }

        let instr = match binary.op {
            // `**` admits (U256, U256) -> U256 and (I256, U256) -> I256.
            BinaryOp::Exp => match (&left, &right) {
                (Type::U256, Type::U256) => Instr::U256Exp,
                (Type::I256, Type::U256) => Instr::I256Exp,
                _ => return Err(mismatch("(U256, U256) or (I256, U256)")),
            },
            BinaryOp::ModExp => match (&left, &right) {
                (Type::U256, Type::U256) => Instr::U256ModExp,
                _ => return Err(mismatch("(U256, U256)")),
            },
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::Xor => {
                if left != Type::U256 || right != Type::U256 {
                    return Err(mismatch("(U256, U256)"));
                }
                match binary.op {
                    BinaryOp::Shl => Instr::U256Shl,
                    BinaryOp::Shr => Instr::U256Shr,
                    BinaryOp::BitAnd => Instr::U256BitAnd,
                    BinaryOp::BitOr => Instr::U256BitOr,
                    _ => Instr::U256Xor,
                }
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if !left.is_numeric() || left != right {
                    return Err(mismatch("two equal numeric types"));
                }
                match (&left, binary.op) {
                    (Type::U256, BinaryOp::Add) => Instr::U256Add,
                    (Type::U256, BinaryOp::Sub) => Instr::U256Sub,
                    (Type::U256, BinaryOp::Mul) => Instr::U256Mul,
                    (Type::U256, BinaryOp::Div) => Instr::U256Div,
                    (Type::U256, _) => Instr::U256Mod,
                    (_, BinaryOp::Add) => Instr::I256Add,
                    (_, BinaryOp::Sub) => Instr::I256Sub,
                    (_, BinaryOp::Mul) => Instr::I256Mul,
                    (_, BinaryOp::Div) => Instr::I256Div,
                    (_, _) => Instr::I256Mod,
                }
            }
            _ => unreachable!("logical and comparison operators handled above"),
        };
        self.emit(instr);
        Ok(left)
    }

    /// Lower `&&`/`||` with `IfFalse`/`IfTrue` and a constant fallback.
    fn compile_short_circuit(&mut self, binary: &BinaryExpr<'ast>) -> Result<Type, CompileError> {
        self.compile_condition(binary.left)?;
        let skip = self.emit_placeholder(if binary.op == BinaryOp::And {
            Instr::IfFalse(0)
        } else {
            Instr::IfTrue(0)
        });
        self.compile_condition(binary.right)?;
        let done = self.emit_placeholder(Instr::Jump(0));
        self.patch_jump(skip)?;
        self.emit(Instr::BoolConst(binary.op == BinaryOp::Or));
        self.patch_jump(done)?;
        Ok(Type::Bool)
    }

    fn compile_unary(&mut self, unary: &UnaryExpr<'ast>) -> Result<Type, CompileError> {
        let ty = self.compile_expr(unary.operand)?;
        let ty = self.expect_single(ty, unary.operand.span())?;
        if ty != Type::Bool {
            return Err(CompileError::type_error(format!(
                "Invalid operand type {ty} for operator \"!\", expected Bool"
            ))
            .with_span(unary.span));
        }
        self.emit(Instr::Not);
        Ok(Type::Bool)
    }

    // =========================================
    // Arrays
    // =========================================

    fn compile_array_lit(&mut self, array: &ArrayLitExpr<'ast>) -> Result<Type, CompileError> {
        let mut elem_ty: Option<Type> = None;
        for elem in array.elems {
            let ty = self.compile_expr(elem)?;
            let ty = self.expect_single(ty, elem.span())?;
            match &elem_ty {
                None => elem_ty = Some(ty),
                Some(expected) if *expected != ty => {
                    return Err(CompileError::type_error(format!(
                        "Array elements must share one type, got {expected} and {ty}"
                    ))
                    .with_span(elem.span()));
                }
                Some(_) => {}
            }
        }
        let elem_ty = elem_ty.ok_or_else(|| {
            CompileError::type_error("Array literals cannot be empty").with_span(array.span)
        })?;
        Ok(Type::Array(Box::new(elem_ty), array.elems.len()))
    }

    /// `[v; n]`: evaluate `v` once into a temporary, then load it n
    /// times.
    fn compile_array_fill(&mut self, fill: &ArrayFillExpr<'ast>) -> Result<Type, CompileError> {
        let size = match fold::fold(fill.size)? {
            Some(value) => value.as_index().filter(|n| *n > 0),
            None => None,
        }
        .ok_or_else(|| {
            CompileError::type_error("Array size must be a positive constant U256 expression")
                .with_span(fill.size.span())
        })?;

        let ty = self.compile_expr(fill.value)?;
        let ty = self.expect_single(ty, fill.value.span())?;
        let slots = ty.flattened_size();
        if size > 1 {
            let tmp = self.scope.fresh_temp(slots, fill.span)? as usize;
            self.store_slots(Place::Local(tmp), 0, slots)?;
            for _ in 0..size {
                self.load_slots(Place::Local(tmp), 0, slots)?;
            }
        }
        Ok(Type::Array(Box::new(ty), size))
    }

    fn compile_index(&mut self, index: &IndexExpr<'ast>) -> Result<Type, CompileError> {
        let (root, indices) = collect_expr_indices(index);
        let (place, root_ty) = self.index_root(root)?;
        let (elem_ty, offset) = self.compile_indices(root_ty, &indices)?;
        self.load_indexed(place, &elem_ty, offset, index.span)?;
        Ok(elem_ty)
    }

    /// Resolve the root of an index chain to a place.
    ///
    /// A named local or field array is addressed directly. Any other
    /// array-valued expression is evaluated into a fresh synthesized
    /// local first, so its side effects run exactly once.
    fn index_root(&mut self, root: &Expr<'ast>) -> Result<(Place, Type), CompileError> {
        if let Expr::Var(ident) = root {
            if let Some(var) = self.scope.lookup(ident.name) {
                var.used = true;
                return Ok((Place::Local(var.base as usize), var.ty.clone()));
            }
            if let Some((&key, slot)) = self.meta.field_slots.get_key_value(ident.name) {
                self.used_fields.insert(key);
                let place = if slot.mutable {
                    Place::MutField(slot.base)
                } else {
                    Place::ImmField(slot.base)
                };
                return Ok((place, slot.ty.clone()));
            }
            // Fall through for constants and template variables, which
            // cannot hold arrays.
        }
        let types = self.compile_expr(root)?;
        let ty = self.expect_single(types, root.span())?;
        if !matches!(ty, Type::Array(..)) {
            return Err(CompileError::type_error(format!(
                "Cannot index into non-array type {ty}"
            ))
            .with_span(root.span()));
        }
        let slots = ty.flattened_size();
        let tmp = self.scope.fresh_temp(slots, root.span())? as usize;
        self.store_slots(Place::Local(tmp), 0, slots)?;
        Ok((Place::Local(tmp), ty))
    }

    // =========================================
    // If/else expressions
    // =========================================

    /// Same shape as the if statement, but leaves a value on the stack
    /// and requires both branches.
    fn compile_if_else(&mut self, if_else: &IfElseExpr<'ast>) -> Result<Type, CompileError> {
        self.compile_condition(if_else.cond)?;
        let if_false = self.emit_placeholder(Instr::IfFalse(0));
        let then_ty = self.compile_expr(if_else.then_expr)?;
        let then_ty = self.expect_single(then_ty, if_else.then_expr.span())?;
        let done = self.emit_placeholder(Instr::Jump(0));
        self.patch_jump(if_false)?;
        let else_ty = self.compile_expr(if_else.else_expr)?;
        let else_ty = self.expect_single(else_ty, if_else.else_expr.span())?;
        self.patch_jump(done)?;
        if then_ty != else_ty {
            return Err(CompileError::type_error(format!(
                "Invalid if-else expression: branch types {then_ty} and {else_ty} do not match"
            ))
            .with_span(if_else.span));
        }
        Ok(then_ty)
    }

    /// Whether an expression is the literal `ALPH` (ignoring parens).
    pub(crate) fn is_alph_literal(expr: &Expr<'_>) -> bool {
        match expr {
            Expr::Literal(lit) => matches!(lit.kind, LiteralKind::Alph),
            Expr::Paren(paren) => Self::is_alph_literal(paren.expr),
            _ => false,
        }
    }

    /// The bytes of a string literal, for `debug!`.
    pub(crate) fn string_literal(expr: &Expr<'ast>) -> Option<&'ast [u8]> {
        match expr {
            Expr::Literal(lit) => match lit.kind {
                LiteralKind::String(bytes) => Some(bytes),
                _ => None,
            },
            Expr::Paren(paren) => Self::string_literal(paren.expr),
            _ => None,
        }
    }

    /// Push a small `U256` constant.
    pub(crate) fn emit_usize(&mut self, value: usize) {
        self.emit(Instr::u256_const(U256::from(value)));
    }
}

/// Flatten an index-expression chain into its root and index
/// expressions, outermost last.
fn collect_expr_indices<'b, 'ast>(
    index: &'b IndexExpr<'ast>,
) -> (&'b Expr<'ast>, Vec<&'b Expr<'ast>>) {
    match index.base {
        Expr::Index(inner) => {
            let (root, mut indices) = collect_expr_indices(inner);
            indices.push(index.index);
            (root, indices)
        }
        other => (other, vec![index.index]),
    }
}
