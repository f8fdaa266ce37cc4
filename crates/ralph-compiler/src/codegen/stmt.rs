//! Statement lowering.

use ralph_core::{CompileError, Span};
use ralph_parser::ast::{
    AssignStmt, AssignTarget, EmitStmt, Expr, ExprStmt, ForStmt, Ident, IfStmt, LetStmt,
    ReturnStmt, Stmt, WhileStmt,
};

use super::Place;
use crate::func_compiler::FuncCompiler;
use crate::instr::Instr;
use crate::return_checker;
use crate::types::{format_type_list, Type};

impl<'r, 'ast> FuncCompiler<'r, 'ast> {
    /// Check and lower one statement.
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt<'ast>) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let(let_stmt) => self.compile_let(let_stmt),
            Stmt::Assign(assign) => self.compile_assign(assign),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::While(while_stmt) => self.compile_while(while_stmt),
            Stmt::For(for_stmt) => self.compile_for(for_stmt),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::Emit(emit) => self.compile_emit(emit),
            Stmt::Expr(expr_stmt) => self.compile_expr_stmt(expr_stmt),
        }
    }

    fn compile_block(&mut self, stmts: &[Stmt<'ast>]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    // =========================================
    // Bindings and assignment
    // =========================================

    fn compile_let(&mut self, let_stmt: &LetStmt<'ast>) -> Result<(), CompileError> {
        let types = self.compile_expr(let_stmt.value)?;
        if types.len() != let_stmt.vars.len() {
            return Err(CompileError::type_error(format!(
                "Invalid let binding: expression has {} value(s), found {} variable(s)",
                types.len(),
                let_stmt.vars.len()
            ))
            .with_span(let_stmt.span));
        }

        // Declare left to right so slot numbering follows source order.
        let mut slots: Vec<Option<(usize, usize)>> = Vec::with_capacity(types.len());
        for (var, ty) in let_stmt.vars.iter().zip(&types) {
            if var.is_anonymous() {
                slots.push(None);
                continue;
            }
            let base = self.scope.declare(
                var.name.name,
                ty.clone(),
                var.mutable,
                var.unused,
                false,
                var.name.span,
            )?;
            slots.push(Some((base as usize, ty.flattened_size())));
        }

        // Values sit on the stack left to right; store right to left,
        // popping anonymous slots.
        for (slot, ty) in slots.iter().zip(&types).rev() {
            match slot {
                Some((base, size)) => self.store_slots(Place::Local(*base), 0, *size)?,
                None => {
                    for _ in 0..ty.flattened_size() {
                        self.emit(Instr::Pop);
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, assign: &AssignStmt<'ast>) -> Result<(), CompileError> {
        let types = self.compile_expr(assign.value)?;
        if types.len() != assign.targets.len() {
            return Err(CompileError::type_error(format!(
                "Invalid assignment: expression has {} value(s), found {} target(s)",
                types.len(),
                assign.targets.len()
            ))
            .with_span(assign.span));
        }
        for (target, ty) in assign.targets.iter().zip(&types).rev() {
            self.compile_store_target(target, ty)?;
        }
        Ok(())
    }

    /// Store the top-of-stack value(s) into one assignment target.
    fn compile_store_target(
        &mut self,
        target: &AssignTarget<'ast>,
        value_ty: &Type,
    ) -> Result<(), CompileError> {
        match target {
            AssignTarget::Anonymous(_) => {
                for _ in 0..value_ty.flattened_size() {
                    self.emit(Instr::Pop);
                }
                Ok(())
            }
            AssignTarget::Var(ident) => {
                let (place, ty) = self.resolve_mutable_var(ident)?;
                self.check_assignable_value(&ty, value_ty, ident.name, ident.span)?;
                self.store_slots(place, 0, ty.flattened_size())
            }
            AssignTarget::Index(_) => {
                let (root, indices) = collect_target_indices(target);
                let (place, root_ty) = self.resolve_mutable_var(root)?;
                let (elem_ty, offset) = self.compile_indices(root_ty, &indices)?;
                self.check_assignable_value(&elem_ty, value_ty, root.name, root.span)?;
                self.store_indexed(place, &elem_ty, offset, root.span)
            }
        }
    }

    fn check_assignable_value(
        &self,
        expected: &Type,
        got: &Type,
        name: &str,
        span: Span,
    ) -> Result<(), CompileError> {
        if self.is_assignable(expected, got) {
            Ok(())
        } else {
            Err(CompileError::type_error(format!(
                "Cannot assign {got} to \"{name}\": expected {expected}"
            ))
            .with_span(span))
        }
    }

    /// Resolve a named assignment target, enforcing mutability.
    fn resolve_mutable_var(
        &mut self,
        ident: &Ident<'ast>,
    ) -> Result<(Place, Type), CompileError> {
        if let Some(var) = self.scope.lookup(ident.name) {
            if !var.mutable {
                return Err(CompileError::mutability(format!(
                    "Cannot assign to immutable variable \"{}\"",
                    ident.name
                ))
                .with_span(ident.span));
            }
            var.assigned = true;
            return Ok((Place::Local(var.base as usize), var.ty.clone()));
        }
        if let Some((&key, slot)) = self.meta.field_slots.get_key_value(ident.name) {
            if !slot.mutable {
                return Err(CompileError::mutability(format!(
                    "Cannot assign to immutable field \"{}\"",
                    ident.name
                ))
                .with_span(ident.span));
            }
            self.wrote_fields.insert(key);
            return Ok((Place::MutField(slot.base), slot.ty.clone()));
        }
        if self.meta.template_param(ident.name).is_some() {
            return Err(CompileError::mutability(format!(
                "Cannot assign to template variable \"{}\"",
                ident.name
            ))
            .with_span(ident.span));
        }
        Err(CompileError::name(format!(
            "Variable \"{}\" does not exist",
            ident.name
        ))
        .with_span(ident.span))
    }

    // =========================================
    // Control flow
    // =========================================

    /// Lower an if statement. With an else branch the shape is
    /// `IfFalse(then+1), <then>, Jump(else), <else>`; without one,
    /// every branch must leave the function.
    fn compile_if(&mut self, if_stmt: &IfStmt<'ast>) -> Result<(), CompileError> {
        if if_stmt.else_block.is_none() {
            let all_terminate = if_stmt
                .branches
                .iter()
                .all(|branch| return_checker::block_terminates(branch.body.stmts));
            if !all_terminate {
                return Err(CompileError::return_error(
                    "Expected return statement in the branches of an if statement without else",
                )
                .with_span(if_stmt.span));
            }
        }
        self.compile_if_arms(&if_stmt.branches[..], if_stmt.else_block.as_ref().map(|b| b.stmts))
    }

    fn compile_if_arms(
        &mut self,
        branches: &[ralph_parser::ast::IfBranch<'ast>],
        else_stmts: Option<&'ast [Stmt<'ast>]>,
    ) -> Result<(), CompileError> {
        let Some((first, rest)) = branches.split_first() else {
            if let Some(stmts) = else_stmts {
                self.compile_block(stmts)?;
            }
            return Ok(());
        };
        self.compile_condition(first.cond)?;
        let if_false = self.emit_placeholder(Instr::IfFalse(0));
        self.compile_block(first.body.stmts)?;
        let has_tail = !rest.is_empty() || else_stmts.is_some();
        if has_tail {
            let jump = self.emit_placeholder(Instr::Jump(0));
            self.patch_jump(if_false)?;
            self.compile_if_arms(rest, else_stmts)?;
            self.patch_jump(jump)?;
        } else {
            self.patch_jump(if_false)?;
        }
        Ok(())
    }

    /// Lower `while` to `<cond>, IfFalse(body+1), <body>, Jump(-total)`.
    fn compile_while(&mut self, while_stmt: &WhileStmt<'ast>) -> Result<(), CompileError> {
        let loop_start = self.here();
        self.compile_condition(while_stmt.cond)?;
        let if_false = self.emit_placeholder(Instr::IfFalse(0));
        self.compile_block(while_stmt.body.stmts)?;
        self.emit_jump_back(loop_start)?;
        self.patch_jump(if_false)
    }

    /// Lower `for` as `init; while (cond) { body; update }`.
    fn compile_for(&mut self, for_stmt: &ForStmt<'ast>) -> Result<(), CompileError> {
        self.compile_stmt(for_stmt.init)?;
        let loop_start = self.here();
        self.compile_condition(for_stmt.cond)?;
        let if_false = self.emit_placeholder(Instr::IfFalse(0));
        self.compile_block(for_stmt.body.stmts)?;
        self.compile_stmt(for_stmt.update)?;
        self.emit_jump_back(loop_start)?;
        self.patch_jump(if_false)
    }

    pub(crate) fn compile_condition(&mut self, cond: &Expr<'ast>) -> Result<(), CompileError> {
        let types = self.compile_expr(cond)?;
        if types != [Type::Bool] {
            return Err(CompileError::type_error(format!(
                "Invalid condition type {}, expected Bool",
                format_type_list(&types)
            ))
            .with_span(cond.span()));
        }
        Ok(())
    }

    // =========================================
    // Return, emit, expression statements
    // =========================================

    fn compile_return(&mut self, ret: &ReturnStmt<'ast>) -> Result<(), CompileError> {
        let mut types = Vec::new();
        for value in ret.values {
            types.extend(self.compile_expr(value)?);
        }
        if !self.list_assignable(&self.func.returns, &types) {
            return Err(CompileError::type_error(format!(
                "Invalid return types: got {}, expected {} for function \"{}\"",
                format_type_list(&types),
                format_type_list(&self.func.returns),
                self.func.name
            ))
            .with_span(ret.span));
        }
        self.emit(Instr::Return);
        Ok(())
    }

    /// Lower `emit` to the event-table index, the arguments, and
    /// `Log(1 + n)`.
    fn compile_emit(&mut self, emit: &EmitStmt<'ast>) -> Result<(), CompileError> {
        let Some(&event_index) = self.meta.event_index.get(emit.event.name) else {
            return Err(CompileError::name(format!(
                "Event \"{}\" does not exist",
                emit.event.name
            ))
            .with_span(emit.event.span));
        };
        self.emit(Instr::u256_const(ralph_core::U256::from(event_index)));
        let mut types = Vec::new();
        for arg in emit.args {
            let ty = self.compile_expr(arg)?;
            types.push(self.expect_single(ty, arg.span())?);
        }
        let event = &self.meta.events[event_index];
        if !self.list_assignable(&event.params, &types) {
            return Err(CompileError::type_error(format!(
                "Invalid args type {} for event {}",
                format_type_list(&types),
                event.signature()
            ))
            .with_span(emit.span));
        }
        let count = self.narrow(1 + types.len())?;
        self.emit(Instr::Log(count));
        Ok(())
    }

    fn compile_expr_stmt(&mut self, expr_stmt: &ExprStmt<'ast>) -> Result<(), CompileError> {
        let types = self.compile_expr(expr_stmt.expr)?;
        if !types.is_empty() {
            return Err(CompileError::type_error(format!(
                "Expression statements must not return values, got {}",
                format_type_list(&types)
            ))
            .with_span(expr_stmt.span));
        }
        Ok(())
    }
}

/// Flatten an assignment-target index chain into its root identifier
/// and index expressions, outermost last.
fn collect_target_indices<'b, 'ast>(
    target: &'b AssignTarget<'ast>,
) -> (&'b Ident<'ast>, Vec<&'b Expr<'ast>>) {
    match target {
        AssignTarget::Index(index) => {
            let (root, mut indices) = collect_target_indices(index.base);
            indices.push(index.index);
            (root, indices)
        }
        AssignTarget::Var(ident) => (ident, Vec::new()),
        AssignTarget::Anonymous(_) => unreachable!("anonymous targets are never indexed"),
    }
}
