//! Call lowering: builtins, local and external calls, braces-approval
//! clauses, and the static field-encoding functions.

use ralph_core::CompileError;
use ralph_parser::ast::{ApprovalClause, CallExpr, CallTarget, Expr, Ident};

use super::Place;
use crate::builtins::{self, AssetClass, ParamKind};
use crate::func_compiler::FuncCompiler;
use crate::instr::Instr;
use crate::registry::DeclKind;
use crate::types::{format_type_list, Type};

impl<'r, 'ast> FuncCompiler<'r, 'ast> {
    /// Check and lower a call expression; returns its type list.
    pub(crate) fn compile_call(&mut self, call: &CallExpr<'ast>) -> Result<Vec<Type>, CompileError> {
        match call.target {
            CallTarget::Builtin(name) => self.compile_builtin(call, name),
            CallTarget::Local(name) => self.compile_local_call(call, name),
            CallTarget::Method { receiver, func } => {
                self.compile_external_call(call, receiver, func)
            }
            CallTarget::Static { ty, func } => self.compile_static_call(call, ty, func),
        }
    }

    // =========================================
    // Builtins
    // =========================================

    fn compile_builtin(
        &mut self,
        call: &CallExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        if !call.approvals.is_empty() {
            return Err(CompileError::assets(format!(
                "Braces syntax is not allowed for builtin \"{}!\"",
                name.name
            ))
            .with_span(call.span));
        }
        match name.name {
            "assert" => self.compile_assert(call, false),
            "checkCaller" => {
                self.has_caller_check = true;
                self.compile_assert(call, true)
            }
            "panic" => self.compile_panic(call),
            "debug" => self.compile_debug(call),
            _ => {
                if builtins::asset_builtin(name.name).is_some() {
                    self.compile_asset_builtin(call, name)
                } else if builtins::simple_builtin(name.name).is_some() {
                    self.compile_simple_builtin(call, name)
                } else {
                    Err(CompileError::name(format!(
                        "Builtin function \"{}!\" does not exist",
                        name.name
                    ))
                    .with_span(name.span))
                }
            }
        }
    }

    /// `assert!(cond)`, `assert!(cond, code)`, and `checkCaller!(cond,
    /// code)`.
    fn compile_assert(
        &mut self,
        call: &CallExpr<'ast>,
        requires_code: bool,
    ) -> Result<Vec<Type>, CompileError> {
        let builtin_name = if requires_code { "checkCaller" } else { "assert" };
        match call.args {
            [cond] if !requires_code => {
                self.expect_arg(cond, &Type::Bool, builtin_name)?;
                self.emit(Instr::Assert);
                Ok(Vec::new())
            }
            [cond, code] => {
                self.expect_arg(cond, &Type::Bool, builtin_name)?;
                self.expect_arg(code, &Type::U256, builtin_name)?;
                self.emit(Instr::AssertWithErrorCode);
                Ok(Vec::new())
            }
            _ => Err(CompileError::type_error(format!(
                "Invalid number of arguments for builtin \"{builtin_name}!\""
            ))
            .with_span(call.span)),
        }
    }

    /// `panic!()` or `panic!(code)`. A terminator for the return-path
    /// analysis.
    fn compile_panic(&mut self, call: &CallExpr<'ast>) -> Result<Vec<Type>, CompileError> {
        match call.args {
            [] => {}
            [code] => {
                self.expect_arg(code, &Type::U256, "panic")?;
            }
            _ => {
                return Err(CompileError::type_error(
                    "Invalid number of arguments for builtin \"panic!\"",
                )
                .with_span(call.span));
            }
        }
        self.emit(Instr::Panic);
        Ok(Vec::new())
    }

    /// `debug!("message")`, the only debug-only builtin. The message
    /// is kept in the debug bytecode and dropped from production.
    fn compile_debug(&mut self, call: &CallExpr<'ast>) -> Result<Vec<Type>, CompileError> {
        let [message] = call.args else {
            return Err(CompileError::type_error(
                "Invalid number of arguments for builtin \"debug!\"",
            )
            .with_span(call.span));
        };
        let Some(bytes) = Self::string_literal(message) else {
            return Err(CompileError::type_error(
                "debug! requires a string literal message",
            )
            .with_span(message.span()));
        };
        if self.include_debug {
            self.emit(Instr::BytesConst(bytes.to_vec()));
            self.emit(Instr::Log(1));
        }
        Ok(Vec::new())
    }

    /// Token builtins: the `ALPH` literal in the token-id slot selects
    /// the `…Alph` instruction and the argument is not emitted.
    fn compile_asset_builtin(
        &mut self,
        call: &CallExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        let builtin = builtins::asset_builtin(name.name).expect("checked by the caller");
        if call.args.len() != builtin.params.len() {
            return Err(CompileError::type_error(format!(
                "Invalid number of arguments for builtin \"{}!\"",
                name.name
            ))
            .with_span(call.span));
        }
        let mut alph = false;
        for (param, arg) in builtin.params.iter().zip(call.args) {
            match param {
                ParamKind::Address => self.expect_arg(arg, &Type::Address, name.name)?,
                ParamKind::Amount => self.expect_arg(arg, &Type::U256, name.name)?,
                ParamKind::TokenId => {
                    if Self::is_alph_literal(arg) {
                        alph = true;
                    } else {
                        self.expect_arg(arg, &Type::ByteVec, name.name)?;
                    }
                }
            }
        }
        match builtin.class {
            AssetClass::Preapproved => self.uses_preapproved = true,
            AssetClass::ContractAssets => self.uses_contract_assets = true,
            AssetClass::None => {}
        }
        self.emit(if alph {
            builtin.alph_instr.clone()
        } else {
            builtin.token_instr.clone()
        });
        Ok(if builtin.returns_amount {
            vec![Type::U256]
        } else {
            Vec::new()
        })
    }

    fn compile_simple_builtin(
        &mut self,
        call: &CallExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        let builtin = builtins::simple_builtin(name.name).expect("checked by the caller");
        if call.args.len() != builtin.params.len() {
            return Err(CompileError::type_error(format!(
                "Invalid number of arguments for builtin \"{}!\"",
                name.name
            ))
            .with_span(call.span));
        }
        for (param, arg) in builtin.params.iter().zip(call.args) {
            self.expect_arg(arg, &param.ty(), name.name)?;
        }
        self.emit(builtin.instr.clone());
        Ok(builtin.ret.map(|p| vec![p.ty()]).unwrap_or_default())
    }

    /// Compile one argument and require its type.
    fn expect_arg(
        &mut self,
        arg: &Expr<'ast>,
        expected: &Type,
        builtin: &str,
    ) -> Result<(), CompileError> {
        let ty = self.compile_expr(arg)?;
        let ty = self.expect_single(ty, arg.span())?;
        if !self.is_assignable(expected, &ty) {
            return Err(CompileError::type_error(format!(
                "Invalid argument type {ty} for builtin \"{builtin}!\", expected {expected}"
            ))
            .with_span(arg.span()));
        }
        Ok(())
    }

    // =========================================
    // Local and external calls
    // =========================================

    fn compile_local_call(
        &mut self,
        call: &CallExpr<'ast>,
        name: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        let Some((index, callee)) = self.meta.func(name.name) else {
            return Err(CompileError::name(format!(
                "Function \"{}\" does not exist in \"{}\"",
                name.name, self.meta.name
            ))
            .with_span(name.span));
        };
        let (params, returns, callee_preapproved) = (
            callee.params.clone(),
            callee.returns.clone(),
            callee.annotations.preapproved_assets,
        );
        self.check_braces(call, name.name, callee_preapproved)?;
        self.compile_approvals(call.approvals)?;
        self.compile_call_args(call, name.name, &params)?;
        let index = self.narrow(index)?;
        self.emit(Instr::CallLocal(index));
        Ok(returns)
    }

    fn compile_external_call(
        &mut self,
        call: &CallExpr<'ast>,
        receiver: Ident<'ast>,
        func: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        // `Type.f(…)` with a declared type name is a misuse of an
        // instance method.
        if !self.scope.contains(receiver.name)
            && !self.meta.field_slots.contains_key(receiver.name)
            && self.meta.template_param(receiver.name).is_none()
        {
            if self.registry.get(receiver.name).is_some() {
                return Err(CompileError::type_error(format!(
                    "Function \"{}\" of contract \"{}\" cannot be called statically",
                    func.name, receiver.name
                ))
                .with_span(call.span));
            }
            return Err(CompileError::name(format!(
                "Variable \"{}\" does not exist",
                receiver.name
            ))
            .with_span(receiver.span));
        }

        // Resolve the receiver's contract type without emitting yet.
        let receiver_ty = self.peek_var_type(&receiver)?;
        let Type::Contract(target_name) = receiver_ty else {
            return Err(CompileError::type_error(format!(
                "\"{}\" is not a contract instance",
                receiver.name
            ))
            .with_span(receiver.span));
        };
        let target = self
            .registry
            .get(&target_name)
            .ok_or_else(|| {
                CompileError::internal(format!("unresolved contract type \"{target_name}\""))
            })?;
        let Some((index, callee)) = target.func(func.name) else {
            return Err(CompileError::name(format!(
                "Function \"{}\" does not exist in \"{target_name}\"",
                func.name
            ))
            .with_span(func.span));
        };
        if !callee.is_pub {
            return Err(CompileError::type_error(format!(
                "Function \"{target_name}.{}\" is private",
                func.name
            ))
            .with_span(func.span));
        }
        let (params, returns, callee_preapproved) = (
            callee.params.clone(),
            callee.returns.clone(),
            callee.annotations.preapproved_assets,
        );
        self.check_braces(call, func.name, callee_preapproved)?;
        self.compile_approvals(call.approvals)?;
        self.compile_call_args(call, func.name, &params)?;
        // The contract id goes on top of the arguments.
        self.compile_var(&receiver)?;
        let index = self.narrow(index)?;
        self.emit(Instr::CallExternal(index));
        Ok(returns)
    }

    /// The type a variable would load, without emitting instructions.
    fn peek_var_type(&mut self, ident: &Ident<'ast>) -> Result<Type, CompileError> {
        if let Some(var) = self.scope.lookup(ident.name) {
            return Ok(var.ty.clone());
        }
        if let Some(slot) = self.meta.field_slots.get(ident.name) {
            return Ok(slot.ty.clone());
        }
        if let Some((_, ty)) = self.meta.template_param(ident.name) {
            return Ok(ty.clone());
        }
        Err(CompileError::name(format!(
            "Variable \"{}\" does not exist",
            ident.name
        ))
        .with_span(ident.span))
    }

    /// Braces usage must match the callee's `preapprovedAssets`
    /// annotation.
    fn check_braces(
        &self,
        call: &CallExpr<'ast>,
        name: &str,
        callee_preapproved: bool,
    ) -> Result<(), CompileError> {
        if callee_preapproved && call.approvals.is_empty() {
            return Err(CompileError::assets(format!(
                "Function \"{name}\" needs preapproved assets, please use the braces syntax"
            ))
            .with_span(call.span));
        }
        if !callee_preapproved && !call.approvals.is_empty() {
            return Err(CompileError::assets(format!(
                "Function \"{name}\" does not use preapproved assets"
            ))
            .with_span(call.span));
        }
        Ok(())
    }

    /// Lower approval clauses: `<addr>, <amount>, ApproveAlph` or
    /// `<addr>, <tokenId>, <amount>, ApproveToken` per clause.
    fn compile_approvals(
        &mut self,
        approvals: &[ApprovalClause<'ast>],
    ) -> Result<(), CompileError> {
        for clause in approvals {
            let addr_ty = self.compile_expr(clause.address)?;
            let addr_ty = self.expect_single(addr_ty, clause.address.span())?;
            if addr_ty != Type::Address {
                return Err(CompileError::type_error(format!(
                    "Invalid approval address type {addr_ty}, expected Address"
                ))
                .with_span(clause.address.span()));
            }
            let alph = Self::is_alph_literal(clause.token);
            if !alph {
                let token_ty = self.compile_expr(clause.token)?;
                let token_ty = self.expect_single(token_ty, clause.token.span())?;
                if token_ty != Type::ByteVec {
                    return Err(CompileError::type_error(format!(
                        "Invalid approval token id type {token_ty}, expected ByteVec"
                    ))
                    .with_span(clause.token.span()));
                }
            }
            let amount_ty = self.compile_expr(clause.amount)?;
            let amount_ty = self.expect_single(amount_ty, clause.amount.span())?;
            if amount_ty != Type::U256 {
                return Err(CompileError::type_error(format!(
                    "Invalid approval amount type {amount_ty}, expected U256"
                ))
                .with_span(clause.amount.span()));
            }
            self.emit(if alph {
                Instr::ApproveAlph
            } else {
                Instr::ApproveToken
            });
        }
        if !approvals.is_empty() {
            self.uses_preapproved = true;
        }
        Ok(())
    }

    /// Compile the positional arguments of a call and match them
    /// against the parameter types.
    fn compile_call_args(
        &mut self,
        call: &CallExpr<'ast>,
        name: &str,
        params: &[Type],
    ) -> Result<(), CompileError> {
        let mut types = Vec::with_capacity(call.args.len());
        for arg in call.args {
            let ty = self.compile_expr(arg)?;
            types.push(self.expect_single(ty, arg.span())?);
        }
        if !self.list_assignable(params, &types) {
            return Err(CompileError::type_error(format!(
                "Invalid args type {} for function \"{name}\", expected {}",
                format_type_list(&types),
                format_type_list(params)
            ))
            .with_span(call.span));
        }
        Ok(())
    }

    // =========================================
    // Static field-encoding calls
    // =========================================

    /// `Type.encodeImmFields!`, `Type.encodeMutFields!`, and
    /// `Type.encodeFields!`, resolved against the target's declared
    /// field list.
    fn compile_static_call(
        &mut self,
        call: &CallExpr<'ast>,
        ty: Ident<'ast>,
        func: Ident<'ast>,
    ) -> Result<Vec<Type>, CompileError> {
        if !call.approvals.is_empty() {
            return Err(CompileError::assets(format!(
                "Braces syntax is not allowed for static function \"{}!\"",
                func.name
            ))
            .with_span(call.span));
        }
        if !builtins::STATIC_ENCODE_FUNCS.contains(&func.name) {
            return Err(CompileError::name(format!(
                "Static function \"{}.{}!\" does not exist",
                ty.name, func.name
            ))
            .with_span(func.span));
        }
        // `obj.encodeImmFields!()` on an instance is a misuse.
        if self.scope.contains(ty.name) || self.meta.field_slots.contains_key(ty.name) {
            return Err(CompileError::type_error(format!(
                "Static function \"{}!\" cannot be called on a contract instance",
                func.name
            ))
            .with_span(call.span));
        }
        let Some(target) = self.registry.get(ty.name) else {
            return Err(
                CompileError::name(format!("Contract \"{}\" does not exist", ty.name))
                    .with_span(ty.span),
            );
        };
        if !matches!(
            target.kind,
            DeclKind::Contract | DeclKind::AbstractContract
        ) {
            return Err(CompileError::type_error(format!(
                "\"{}\" has no fields to encode",
                ty.name
            ))
            .with_span(ty.span));
        }

        let declared: Vec<(Type, bool)> = target
            .fields
            .iter()
            .filter(|f| !f.synthetic)
            .map(|f| (f.ty.clone(), f.mutable))
            .collect();
        let label = format!("{}.{}", ty.name, func.name);

        match func.name {
            "encodeImmFields" => {
                let expected: Vec<Type> = declared
                    .iter()
                    .filter(|(_, m)| !m)
                    .map(|(t, _)| t.clone())
                    .collect();
                let count = self.compile_encode_args(call, &label, &expected)?;
                self.emit_usize(count);
                self.emit(Instr::Encode);
                Ok(vec![Type::ByteVec])
            }
            "encodeMutFields" => {
                let expected: Vec<Type> = declared
                    .iter()
                    .filter(|(_, m)| *m)
                    .map(|(t, _)| t.clone())
                    .collect();
                let count = self.compile_encode_args(call, &label, &expected)?;
                self.emit_usize(count);
                self.emit(Instr::Encode);
                Ok(vec![Type::ByteVec])
            }
            _ => self.compile_encode_all(call, &label, &declared),
        }
    }

    /// Compile the arguments of `encodeImmFields!`/`encodeMutFields!`;
    /// returns the flattened value count.
    fn compile_encode_args(
        &mut self,
        call: &CallExpr<'ast>,
        label: &str,
        expected: &[Type],
    ) -> Result<usize, CompileError> {
        let mut types = Vec::with_capacity(call.args.len());
        for arg in call.args {
            let ty = self.compile_expr(arg)?;
            types.push(self.expect_single(ty, arg.span())?);
        }
        if !self.list_assignable(expected, &types) {
            return Err(CompileError::type_error(format!(
                "Invalid args type {} for {label}!, expected {}",
                format_type_list(&types),
                format_type_list(expected)
            ))
            .with_span(call.span));
        }
        Ok(types.iter().map(Type::flattened_size).sum())
    }

    /// `encodeFields!` takes every declared field in declaration order
    /// and yields `(immBytes, mutBytes)`. Arguments are parked in
    /// temporaries so each is evaluated exactly once despite the
    /// region split.
    fn compile_encode_all(
        &mut self,
        call: &CallExpr<'ast>,
        label: &str,
        declared: &[(Type, bool)],
    ) -> Result<Vec<Type>, CompileError> {
        let expected: Vec<Type> = declared.iter().map(|(t, _)| t.clone()).collect();
        if call.args.len() != declared.len() {
            return Err(CompileError::type_error(format!(
                "Invalid number of arguments for {label}!, expected {}",
                declared.len()
            ))
            .with_span(call.span));
        }
        let mut types = Vec::with_capacity(call.args.len());
        let mut temps: Vec<(u8, usize, bool)> = Vec::with_capacity(call.args.len());
        for (arg, (_, mutable)) in call.args.iter().zip(declared) {
            let ty = self.compile_expr(arg)?;
            let ty = self.expect_single(ty, arg.span())?;
            let slots = ty.flattened_size();
            let tmp = self.scope.fresh_temp(slots, arg.span())?;
            self.store_slots(Place::Local(tmp as usize), 0, slots)?;
            temps.push((tmp, slots, *mutable));
            types.push(ty);
        }
        if !self.list_assignable(&expected, &types) {
            return Err(CompileError::type_error(format!(
                "Invalid args type {} for {label}!, expected {}",
                format_type_list(&types),
                format_type_list(&expected)
            ))
            .with_span(call.span));
        }
        for wanted_mut in [false, true] {
            let mut count = 0usize;
            for &(tmp, slots, mutable) in &temps {
                if mutable == wanted_mut {
                    for k in 0..slots {
                        let slot = self.narrow(tmp as usize + k)?;
                        self.emit(Instr::LoadLocal(slot));
                    }
                    count += slots;
                }
            }
            self.emit_usize(count);
            self.emit(Instr::Encode);
        }
        Ok(vec![Type::ByteVec, Type::ByteVec])
    }
}
