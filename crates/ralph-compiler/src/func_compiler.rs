//! Pass 2: per-function type checking and code generation.
//!
//! Each function is checked and lowered in a single AST walk:
//! expression methods return the inferred type list while appending
//! instructions, statement methods check and then emit. The walk runs
//! twice per function, once with debug-only builtins included and once
//! without; jump offsets are patched per run, so the two instruction
//! streams are internally consistent and byte-identical whenever no
//! debug-only builtin appears.

use rustc_hash::FxHashSet;

use ralph_core::{CompileError, Warning};

use crate::bytecode::Method;
use crate::instr::Instr;
use crate::registry::{ContractMeta, FuncInfo, Registry};
use crate::return_checker;
use crate::scope::FunctionScope;
use crate::types::Type;

/// Everything one compiled function reports back to the driver.
pub struct FuncArtifacts<'ast> {
    /// Production bytecode.
    pub method: Method,
    /// Debug bytecode (keeps `debug!` lowerings).
    pub debug_method: Method,
    pub used_fields: FxHashSet<&'ast str>,
    pub wrote_fields: FxHashSet<&'ast str>,
    pub used_consts: FxHashSet<&'ast str>,
    pub used_enum_variants: FxHashSet<(&'ast str, &'ast str)>,
    pub has_caller_check: bool,
    pub warnings: Vec<Warning>,
}

/// Compile one function into its production and debug methods.
pub fn compile_function<'ast>(
    registry: &Registry<'ast>,
    meta: &ContractMeta<'ast>,
    func: &FuncInfo<'ast>,
) -> Result<FuncArtifacts<'ast>, CompileError> {
    let debug = FuncCompiler::new(registry, meta, func, true).run()?;
    let prod = FuncCompiler::new(registry, meta, func, false).run()?;
    Ok(FuncArtifacts {
        method: prod.method,
        debug_method: debug.method,
        used_fields: prod.used_fields,
        wrote_fields: prod.wrote_fields,
        used_consts: prod.used_consts,
        used_enum_variants: prod.used_enum_variants,
        has_caller_check: prod.has_caller_check,
        warnings: prod.warnings,
    })
}

/// Result of one compilation run.
pub(crate) struct CompiledFunc<'ast> {
    pub method: Method,
    pub used_fields: FxHashSet<&'ast str>,
    pub wrote_fields: FxHashSet<&'ast str>,
    pub used_consts: FxHashSet<&'ast str>,
    pub used_enum_variants: FxHashSet<(&'ast str, &'ast str)>,
    pub has_caller_check: bool,
    pub warnings: Vec<Warning>,
}

/// Compiles one function body.
pub(crate) struct FuncCompiler<'r, 'ast> {
    pub(crate) registry: &'r Registry<'ast>,
    pub(crate) meta: &'r ContractMeta<'ast>,
    pub(crate) func: &'r FuncInfo<'ast>,
    /// `Contract.function` identity for diagnostics.
    pub(crate) func_label: String,
    pub(crate) scope: FunctionScope<'ast>,
    pub(crate) instrs: Vec<Instr>,
    pub(crate) include_debug: bool,
    pub(crate) used_fields: FxHashSet<&'ast str>,
    pub(crate) wrote_fields: FxHashSet<&'ast str>,
    pub(crate) used_consts: FxHashSet<&'ast str>,
    pub(crate) used_enum_variants: FxHashSet<(&'ast str, &'ast str)>,
    pub(crate) uses_preapproved: bool,
    pub(crate) uses_contract_assets: bool,
    pub(crate) has_caller_check: bool,
}

impl<'r, 'ast> FuncCompiler<'r, 'ast> {
    fn new(
        registry: &'r Registry<'ast>,
        meta: &'r ContractMeta<'ast>,
        func: &'r FuncInfo<'ast>,
        include_debug: bool,
    ) -> Self {
        Self {
            registry,
            meta,
            func,
            func_label: format!("{}.{}", meta.name, func.name),
            scope: FunctionScope::new(),
            instrs: Vec::new(),
            include_debug,
            used_fields: FxHashSet::default(),
            wrote_fields: FxHashSet::default(),
            used_consts: FxHashSet::default(),
            used_enum_variants: FxHashSet::default(),
            uses_preapproved: false,
            uses_contract_assets: false,
            has_caller_check: false,
        }
    }

    fn run(mut self) -> Result<CompiledFunc<'ast>, CompileError> {
        let body = self.func.body.ok_or_else(|| {
            CompileError::internal(format!(
                "attempted to compile function \"{}\" without a body",
                self.func_label
            ))
        })?;

        // Arguments occupy the first local slots. Script parameters are
        // template variables instead and resolve through the meta.
        for (decl, ty) in self.func.param_decls.iter().zip(self.func.params.clone()) {
            self.scope.declare(
                decl.name.name,
                ty,
                decl.mutable,
                decl.unused,
                true,
                decl.span,
            )?;
            // Arguments arrive assigned.
            if let Some(var) = self.scope.lookup(decl.name.name) {
                var.assigned = true;
            }
        }

        for stmt in body.stmts {
            self.compile_stmt(stmt)?;
        }

        if !self.func.returns.is_empty() {
            if !return_checker::block_terminates(body.stmts) {
                return Err(CompileError::return_error(format!(
                    "Expected return statement for function \"{}\"",
                    self.func.name
                ))
                .with_span(self.func.span));
            }
        } else if !return_checker::block_terminates(body.stmts) {
            self.emit(Instr::Return);
        }

        self.check_locals()?;
        self.check_asset_annotations()?;

        let return_length: usize = self
            .func
            .returns
            .iter()
            .map(Type::flattened_size)
            .sum();
        let method = Method {
            is_public: self.func.is_pub,
            use_preapproved_assets: self.func.annotations.preapproved_assets,
            use_contract_assets: self.func.annotations.assets_in_contract,
            args_length: self.narrow(self.scope.args_length())?,
            locals_length: self.narrow(self.scope.locals_length())?,
            return_length: self.narrow(return_length)?,
            instrs: std::mem::take(&mut self.instrs),
        };

        let warnings = self.local_warnings();
        Ok(CompiledFunc {
            method,
            used_fields: self.used_fields,
            wrote_fields: self.wrote_fields,
            used_consts: self.used_consts,
            used_enum_variants: self.used_enum_variants,
            has_caller_check: self.has_caller_check,
            warnings,
        })
    }

    /// Never-assigned `let mut` bindings are fatal.
    fn check_locals(&mut self) -> Result<(), CompileError> {
        let unassigned: Vec<&str> = self
            .scope
            .vars()
            .iter()
            .filter(|var| var.mutable && !var.is_arg && !var.assigned)
            .map(|var| var.name)
            .collect();
        if !unassigned.is_empty() {
            return Err(CompileError::mutability(format!(
                "There are unassigned mutable variables in function \"{}\": {}",
                self.func_label,
                unassigned.join(", ")
            )));
        }
        Ok(())
    }

    /// Unused locals are warnings, suppressed by `@unused` and `_`.
    fn local_warnings(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let unused: Vec<&str> = self
            .scope
            .vars()
            .iter()
            .filter(|var| !var.used && !var.unused_anno && !var.name.starts_with('_'))
            .map(|var| var.name)
            .collect();
        if !unused.is_empty() {
            warnings.push(Warning::new(
                self.func_label.clone(),
                format!("Found unused variables: {}", unused.join(", ")),
            ));
        }
        warnings
    }

    /// Asset annotations must match actual asset usage, both ways.
    fn check_asset_annotations(&self) -> Result<(), CompileError> {
        let ann = self.func.annotations;
        if self.uses_preapproved && !ann.preapproved_assets {
            return Err(CompileError::assets(format!(
                "Function \"{}\" uses preapproved assets but is not annotated with preapprovedAssets = true",
                self.func_label
            )));
        }
        if ann.preapproved_assets && !self.uses_preapproved {
            return Err(CompileError::assets(format!(
                "Function \"{}\" is annotated with preapprovedAssets = true but does not use preapproved assets",
                self.func_label
            )));
        }
        if self.uses_contract_assets && !ann.assets_in_contract {
            return Err(CompileError::assets(format!(
                "Function \"{}\" uses contract assets but is not annotated with assetsInContract = true",
                self.func_label
            )));
        }
        if ann.assets_in_contract && !self.uses_contract_assets {
            return Err(CompileError::assets(format!(
                "Function \"{}\" is annotated with assetsInContract = true but does not use contract assets",
                self.func_label
            )));
        }
        Ok(())
    }

    // =========================================
    // Emission helpers
    // =========================================

    #[inline]
    pub(crate) fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// Current instruction index.
    #[inline]
    pub(crate) fn here(&self) -> usize {
        self.instrs.len()
    }

    /// Emit a jump with a placeholder offset; patch later.
    pub(crate) fn emit_placeholder(&mut self, instr: Instr) -> usize {
        let at = self.instrs.len();
        self.instrs.push(instr);
        at
    }

    /// Patch the jump at `at` to target the current position.
    ///
    /// Offsets are relative to the instruction after the jump.
    pub(crate) fn patch_jump(&mut self, at: usize) -> Result<(), CompileError> {
        let offset = self.instrs.len() as i64 - at as i64 - 1;
        let offset = self.jump_offset(offset)?;
        match &mut self.instrs[at] {
            Instr::Jump(slot) | Instr::IfTrue(slot) | Instr::IfFalse(slot) => *slot = offset,
            other => {
                return Err(CompileError::internal(format!(
                    "patch target is not a jump: {other:?}"
                )));
            }
        }
        Ok(())
    }

    /// Emit a backward jump to `target`.
    pub(crate) fn emit_jump_back(&mut self, target: usize) -> Result<(), CompileError> {
        let offset = target as i64 - (self.instrs.len() as i64 + 1);
        let offset = self.jump_offset(offset)?;
        self.emit(Instr::Jump(offset));
        Ok(())
    }

    fn jump_offset(&self, offset: i64) -> Result<i16, CompileError> {
        i16::try_from(offset).map_err(|_| {
            CompileError::internal(format!(
                "jump offset {offset} out of range in function \"{}\"",
                self.func_label
            ))
        })
    }

    /// Narrow a slot count into the u8 wire width.
    pub(crate) fn narrow(&self, value: usize) -> Result<u8, CompileError> {
        u8::try_from(value).map_err(|_| {
            CompileError::internal(format!(
                "slot count {value} exceeds 255 in function \"{}\"",
                self.func_label
            ))
        })
    }

    // =========================================
    // Shared type checks
    // =========================================

    /// Whether `got` can stand where `expected` is required. Contract
    /// references are covariant along the inheritance chain; all other
    /// types require equality.
    pub(crate) fn is_assignable(&self, expected: &Type, got: &Type) -> bool {
        if expected == got {
            return true;
        }
        if let (Type::Contract(parent), Type::Contract(child)) = (expected, got) {
            let (Some(parent_index), Some(child_meta)) =
                (self.registry.index_of(parent), self.registry.get(child))
            else {
                return false;
            };
            return child_meta.ancestors.contains(&parent_index);
        }
        false
    }

    /// Element-wise [`is_assignable`](Self::is_assignable) over lists.
    pub(crate) fn list_assignable(&self, expected: &[Type], got: &[Type]) -> bool {
        expected.len() == got.len()
            && expected
                .iter()
                .zip(got)
                .all(|(e, g)| self.is_assignable(e, g))
    }

    /// Require exactly one value.
    pub(crate) fn expect_single(
        &self,
        types: Vec<Type>,
        span: ralph_core::Span,
    ) -> Result<Type, CompileError> {
        if types.len() == 1 {
            Ok(types.into_iter().next().unwrap())
        } else {
            Err(CompileError::type_error(format!(
                "Expected a single value, got {}",
                crate::types::format_type_list(&types)
            ))
            .with_span(span))
        }
    }

}
