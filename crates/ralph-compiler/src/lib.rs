//! Ralph compiler.
//!
//! A three-pass compiler for the Ralph smart-contract language:
//!
//! - **Registration**: build symbol tables from the parsed unit and
//!   enforce structural rules.
//! - **Inheritance resolution**: linearize `extends`/`implements`
//!   chains and merge member tables.
//! - **Function compilation**: type-check and lower each function body
//!   to a flat instruction vector, in a single walk.
//!
//! Only concrete declarations produce bytecode: contracts become
//! [`StatefulContract`]s, `TxScript`s become [`StatefulScript`]s, and
//! `AssetScript`s become [`StatelessScript`]s. Warnings are collected
//! across the unit in declaration order and never affect the emitted
//! bytecode.

pub mod builtins;
pub mod bytecode;
mod codegen;
pub mod fold;
mod func_compiler;
pub mod instr;
pub mod passes;
pub mod registry;
pub mod return_checker;
mod scope;
pub mod types;

use bumpalo::Bump;
use rustc_hash::FxHashSet;

use ralph_parser::Parser;

pub use bytecode::{Method, StatefulContract, StatefulScript, StatelessScript};
pub use instr::{DecodeError, Instr};
pub use ralph_core::{
    CompileError, DiagnosticKind, RalphError, Span, Val, Warning,
};
pub use types::Type;

use func_compiler::{compile_function, FuncArtifacts};
use registry::{ContractMeta, DeclKind, Registry};

/// Bytecode of a compiled concrete contract, in production and debug
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledContract {
    pub name: String,
    pub code: StatefulContract,
    pub debug_code: StatefulContract,
}

/// Which script declaration produced a [`CompiledScript`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    TxScript,
    AssetScript,
}

/// Script bytecode, stateful or stateless depending on the declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCode {
    Stateful(StatefulScript),
    Stateless(StatelessScript),
}

impl ScriptCode {
    /// The method table.
    pub fn methods(&self) -> &[Method] {
        match self {
            ScriptCode::Stateful(script) => &script.methods,
            ScriptCode::Stateless(script) => &script.methods,
        }
    }

    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            ScriptCode::Stateful(script) => script.serialize(),
            ScriptCode::Stateless(script) => script.serialize(),
        }
    }

    /// The hex template form with `{n}` placeholders.
    pub fn template_string(&self) -> String {
        match self {
            ScriptCode::Stateful(script) => script.template_string(),
            ScriptCode::Stateless(script) => script.template_string(),
        }
    }
}

/// A compiled script, in production and debug form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub name: String,
    pub kind: ScriptKind,
    pub code: ScriptCode,
    pub debug_code: ScriptCode,
}

/// The output of compiling one source unit.
#[derive(Debug)]
pub struct CompilationResult {
    pub contracts: Vec<CompiledContract>,
    pub scripts: Vec<CompiledScript>,
    /// Collected warnings, in declaration order.
    pub warnings: Vec<Warning>,
}

/// The compiler entry point. Stateless; each call is independent.
pub struct Compiler;

impl Compiler {
    /// Compile a source unit.
    pub fn compile(source: &str) -> Result<CompilationResult, RalphError> {
        let arena = Bump::new();
        let unit = Parser::parse(source, &arena)?;
        let mut registry = passes::build_registry(&unit)?;
        let order = passes::resolve_inheritance(&mut registry)?;
        let result = compile_unit(&registry, &order)?;
        Ok(result)
    }

    /// Compile a unit and return the named contract's bytecode.
    ///
    /// Requesting an abstract contract is an error: no bytecode exists
    /// for it.
    pub fn compile_contract(source: &str, name: &str) -> Result<CompiledContract, RalphError> {
        let arena = Bump::new();
        let unit = Parser::parse(source, &arena)?;
        let mut registry = passes::build_registry(&unit)?;
        let order = passes::resolve_inheritance(&mut registry)?;
        match registry.get(name).map(|meta| meta.kind) {
            Some(DeclKind::Contract) => {}
            Some(DeclKind::AbstractContract) => {
                return Err(CompileError::syntax(format!(
                    "Code generation is not supported for abstract contract \"{name}\""
                ))
                .into());
            }
            Some(_) => {
                return Err(CompileError::syntax(format!(
                    "\"{name}\" is not a contract declaration"
                ))
                .into());
            }
            None => {
                return Err(
                    CompileError::name(format!("Contract \"{name}\" does not exist")).into(),
                );
            }
        }
        let result = compile_unit(&registry, &order)?;
        result
            .contracts
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                CompileError::internal(format!("compiled output for \"{name}\" missing")).into()
            })
    }
}

/// Per-declaration compilation output, before assembly.
struct MetaOutput<'ast> {
    artifacts: Vec<FuncArtifacts<'ast>>,
}

fn compile_unit<'ast>(
    registry: &Registry<'ast>,
    order: &[usize],
) -> Result<CompilationResult, CompileError> {
    let mut outputs: Vec<Option<MetaOutput<'ast>>> = Vec::new();
    outputs.resize_with(registry.metas.len(), || None);

    // Compile parents before children; interfaces carry no bodies.
    for &i in order {
        let meta = &registry.metas[i];
        if meta.kind == DeclKind::Interface {
            continue;
        }
        let mut artifacts = Vec::with_capacity(meta.funcs.len());
        for func in &meta.funcs {
            if func.body.is_none() {
                // Abstract methods are checked when a concrete child
                // provides the implementation.
                continue;
            }
            artifacts.push(compile_function(registry, meta, func)?);
        }
        outputs[i] = Some(MetaOutput { artifacts });
    }

    // Assemble results and warnings in declaration order.
    let mut contracts = Vec::new();
    let mut scripts = Vec::new();
    let mut warnings = Vec::new();
    for (meta, output) in registry.metas.iter().zip(outputs.into_iter()) {
        let Some(output) = output else {
            continue;
        };
        match meta.kind {
            DeclKind::AbstractContract => {
                for artifact in &output.artifacts {
                    warnings.extend(artifact.warnings.iter().cloned());
                }
            }
            DeclKind::Contract => {
                contract_checks(meta, &output, &mut warnings)?;
                let (methods, debug_methods) = split_methods(output);
                let field_length = u8::try_from(meta.field_length()).map_err(|_| {
                    CompileError::internal(format!(
                        "field slot count overflow in contract \"{}\"",
                        meta.name
                    ))
                })?;
                contracts.push(CompiledContract {
                    name: meta.name.to_string(),
                    code: StatefulContract {
                        field_length,
                        methods,
                    },
                    debug_code: StatefulContract {
                        field_length,
                        methods: debug_methods,
                    },
                });
            }
            DeclKind::TxScript => {
                script_warnings(meta, &output, &mut warnings);
                let (methods, debug_methods) = split_methods(output);
                scripts.push(CompiledScript {
                    name: meta.name.to_string(),
                    kind: ScriptKind::TxScript,
                    code: ScriptCode::Stateful(StatefulScript { methods }),
                    debug_code: ScriptCode::Stateful(StatefulScript {
                        methods: debug_methods,
                    }),
                });
            }
            DeclKind::AssetScript => {
                script_warnings(meta, &output, &mut warnings);
                let (methods, debug_methods) = split_methods(output);
                scripts.push(CompiledScript {
                    name: meta.name.to_string(),
                    kind: ScriptKind::AssetScript,
                    code: ScriptCode::Stateless(StatelessScript { methods }),
                    debug_code: ScriptCode::Stateless(StatelessScript {
                        methods: debug_methods,
                    }),
                });
            }
            DeclKind::Interface => unreachable!("interfaces are skipped above"),
        }
    }

    Ok(CompilationResult {
        contracts,
        scripts,
        warnings,
    })
}

fn split_methods(output: MetaOutput<'_>) -> (Vec<Method>, Vec<Method>) {
    let mut methods = Vec::with_capacity(output.artifacts.len());
    let mut debug_methods = Vec::with_capacity(output.artifacts.len());
    for artifact in output.artifacts {
        methods.push(artifact.method);
        debug_methods.push(artifact.debug_method);
    }
    (methods, debug_methods)
}

/// Contract-level diagnostics: the unassigned-mutable-field error and
/// the unused/annotation warnings.
fn contract_checks<'ast>(
    meta: &ContractMeta<'ast>,
    output: &MetaOutput<'ast>,
    warnings: &mut Vec<Warning>,
) -> Result<(), CompileError> {
    let mut used_fields: FxHashSet<&'ast str> = FxHashSet::default();
    let mut wrote_fields: FxHashSet<&'ast str> = FxHashSet::default();
    let mut used_consts: FxHashSet<&'ast str> = FxHashSet::default();
    let mut used_variants: FxHashSet<(&'ast str, &'ast str)> = FxHashSet::default();
    for artifact in &output.artifacts {
        used_fields.extend(&artifact.used_fields);
        wrote_fields.extend(&artifact.wrote_fields);
        used_consts.extend(&artifact.used_consts);
        used_variants.extend(&artifact.used_enum_variants);
    }

    // Mutable fields must be assigned on at least one reachable path.
    let unassigned: Vec<&str> = meta
        .fields
        .iter()
        .filter(|f| f.mutable && !f.synthetic && !wrote_fields.contains(f.name))
        .map(|f| f.name)
        .collect();
    if !unassigned.is_empty() {
        return Err(CompileError::mutability(format!(
            "There are unassigned mutable fields in contract {}: {}",
            meta.name,
            unassigned.join(", ")
        )));
    }

    // Per-function warnings first, in method order.
    for (artifact, func) in output.artifacts.iter().zip(&meta.funcs) {
        warnings.extend(artifact.warnings.iter().cloned());
        let label = format!("{}.{}", meta.name, func.name);
        let wrote_any = !artifact.wrote_fields.is_empty();
        if func.annotations.update_fields && !wrote_any {
            warnings.push(Warning::new(
                label.clone(),
                "Annotated with updateFields = true but no fields are updated",
            ));
        }
        if !func.annotations.update_fields && wrote_any {
            warnings.push(Warning::new(
                label.clone(),
                "Updates fields but is not annotated with updateFields = true",
            ));
        }
        if func.is_pub && func.annotations.check_external_caller && !artifact.has_caller_check {
            warnings.push(Warning::new(
                label,
                "No external caller check; use checkCaller!(…) or annotate with @using(checkExternalCaller = false)",
            ));
        }
    }

    // Contract-level unused warnings.
    let unused_fields: Vec<&str> = meta
        .fields
        .iter()
        .filter(|f| !f.synthetic && !f.unused && !used_fields.contains(f.name))
        .map(|f| f.name)
        .collect();
    if !unused_fields.is_empty() {
        warnings.push(Warning::new(
            meta.name,
            format!("Found unused fields: {}", unused_fields.join(", ")),
        ));
    }
    let unused_consts: Vec<&str> = meta
        .consts
        .iter()
        .filter(|c| !used_consts.contains(c.name))
        .map(|c| c.name)
        .collect();
    if !unused_consts.is_empty() {
        warnings.push(Warning::new(
            meta.name,
            format!("Found unused constants: {}", unused_consts.join(", ")),
        ));
    }
    let mut unused_variants = Vec::new();
    for enum_def in &meta.enums {
        for (variant, _) in &enum_def.variants {
            if !used_variants.contains(&(enum_def.name, variant)) {
                unused_variants.push(format!("{}.{}", enum_def.name, variant));
            }
        }
    }
    if !unused_variants.is_empty() {
        warnings.push(Warning::new(
            meta.name,
            format!("Found unused enum variants: {}", unused_variants.join(", ")),
        ));
    }
    Ok(())
}

/// Script-level warnings: locals and annotation mismatches.
fn script_warnings<'ast>(
    meta: &ContractMeta<'ast>,
    output: &MetaOutput<'ast>,
    warnings: &mut Vec<Warning>,
) {
    for (artifact, func) in output.artifacts.iter().zip(&meta.funcs) {
        warnings.extend(artifact.warnings.iter().cloned());
        if func.annotations.update_fields {
            warnings.push(Warning::new(
                format!("{}.{}", meta.name, func.name),
                "Annotated with updateFields = true but no fields are updated",
            ));
        }
    }
}
