//! Pass 1: registration.
//!
//! Walks the parsed unit and builds a [`Registry`] of declaration
//! metadata with resolved member types. Global name uniqueness and the
//! per-declaration structural rules are enforced here; inheritance is
//! resolved by the follow-up pass.

use rustc_hash::FxHashMap;

use ralph_core::{CompileError, Val};
use ralph_parser::ast::{
    AssetScriptDecl, ContractDecl, EnumDecl, EventDecl, FuncDecl, InterfaceDecl, Item, LiteralKind,
    ParamDecl, Source, TxScriptDecl, TypeExpr,
};

use crate::fold;
use crate::registry::{
    ConstInfo, ContractMeta, DeclKind, EnumInfo, EventInfo, FieldInfo, FuncInfo, Registry,
};
use crate::types::Type;

/// Maximum number of fields an event may carry.
const MAX_EVENT_FIELDS: usize = 8;

/// Build the registry for a source unit.
pub fn build_registry<'ast>(source: &Source<'ast>) -> Result<Registry<'ast>, CompileError> {
    let mut by_name: FxHashMap<&'ast str, usize> = FxHashMap::default();
    let mut kinds: FxHashMap<&'ast str, DeclKind> = FxHashMap::default();

    for (index, item) in source.items().iter().enumerate() {
        let name = item.name();
        if by_name.insert(name.name, index).is_some() {
            return Err(
                CompileError::name(format!("These declarations are defined multiple times: {}", name.name))
                    .with_span(name.span),
            );
        }
        kinds.insert(name.name, kind_of(item));
    }

    let resolver = TypeResolver { kinds: &kinds };
    let mut metas = Vec::with_capacity(source.items().len());
    for item in source.items() {
        metas.push(register_item(item, &resolver)?);
    }

    Ok(Registry { metas, by_name })
}

fn kind_of(item: &Item<'_>) -> DeclKind {
    match item {
        Item::Contract(decl) if decl.is_abstract => DeclKind::AbstractContract,
        Item::Contract(_) => DeclKind::Contract,
        Item::Interface(_) => DeclKind::Interface,
        Item::TxScript(_) => DeclKind::TxScript,
        Item::AssetScript(_) => DeclKind::AssetScript,
    }
}

/// Resolves syntactic type expressions against the set of declared
/// names.
pub struct TypeResolver<'a, 'ast> {
    kinds: &'a FxHashMap<&'ast str, DeclKind>,
}

impl<'ast> TypeResolver<'_, 'ast> {
    /// Resolve a type expression to a semantic type.
    pub fn resolve(&self, ty: &TypeExpr<'ast>) -> Result<Type, CompileError> {
        match ty {
            TypeExpr::Named(ident) => {
                if let Some(prim) = Type::primitive(ident.name) {
                    return Ok(prim);
                }
                match self.kinds.get(ident.name) {
                    Some(kind) if kind.is_contract_like() => {
                        Ok(Type::Contract(ident.name.to_string()))
                    }
                    Some(_) => Err(CompileError::type_error(format!(
                        "Script \"{}\" cannot be used as a type",
                        ident.name
                    ))
                    .with_span(ident.span)),
                    None => Err(CompileError::name(format!(
                        "Type \"{}\" does not exist",
                        ident.name
                    ))
                    .with_span(ident.span)),
                }
            }
            TypeExpr::Array(array) => {
                let elem = self.resolve(&array.elem)?;
                let size = match fold::fold(array.size)? {
                    Some(Val::U256(v)) => v,
                    _ => {
                        return Err(CompileError::type_error(
                            "Array size must be a constant U256 expression",
                        )
                        .with_span(array.span));
                    }
                };
                let size = Val::U256(size).as_index().filter(|s| *s > 0).ok_or_else(|| {
                    CompileError::type_error("Array size must be a positive constant")
                        .with_span(array.span)
                })?;
                Ok(Type::Array(Box::new(elem), size))
            }
        }
    }
}

fn register_item<'ast>(
    item: &Item<'ast>,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<ContractMeta<'ast>, CompileError> {
    match *item {
        Item::Contract(decl) => register_contract(item, decl, resolver),
        Item::Interface(decl) => register_interface(item, decl, resolver),
        Item::TxScript(decl) => register_txscript(item, decl, resolver),
        Item::AssetScript(decl) => register_asset_script(item, decl, resolver),
    }
}

fn register_contract<'ast>(
    item: &Item<'ast>,
    decl: &'ast ContractDecl<'ast>,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<ContractMeta<'ast>, CompileError> {
    let kind = if decl.is_abstract {
        DeclKind::AbstractContract
    } else {
        DeclKind::Contract
    };
    let mut meta = ContractMeta::new(decl.name.name, kind, decl.span, *item);

    if let Some(std) = decl.std {
        if let Some(enabled) = std.enabled {
            meta.std_enabled = enabled;
        }
        if std.id.is_some() {
            return Err(CompileError::inheritance(format!(
                "@std id can only be declared on interfaces, not contract \"{}\"",
                decl.name.name
            ))
            .with_span(std.span));
        }
    }

    let mut seen_fields: FxHashMap<&str, ()> = FxHashMap::default();
    for field in decl.fields {
        if seen_fields.insert(field.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Field \"{}\" is defined multiple times in contract \"{}\"",
                field.name.name, decl.name.name
            ))
            .with_span(field.span));
        }
        meta.fields.push(FieldInfo {
            name: field.name.name,
            mutable: field.mutable,
            unused: field.unused,
            ty: resolver.resolve(&field.ty)?,
            span: field.span,
            synthetic: false,
        });
    }

    for event in decl.events {
        meta.own_events.push(register_event(event, decl.name.name, resolver)?);
    }
    for constant in decl.consts {
        let info = register_const(constant, decl.name.name, &meta.own_consts)?;
        meta.own_consts.push(info);
    }
    for enum_decl in decl.enums {
        meta.own_enums.push(register_enum(enum_decl, decl.name.name)?);
    }

    let mut seen_funcs: FxHashMap<&str, ()> = FxHashMap::default();
    for func in decl.funcs {
        if seen_funcs.insert(func.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Function \"{}\" is defined multiple times in contract \"{}\"",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        if func.body.is_none() && !decl.is_abstract {
            return Err(CompileError::syntax(format!(
                "Function \"{}\" in contract \"{}\" needs an implementation",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        meta.own_funcs
            .push(register_func(func, decl.name.name, resolver)?);
    }

    Ok(meta)
}

fn register_interface<'ast>(
    item: &Item<'ast>,
    decl: &'ast InterfaceDecl<'ast>,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<ContractMeta<'ast>, CompileError> {
    let mut meta = ContractMeta::new(decl.name.name, DeclKind::Interface, decl.span, *item);

    if decl.funcs.is_empty() {
        return Err(CompileError::syntax(format!(
            "No function definition in Interface {}",
            decl.name.name
        ))
        .with_span(decl.span));
    }
    if let Some(std) = decl.std {
        meta.std_id = std.id.map(|id| id.to_vec());
        if std.enabled.is_some() {
            return Err(CompileError::inheritance(format!(
                "@std(enabled = …) can only be declared on contracts, not interface \"{}\"",
                decl.name.name
            ))
            .with_span(std.span));
        }
        if meta.std_id.as_ref().is_some_and(|id| id.is_empty()) {
            return Err(CompileError::inheritance(format!(
                "Invalid empty @std id for interface \"{}\"",
                decl.name.name
            ))
            .with_span(std.span));
        }
    }

    for event in decl.events {
        meta.own_events.push(register_event(event, decl.name.name, resolver)?);
    }

    let mut seen_funcs: FxHashMap<&str, ()> = FxHashMap::default();
    for func in decl.funcs {
        if seen_funcs.insert(func.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Function \"{}\" is defined multiple times in Interface {}",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        if func.body.is_some() {
            return Err(CompileError::syntax(format!(
                "Function \"{}\" in Interface {} cannot have an implementation",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        if !func.is_pub {
            return Err(CompileError::syntax(format!(
                "Function \"{}\" in Interface {} must be public",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        meta.own_funcs
            .push(register_func(func, decl.name.name, resolver)?);
    }

    Ok(meta)
}

fn register_txscript<'ast>(
    item: &Item<'ast>,
    decl: &'ast TxScriptDecl<'ast>,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<ContractMeta<'ast>, CompileError> {
    let mut meta = ContractMeta::new(decl.name.name, DeclKind::TxScript, decl.span, *item);

    if decl.main.is_empty() {
        return Err(CompileError::syntax(format!(
            "Expected main statements for type \"{}\"",
            decl.name.name
        ))
        .with_span(decl.span));
    }

    meta.template_params = register_template_params(decl.params, decl.name.name, resolver)?;

    // The main statements form the implicit entry function at method
    // index 0.
    let main_block = ralph_parser::ast::Block {
        stmts: decl.main,
        span: decl.span,
    };
    meta.own_funcs.push(FuncInfo {
        name: "main",
        is_pub: true,
        annotations: decl.annotations,
        params: Vec::new(),
        param_decls: &[],
        returns: Vec::new(),
        body: Some(main_block),
        defined_in: decl.name.name,
        span: decl.span,
    });

    let mut seen_funcs: FxHashMap<&str, ()> = FxHashMap::default();
    seen_funcs.insert("main", ());
    for func in decl.funcs {
        if seen_funcs.insert(func.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Function \"{}\" is defined multiple times in script \"{}\"",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        if func.body.is_none() {
            return Err(CompileError::syntax(format!(
                "Function \"{}\" in script \"{}\" needs an implementation",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        meta.own_funcs
            .push(register_func(func, decl.name.name, resolver)?);
    }

    Ok(meta)
}

fn register_asset_script<'ast>(
    item: &Item<'ast>,
    decl: &'ast AssetScriptDecl<'ast>,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<ContractMeta<'ast>, CompileError> {
    let mut meta = ContractMeta::new(decl.name.name, DeclKind::AssetScript, decl.span, *item);

    meta.template_params = register_template_params(decl.params, decl.name.name, resolver)?;

    let mut seen_funcs: FxHashMap<&str, ()> = FxHashMap::default();
    for func in decl.funcs {
        if seen_funcs.insert(func.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Function \"{}\" is defined multiple times in script \"{}\"",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        if func.body.is_none() {
            return Err(CompileError::syntax(format!(
                "Function \"{}\" in script \"{}\" needs an implementation",
                func.name.name, decl.name.name
            ))
            .with_span(func.span));
        }
        meta.own_funcs
            .push(register_func(func, decl.name.name, resolver)?);
    }

    Ok(meta)
}

fn register_template_params<'ast>(
    params: &'ast [ParamDecl<'ast>],
    script: &'ast str,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<Vec<(&'ast str, Type)>, CompileError> {
    let mut out = Vec::with_capacity(params.len());
    for param in params {
        if param.mutable {
            return Err(CompileError::type_error(format!(
                "Template variable \"{}\" of script \"{script}\" cannot be mutable",
                param.name.name
            ))
            .with_span(param.span));
        }
        let ty = resolver.resolve(&param.ty)?;
        if !ty.is_scalar() {
            return Err(CompileError::type_error(format!(
                "Template variable \"{}\" of script \"{script}\" must have a scalar type",
                param.name.name
            ))
            .with_span(param.span));
        }
        if out.iter().any(|(name, _)| *name == param.name.name) {
            return Err(CompileError::name(format!(
                "Template variable \"{}\" is defined multiple times in script \"{script}\"",
                param.name.name
            ))
            .with_span(param.span));
        }
        out.push((param.name.name, ty));
    }
    Ok(out)
}

fn register_event<'ast>(
    event: &EventDecl<'ast>,
    owner: &'ast str,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<EventInfo<'ast>, CompileError> {
    if event.params.len() > MAX_EVENT_FIELDS {
        return Err(
            CompileError::syntax("Max 8 fields allowed for contract events").with_span(event.span)
        );
    }
    let mut params = Vec::with_capacity(event.params.len());
    for param in event.params {
        let ty = resolver.resolve(&param.ty)?;
        if !ty.is_scalar() {
            return Err(CompileError::type_error(format!(
                "Array fields are not allowed in events; event \"{}\" field \"{}\"",
                event.name.name, param.name.name
            ))
            .with_span(event.span));
        }
        params.push(ty);
    }
    Ok(EventInfo {
        name: event.name.name,
        params,
        defined_in: owner,
        span: event.span,
    })
}

fn register_const<'ast>(
    decl: &ralph_parser::ast::ConstDecl<'ast>,
    owner: &'ast str,
    existing: &[ConstInfo<'ast>],
) -> Result<ConstInfo<'ast>, CompileError> {
    if existing.iter().any(|c| c.name == decl.name.name) {
        return Err(CompileError::name(format!(
            "Constant \"{}\" is defined multiple times in contract \"{owner}\"",
            decl.name.name
        ))
        .with_span(decl.span));
    }
    let value = literal_to_val(&decl.value.kind).ok_or_else(|| {
        CompileError::type_error(format!(
            "Invalid literal for constant \"{}\" in contract \"{owner}\"",
            decl.name.name
        ))
        .with_span(decl.span)
    })?;
    Ok(ConstInfo {
        name: decl.name.name,
        value,
        span: decl.span,
    })
}

fn register_enum<'ast>(
    decl: &EnumDecl<'ast>,
    owner: &'ast str,
) -> Result<EnumInfo<'ast>, CompileError> {
    let mut variants: Vec<(&'ast str, Val)> = Vec::with_capacity(decl.variants.len());
    let mut ty: Option<Type> = None;
    for variant in decl.variants {
        let value = literal_to_val(&variant.value.kind).ok_or_else(|| {
            CompileError::type_error(format!(
                "Invalid literal for enum variant \"{}.{}\"",
                decl.name.name, variant.name.name
            ))
            .with_span(variant.value.span)
        })?;
        let value_ty = Type::of_val(&value);
        match &ty {
            None => ty = Some(value_ty),
            Some(expected) if *expected != value_ty => {
                return Err(CompileError::type_error(format!(
                    "Enum \"{}\" variants must share one primitive type",
                    decl.name.name
                ))
                .with_span(decl.span));
            }
            Some(_) => {}
        }
        if variants.iter().any(|(name, _)| *name == variant.name.name) {
            return Err(CompileError::name(format!(
                "Enum variant \"{}.{}\" is defined multiple times in contract \"{owner}\"",
                decl.name.name, variant.name.name
            ))
            .with_span(decl.span));
        }
        variants.push((variant.name.name, value));
    }
    let ty = ty.ok_or_else(|| {
        CompileError::syntax(format!("Enum \"{}\" has no variants", decl.name.name))
            .with_span(decl.span)
    })?;
    Ok(EnumInfo {
        name: decl.name.name,
        ty,
        variants,
        span: decl.span,
    })
}

fn register_func<'ast>(
    func: &FuncDecl<'ast>,
    owner: &'ast str,
    resolver: &TypeResolver<'_, 'ast>,
) -> Result<FuncInfo<'ast>, CompileError> {
    let mut params = Vec::with_capacity(func.params.len());
    let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
    for param in func.params {
        if param.name.name != "_" && seen.insert(param.name.name, ()).is_some() {
            return Err(CompileError::name(format!(
                "Parameter \"{}\" is defined multiple times in function \"{}.{}\"",
                param.name.name, owner, func.name.name
            ))
            .with_span(param.span));
        }
        params.push(resolver.resolve(&param.ty)?);
    }
    let mut returns = Vec::with_capacity(func.returns.len());
    for ret in func.returns {
        returns.push(resolver.resolve(ret)?);
    }
    Ok(FuncInfo {
        name: func.name.name,
        is_pub: func.is_pub,
        annotations: func.annotations,
        params,
        param_decls: func.params,
        returns,
        body: func.body,
        defined_in: owner,
        span: func.span,
    })
}

/// The value of a literal expression, for constants and enums.
fn literal_to_val(kind: &LiteralKind<'_>) -> Option<Val> {
    Some(match kind {
        LiteralKind::U256(v) => Val::U256(*v),
        LiteralKind::I256(v) => Val::I256(*v),
        LiteralKind::Bool(b) => Val::Bool(*b),
        LiteralKind::ByteVec(bs) => Val::ByteVec(bs.to_vec()),
        LiteralKind::Address(bs) => Val::Address(bs.to_vec()),
        LiteralKind::Alph | LiteralKind::String(_) => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ralph_parser::Parser;

    fn registry_for<'ast>(arena: &'ast Bump, source: &str) -> Result<Registry<'ast>, CompileError> {
        let text = arena.alloc_str(source);
        let unit = Parser::parse(text, arena).unwrap();
        let unit = arena.alloc(unit);
        build_registry(unit)
    }

    #[test]
    fn registers_contract_members() {
        let arena = Bump::new();
        let registry = registry_for(
            &arena,
            r#"
            Contract Foo(a: U256, mut b: [Bool; 2]) {
                event Done(who: Address)
                const LIMIT = 10
                enum Codes { Bad = 0 }
                pub fn f() -> U256 { return a }
            }
            "#,
        )
        .unwrap();
        let meta = registry.get("Foo").unwrap();
        assert_eq!(meta.kind, DeclKind::Contract);
        assert_eq!(meta.fields.len(), 2);
        assert_eq!(meta.fields[1].ty, Type::Array(Box::new(Type::Bool), 2));
        assert_eq!(meta.own_events.len(), 1);
        assert_eq!(meta.own_consts.len(), 1);
        assert_eq!(meta.own_enums.len(), 1);
        assert_eq!(meta.own_funcs.len(), 1);
    }

    #[test]
    fn rejects_duplicate_declarations() {
        let arena = Bump::new();
        let err = registry_for(
            &arena,
            "Contract Foo() { pub fn f() -> () { return } } Contract Foo() { pub fn f() -> () { return } }",
        )
        .unwrap_err();
        assert!(err.message.contains("defined multiple times"));
    }

    #[test]
    fn rejects_empty_interface() {
        let arena = Bump::new();
        let err = registry_for(&arena, "Interface Foo {}").unwrap_err();
        assert_eq!(err.message, "No function definition in Interface Foo");
    }

    #[test]
    fn rejects_txscript_without_main() {
        let arena = Bump::new();
        let err = registry_for(&arena, "TxScript Foo {}").unwrap_err();
        assert_eq!(err.message, "Expected main statements for type \"Foo\"");
    }

    #[test]
    fn rejects_oversized_event() {
        let arena = Bump::new();
        let err = registry_for(
            &arena,
            "Contract Foo() {
                event Big(a: U256, b: U256, c: U256, d: U256, e: U256, f: U256, g: U256, h: U256, i: U256)
                pub fn f() -> () { return }
            }",
        )
        .unwrap_err();
        assert_eq!(err.message, "Max 8 fields allowed for contract events");
    }

    #[test]
    fn rejects_mixed_enum_types() {
        let arena = Bump::new();
        let err = registry_for(
            &arena,
            "Contract Foo() {
                enum Mixed { A = 0, B = #00 }
                pub fn f() -> () { return }
            }",
        )
        .unwrap_err();
        assert!(err.message.contains("share one primitive type"));
    }

    #[test]
    fn registers_script_template_params() {
        let arena = Bump::new();
        let registry = registry_for(
            &arena,
            "TxScript Main(amount: U256, ok: Bool) { assert!(ok, 0) }",
        )
        .unwrap();
        let meta = registry.get("Main").unwrap();
        assert_eq!(meta.template_params.len(), 2);
        assert_eq!(meta.own_funcs[0].name, "main");
    }
}
