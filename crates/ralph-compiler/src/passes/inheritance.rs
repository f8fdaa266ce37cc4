//! Pass 1.5: inheritance resolution.
//!
//! Builds the `extends`/`implements` graph, rejects cycles, linearizes
//! each declaration's ancestors (base-first DFS), and merges member
//! tables into the resolved view: functions (with interface-signature
//! compatibility checks), events, constants, enums (variant-set union),
//! forwarded field lists, and `@std` id propagation. Finishes by
//! assigning scalar field slots.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use ralph_core::CompileError;
use ralph_parser::ast::{ContractDecl, Ident, Item};

use crate::registry::{
    ContractMeta, DeclKind, EnumInfo, FieldInfo, FieldSlot, FuncInfo, Registry,
};
use crate::types::Type;

/// Maximum scalar field slots and methods per contract.
const MAX_SLOTS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Extends,
    Implements,
}

/// Resolve inheritance for every declaration.
///
/// Returns the processing order for later passes: parents before
/// children, declaration order otherwise.
pub fn resolve_inheritance<'ast>(
    registry: &mut Registry<'ast>,
) -> Result<Vec<usize>, CompileError> {
    let n = registry.metas.len();

    // Direct parent edges, with kind checks.
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let meta = &registry.metas[i];
        for (ident, link) in direct_parent_idents(&meta.item) {
            let parent = registry.index_of(ident.name).ok_or_else(|| {
                CompileError::name(format!("Contract \"{}\" does not exist", ident.name))
                    .with_span(ident.span)
            })?;
            let parent_kind = registry.metas[parent].kind;
            match (meta.kind, link) {
                (DeclKind::Contract | DeclKind::AbstractContract, Link::Extends) => {
                    if !matches!(
                        parent_kind,
                        DeclKind::Contract | DeclKind::AbstractContract
                    ) {
                        return Err(CompileError::inheritance(format!(
                            "Contract \"{}\" can only extend a contract, not \"{}\"",
                            meta.name, ident.name
                        ))
                        .with_span(ident.span));
                    }
                }
                (DeclKind::Contract | DeclKind::AbstractContract, Link::Implements) => {
                    if parent_kind != DeclKind::Interface {
                        return Err(CompileError::inheritance(format!(
                            "Contract \"{}\" can only implement an interface, not \"{}\"",
                            meta.name, ident.name
                        ))
                        .with_span(ident.span));
                    }
                }
                (DeclKind::Interface, _) => {
                    if parent_kind != DeclKind::Interface {
                        return Err(CompileError::inheritance(format!(
                            "Interface {} can only extend an interface, not \"{}\"",
                            meta.name, ident.name
                        ))
                        .with_span(ident.span));
                    }
                }
                _ => {
                    return Err(CompileError::inheritance(format!(
                        "Script \"{}\" cannot take part in inheritance",
                        meta.name
                    ))
                    .with_span(ident.span));
                }
            }
            parents[i].push(parent);
        }

        // Each interface has at most one parent interface.
        if meta.kind == DeclKind::Interface && parents[i].len() > 1 {
            let first = registry.metas[parents[i][0]].name;
            let second = registry.metas[parents[i][1]].name;
            return Err(CompileError::inheritance(format!(
                "Only single inheritance is allowed. Interface {first} does not inherit from {second}"
            ))
            .with_span(meta.span));
        }
    }

    // Cycle rejection, reported for the first declaration involved.
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();
    for (i, ps) in parents.iter().enumerate() {
        for &p in ps {
            graph.add_edge(nodes[i], nodes[p], ());
        }
    }
    for i in 0..n {
        for &p in &parents[i] {
            if p == i || has_path_connecting(&graph, nodes[p], nodes[i], None) {
                return Err(CompileError::inheritance(format!(
                    "Cyclic inheritance detected for contract {}",
                    registry.metas[i].name
                ))
                .with_span(registry.metas[i].span));
            }
        }
    }

    // Ancestor linearization, base-first.
    let mut memo: Vec<Option<Vec<usize>>> = vec![None; n];
    for i in 0..n {
        linearize(i, &parents, &mut memo);
    }

    // Merge members, declaration order.
    for i in 0..n {
        let ancestors = memo[i].clone().unwrap_or_default();
        let merged = build_merged(registry, i, &ancestors, &memo)?;
        let meta = &mut registry.metas[i];
        meta.ancestors = ancestors;
        meta.funcs = merged.funcs;
        meta.events = merged.events;
        meta.consts = merged.consts;
        meta.enums = merged.enums;
        meta.fields = merged.fields;
        meta.std_id = merged.std_id;
        meta.rebuild_indices();
        assign_field_slots(meta)?;
        if meta.funcs.len() > MAX_SLOTS {
            return Err(CompileError::internal(format!(
                "Contract \"{}\" has too many methods (max {MAX_SLOTS})",
                meta.name
            )));
        }
    }

    // Processing order: parents first, declaration order otherwise.
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    for i in 0..n {
        visit(i, &parents, &mut visited, &mut order);
    }
    Ok(order)
}

fn visit(i: usize, parents: &[Vec<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
    if visited[i] {
        return;
    }
    visited[i] = true;
    for &p in &parents[i] {
        visit(p, parents, visited, order);
    }
    order.push(i);
}

fn linearize(i: usize, parents: &[Vec<usize>], memo: &mut Vec<Option<Vec<usize>>>) -> Vec<usize> {
    if let Some(done) = &memo[i] {
        return done.clone();
    }
    let mut out: Vec<usize> = Vec::new();
    for &p in &parents[i] {
        for a in linearize(p, parents, memo) {
            if !out.contains(&a) {
                out.push(a);
            }
        }
        if !out.contains(&p) {
            out.push(p);
        }
    }
    memo[i] = Some(out.clone());
    out
}

fn direct_parent_idents<'ast>(item: &Item<'ast>) -> Vec<(Ident<'ast>, Link)> {
    match item {
        Item::Contract(decl) => decl
            .extends
            .iter()
            .map(|clause| (clause.parent, Link::Extends))
            .chain(decl.implements.iter().map(|i| (*i, Link::Implements)))
            .collect(),
        Item::Interface(decl) => decl.extends.iter().map(|i| (*i, Link::Extends)).collect(),
        _ => Vec::new(),
    }
}

struct Merged<'ast> {
    funcs: Vec<FuncInfo<'ast>>,
    events: Vec<crate::registry::EventInfo<'ast>>,
    consts: Vec<crate::registry::ConstInfo<'ast>>,
    enums: Vec<EnumInfo<'ast>>,
    fields: Vec<FieldInfo<'ast>>,
    std_id: Option<Vec<u8>>,
}

fn build_merged<'ast>(
    registry: &Registry<'ast>,
    i: usize,
    ancestors: &[usize],
    memo: &[Option<Vec<usize>>],
) -> Result<Merged<'ast>, CompileError> {
    let meta = &registry.metas[i];
    let child = meta.name;

    // Functions: ancestors base-first, then own; implementations
    // replace signatures in place so interface method indices hold.
    let mut funcs: Vec<FuncInfo<'ast>> = Vec::new();
    let mut func_pos: FxHashMap<&'ast str, usize> = FxHashMap::default();
    let mut events: Vec<crate::registry::EventInfo<'ast>> = Vec::new();
    let mut consts: Vec<crate::registry::ConstInfo<'ast>> = Vec::new();
    let mut enums: Vec<EnumInfo<'ast>> = Vec::new();

    for &source_index in ancestors.iter().chain(std::iter::once(&i)) {
        let source = &registry.metas[source_index];
        for func in &source.own_funcs {
            merge_func(&mut funcs, &mut func_pos, func, child)?;
        }
        for event in &source.own_events {
            if events.iter().any(|e| e.name == event.name) {
                return Err(CompileError::inheritance(format!(
                    "Event \"{}\" is defined multiple times in contract \"{child}\"",
                    event.name
                ))
                .with_span(event.span));
            }
            events.push(event.clone());
        }
        for constant in &source.own_consts {
            if consts.iter().any(|c| c.name == constant.name) {
                return Err(CompileError::inheritance(format!(
                    "Constant \"{}\" is defined multiple times in contract \"{child}\"",
                    constant.name
                ))
                .with_span(constant.span));
            }
            consts.push(constant.clone());
        }
        for enum_info in &source.own_enums {
            merge_enum(&mut enums, enum_info, child)?;
        }
    }

    // Concrete contracts must implement everything they inherit.
    if meta.kind == DeclKind::Contract {
        for func in &funcs {
            if func.body.is_none() {
                return Err(CompileError::inheritance(format!(
                    "Function \"{}\" is not implemented in contract \"{child}\"",
                    func.name
                ))
                .with_span(meta.span));
            }
        }
    }

    // Interfaces in the linearization must form a single chain.
    check_interface_chain(registry, meta, ancestors, memo)?;

    // Forwarded field lists for each direct `extends` clause.
    if let Item::Contract(decl) = &meta.item {
        check_extends_fields(registry, meta, decl)?;
    }

    // @std id: interfaces validate against their parent; contracts take
    // the most-derived interface id from the linearization.
    let std_id = resolve_std_id(registry, meta, i, ancestors)?;

    // Fields are the child's declared list, plus the synthetic @std id
    // slot at the end of the immutable region.
    let mut fields = meta.fields.clone();
    if meta.kind == DeclKind::Contract && meta.std_enabled && std_id.is_some() {
        fields.push(FieldInfo {
            name: "__stdId",
            mutable: false,
            unused: true,
            ty: Type::ByteVec,
            span: meta.span,
            synthetic: true,
        });
    }

    Ok(Merged {
        funcs,
        events,
        consts,
        enums,
        fields,
        std_id,
    })
}

fn merge_func<'ast>(
    funcs: &mut Vec<FuncInfo<'ast>>,
    func_pos: &mut FxHashMap<&'ast str, usize>,
    func: &FuncInfo<'ast>,
    child: &'ast str,
) -> Result<(), CompileError> {
    let Some(&pos) = func_pos.get(func.name) else {
        func_pos.insert(func.name, funcs.len());
        funcs.push(func.clone());
        return Ok(());
    };
    let existing = &funcs[pos];
    match (existing.body.is_some(), func.body.is_some()) {
        // Implementation of an inherited signature: keep its slot.
        (false, true) => {
            check_impl_compat(existing, func, child)?;
            funcs[pos] = func.clone();
            Ok(())
        }
        // Signature arriving after the implementation (an interface
        // later in the linearization).
        (true, false) => check_impl_compat(func, existing, child),
        _ => Err(CompileError::inheritance(format!(
            "Function \"{}\" is defined multiple times in contract \"{child}\"",
            func.name
        ))
        .with_span(func.span)),
    }
}

/// Check an implementation against the signature it fulfills.
fn check_impl_compat(
    sig: &FuncInfo<'_>,
    implementation: &FuncInfo<'_>,
    child: &str,
) -> Result<(), CompileError> {
    let name = sig.name;
    if sig.is_pub != implementation.is_pub {
        return Err(CompileError::inheritance(format!(
            "Function \"{name}\" is implemented with wrong visibility in contract \"{child}\""
        ))
        .with_span(implementation.span));
    }
    if sig.params != implementation.params || sig.returns != implementation.returns {
        return Err(CompileError::inheritance(format!(
            "Function \"{name}\" is implemented with wrong signature in contract \"{child}\""
        ))
        .with_span(implementation.span));
    }
    let sig_ann = sig.annotations;
    let impl_ann = implementation.annotations;
    if sig_ann.preapproved_assets != impl_ann.preapproved_assets {
        return Err(CompileError::inheritance(format!(
            "Function \"{name}\" in contract \"{child}\" must use preapprovedAssets = {} as declared in \"{}\"",
            sig_ann.preapproved_assets, sig.defined_in
        ))
        .with_span(implementation.span));
    }
    // The remaining flags may only be tightened by the implementation.
    let tightenable = [
        ("assetsInContract", sig_ann.assets_in_contract, impl_ann.assets_in_contract),
        (
            "checkExternalCaller",
            sig_ann.check_external_caller,
            impl_ann.check_external_caller,
        ),
        ("updateFields", sig_ann.update_fields, impl_ann.update_fields),
    ];
    for (flag, declared, implemented) in tightenable {
        if declared && !implemented {
            return Err(CompileError::inheritance(format!(
                "Function \"{name}\" in contract \"{child}\" must be annotated with {flag} = true as declared in \"{}\"",
                sig.defined_in
            ))
            .with_span(implementation.span));
        }
    }
    Ok(())
}

fn merge_enum<'ast>(
    enums: &mut Vec<EnumInfo<'ast>>,
    incoming: &EnumInfo<'ast>,
    child: &'ast str,
) -> Result<(), CompileError> {
    let Some(existing) = enums.iter_mut().find(|e| e.name == incoming.name) else {
        enums.push(incoming.clone());
        return Ok(());
    };
    if existing.ty != incoming.ty {
        return Err(CompileError::inheritance(format!(
            "Enum \"{}\" variants must share one primitive type in contract \"{child}\"",
            incoming.name
        ))
        .with_span(incoming.span));
    }
    for (name, value) in &incoming.variants {
        if existing.variants.iter().any(|(n, _)| n == name) {
            return Err(CompileError::inheritance(format!(
                "Enum variant \"{}.{name}\" is defined multiple times in contract \"{child}\"",
                incoming.name
            ))
            .with_span(incoming.span));
        }
        existing.variants.push((name, value.clone()));
    }
    Ok(())
}

fn check_interface_chain<'ast>(
    registry: &Registry<'ast>,
    meta: &ContractMeta<'ast>,
    ancestors: &[usize],
    memo: &[Option<Vec<usize>>],
) -> Result<(), CompileError> {
    let interfaces: Vec<usize> = ancestors
        .iter()
        .copied()
        .filter(|&a| registry.metas[a].kind == DeclKind::Interface)
        .collect();
    if interfaces.len() < 2 {
        return Ok(());
    }
    let deepest = *interfaces
        .iter()
        .max_by_key(|&&a| memo[a].as_ref().map(Vec::len).unwrap_or(0))
        .unwrap();
    let deepest_ancestors = memo[deepest].as_ref().cloned().unwrap_or_default();
    for &other in &interfaces {
        if other != deepest && !deepest_ancestors.contains(&other) {
            return Err(CompileError::inheritance(format!(
                "Only single inheritance is allowed. Interface {} does not inherit from {}",
                registry.metas[deepest].name, registry.metas[other].name
            ))
            .with_span(meta.span));
        }
    }
    Ok(())
}

fn check_extends_fields<'ast>(
    registry: &Registry<'ast>,
    meta: &ContractMeta<'ast>,
    decl: &ContractDecl<'ast>,
) -> Result<(), CompileError> {
    for clause in decl.extends {
        let parent = registry
            .get(clause.parent.name)
            .expect("parent existence checked earlier");
        let parent_fields: Vec<&FieldInfo<'ast>> =
            parent.fields.iter().filter(|f| !f.synthetic).collect();
        if clause.args.len() != parent_fields.len() {
            return Err(CompileError::inheritance(format!(
                "Invalid number of fields for contract \"{}\" extending \"{}\": expected {}, got {}",
                meta.name,
                parent.name,
                parent_fields.len(),
                clause.args.len()
            ))
            .with_span(clause.span));
        }
        for (arg, parent_field) in clause.args.iter().zip(parent_fields) {
            if arg.name != parent_field.name {
                return Err(CompileError::inheritance(format!(
                    "Invalid field \"{}\" in contract \"{}\": expected field \"{}\" of contract \"{}\"",
                    arg.name, meta.name, parent_field.name, parent.name
                ))
                .with_span(arg.span));
            }
            let child_field = meta
                .fields
                .iter()
                .find(|f| f.name == arg.name)
                .ok_or_else(|| {
                    CompileError::inheritance(format!(
                        "Contract \"{}\" does not declare field \"{}\" required by \"{}\"",
                        meta.name, arg.name, parent.name
                    ))
                    .with_span(arg.span)
                })?;
            if child_field.mutable != parent_field.mutable {
                return Err(CompileError::inheritance(format!(
                    "Field \"{}\" of contract \"{}\" must {}be mutable to match contract \"{}\"",
                    arg.name,
                    meta.name,
                    if parent_field.mutable { "" } else { "not " },
                    parent.name
                ))
                .with_span(arg.span));
            }
            if child_field.ty != parent_field.ty {
                return Err(CompileError::inheritance(format!(
                    "Field \"{}\" of contract \"{}\" must have type {} to match contract \"{}\"",
                    arg.name, meta.name, parent_field.ty, parent.name
                ))
                .with_span(arg.span));
            }
        }
    }
    Ok(())
}

fn resolve_std_id<'ast>(
    registry: &Registry<'ast>,
    meta: &ContractMeta<'ast>,
    i: usize,
    ancestors: &[usize],
) -> Result<Option<Vec<u8>>, CompileError> {
    if meta.kind == DeclKind::Interface {
        // A child interface id must extend its parent's id bytes.
        if let (Some(id), Some(&parent)) = (
            &meta.std_id,
            ancestors.last().filter(|&&a| a != i),
        ) {
            let parent_meta = &registry.metas[parent];
            if let Some(parent_id) = &parent_meta.std_id {
                if !id.starts_with(parent_id) {
                    return Err(CompileError::inheritance(format!(
                        "Invalid std id for interface \"{}\": it must begin with the id of \"{}\"",
                        meta.name, parent_meta.name
                    ))
                    .with_span(meta.span));
                }
            }
        }
        return Ok(meta.std_id.clone());
    }

    // Contracts: the most-derived interface id wins. Ancestors are
    // base-first, so the last one with an id is the most derived.
    let mut id = None;
    for &a in ancestors {
        let ancestor = &registry.metas[a];
        if ancestor.kind == DeclKind::Interface {
            if let Some(ancestor_id) = &ancestor.std_id {
                id = Some(ancestor_id.clone());
            }
        }
    }
    Ok(id)
}

fn assign_field_slots(meta: &mut ContractMeta<'_>) -> Result<(), CompileError> {
    meta.field_slots.clear();
    let mut imm = 0usize;
    let mut mutable = 0usize;
    for field in &meta.fields {
        let size = field.ty.flattened_size();
        let base = if field.mutable {
            let b = mutable;
            mutable += size;
            b
        } else {
            let b = imm;
            imm += size;
            b
        };
        if !field.synthetic {
            meta.field_slots.insert(
                field.name,
                FieldSlot {
                    ty: field.ty.clone(),
                    mutable: field.mutable,
                    base,
                },
            );
        }
    }
    if imm + mutable > MAX_SLOTS {
        return Err(CompileError::internal(format!(
            "Contract \"{}\" has too many field slots (max {MAX_SLOTS})",
            meta.name
        )));
    }
    meta.imm_field_count = imm;
    meta.mut_field_count = mutable;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::registration::build_registry;
    use bumpalo::Bump;
    use ralph_parser::Parser;

    fn resolve<'ast>(
        arena: &'ast Bump,
        source: &str,
    ) -> Result<(Registry<'ast>, Vec<usize>), CompileError> {
        let text = arena.alloc_str(source);
        let unit = Parser::parse(text, arena).unwrap();
        let unit = arena.alloc(unit);
        let mut registry = build_registry(unit)?;
        let order = resolve_inheritance(&mut registry)?;
        Ok((registry, order))
    }

    #[test]
    fn detects_cycle_naming_first_contract() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            Abstract Contract A() extends B() { pub fn fa() -> () { return } }
            Abstract Contract B() extends C() { pub fn fb() -> () { return } }
            Abstract Contract C() extends A() { pub fn fc() -> () { return } }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.message, "Cyclic inheritance detected for contract A");
    }

    #[test]
    fn merges_parent_members() {
        let arena = Bump::new();
        let (registry, order) = resolve(
            &arena,
            r#"
            Abstract Contract Base(owner: Address) {
                event Changed(value: U256)
                const LIMIT = 5
                enum Codes { Bad = 0 }
                pub fn owner() -> Address { return owner }
            }
            Contract Child(owner: Address, mut value: U256) extends Base(owner) {
                enum Codes { Worse = 1 }
                @using(updateFields = true, checkExternalCaller = false)
                pub fn set(v: U256) -> () {
                    value = v
                    emit Changed(v)
                }
            }
            "#,
        )
        .unwrap();
        let child = registry.get("Child").unwrap();
        assert_eq!(child.funcs.len(), 2);
        assert_eq!(child.funcs[0].name, "owner");
        assert_eq!(child.events.len(), 1);
        assert_eq!(child.consts.len(), 1);
        assert_eq!(child.enums[0].variants.len(), 2);
        assert_eq!(child.imm_field_count, 1);
        assert_eq!(child.mut_field_count, 1);
        // Parents come before children in the processing order.
        let base_pos = order
            .iter()
            .position(|&i| registry.metas[i].name == "Base")
            .unwrap();
        let child_pos = order
            .iter()
            .position(|&i| registry.metas[i].name == "Child")
            .unwrap();
        assert!(base_pos < child_pos);
    }

    #[test]
    fn rejects_field_shape_mismatch() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            Abstract Contract Base(mut value: U256) {
                pub fn get() -> U256 { return value }
            }
            Contract Child(value: U256) extends Base(value) {
                pub fn noop() -> () { return }
            }
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("must be mutable"));
    }

    #[test]
    fn rejects_unrelated_interface_parents() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            Interface A { pub fn a() -> () }
            Interface B { pub fn b() -> () }
            Contract Foo() implements A, B {
                pub fn a() -> () { return }
                pub fn b() -> () { return }
            }
            "#,
        )
        .unwrap_err();
        assert!(err.message.starts_with("Only single inheritance is allowed."));
    }

    #[test]
    fn interface_chain_is_allowed() {
        let arena = Bump::new();
        let (registry, _) = resolve(
            &arena,
            r#"
            Interface A { pub fn a() -> () }
            Interface B extends A { pub fn b() -> () }
            Contract Foo() implements B {
                pub fn a() -> () { return }
                pub fn b() -> () { return }
            }
            "#,
        )
        .unwrap();
        let foo = registry.get("Foo").unwrap();
        assert_eq!(foo.funcs.len(), 2);
        assert!(foo.funcs.iter().all(|f| f.body.is_some()));
    }

    #[test]
    fn std_id_injects_synthetic_field() {
        let arena = Bump::new();
        let (registry, _) = resolve(
            &arena,
            r#"
            @std(id = #0001)
            Interface IToken { pub fn total() -> U256 }
            Contract Token(supply: U256) implements IToken {
                pub fn total() -> U256 { return supply }
            }
            "#,
        )
        .unwrap();
        let token = registry.get("Token").unwrap();
        assert_eq!(token.std_id, Some(vec![0x00, 0x01]));
        assert_eq!(token.imm_field_count, 2);
        assert!(token.fields.last().unwrap().synthetic);
    }

    #[test]
    fn std_id_disabled_by_contract() {
        let arena = Bump::new();
        let (registry, _) = resolve(
            &arena,
            r#"
            @std(id = #0001)
            Interface IToken { pub fn total() -> U256 }
            @std(enabled = false)
            Contract Token(supply: U256) implements IToken {
                pub fn total() -> U256 { return supply }
            }
            "#,
        )
        .unwrap();
        let token = registry.get("Token").unwrap();
        assert_eq!(token.imm_field_count, 1);
    }

    #[test]
    fn child_interface_std_id_must_extend_parent() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            @std(id = #0001)
            Interface A { pub fn a() -> () }
            @std(id = #0200)
            Interface B extends A { pub fn b() -> () }
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("must begin with"));
    }

    #[test]
    fn annotation_tightening_enforced() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            Interface A {
                @using(updateFields = true, checkExternalCaller = false)
                pub fn bump() -> ()
            }
            Contract Foo(mut x: U256) implements A {
                @using(checkExternalCaller = false)
                pub fn bump() -> () {
                    x = x + 1
                    return
                }
            }
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("updateFields = true"));
    }

    #[test]
    fn unimplemented_function_rejected() {
        let arena = Bump::new();
        let err = resolve(
            &arena,
            r#"
            Interface A { pub fn a() -> () }
            Contract Foo() implements A {
                pub fn other() -> () { return }
            }
            "#,
        )
        .unwrap_err();
        assert!(err.message.contains("is not implemented"));
    }
}
