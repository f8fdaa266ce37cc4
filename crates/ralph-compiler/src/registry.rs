//! Symbol tables for declarations.
//!
//! The [`Registry`] is built by the registration pass and completed by
//! the inheritance resolver: `own_*` member lists hold what a
//! declaration literally declares; the resolved lists hold the
//! linearized, merged view the function compiler works against.

use rustc_hash::FxHashMap;

use ralph_core::{Span, Val};
use ralph_parser::ast::{Block, FuncAnnotations, Item, ParamDecl};

use crate::types::{format_type_list, Type};

/// What kind of declaration a [`ContractMeta`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// A concrete contract.
    Contract,
    /// An abstract contract. Never emitted.
    AbstractContract,
    /// An interface. Never emitted.
    Interface,
    /// A transaction script.
    TxScript,
    /// An asset (unlock) script.
    AssetScript,
}

impl DeclKind {
    /// Whether this declaration can appear in inheritance chains.
    pub fn is_contract_like(self) -> bool {
        matches!(
            self,
            DeclKind::Contract | DeclKind::AbstractContract | DeclKind::Interface
        )
    }

    /// Whether this declaration is a one-shot script.
    pub fn is_script(self) -> bool {
        matches!(self, DeclKind::TxScript | DeclKind::AssetScript)
    }

    /// Whether bytecode is emitted for this declaration.
    pub fn emits_code(self) -> bool {
        matches!(
            self,
            DeclKind::Contract | DeclKind::TxScript | DeclKind::AssetScript
        )
    }
}

/// A contract field, declared or synthetic.
#[derive(Debug, Clone)]
pub struct FieldInfo<'ast> {
    pub name: &'ast str,
    pub mutable: bool,
    /// `@unused` annotation; suppresses the unused warning.
    pub unused: bool,
    pub ty: Type,
    pub span: Span,
    /// Injected `@std` id field rather than source text.
    pub synthetic: bool,
}

/// Where a field lives: its region and first scalar slot within it.
#[derive(Debug, Clone)]
pub struct FieldSlot {
    pub ty: Type,
    pub mutable: bool,
    /// Base slot within the immutable or mutable region.
    pub base: usize,
}

/// A function signature plus its body.
#[derive(Debug, Clone)]
pub struct FuncInfo<'ast> {
    pub name: &'ast str,
    pub is_pub: bool,
    pub annotations: FuncAnnotations,
    /// Parameter types, one entry per parameter (arrays unflattened).
    pub params: Vec<Type>,
    pub param_decls: &'ast [ParamDecl<'ast>],
    pub returns: Vec<Type>,
    /// `None` for interface signatures and abstract methods.
    pub body: Option<Block<'ast>>,
    /// Name of the declaration that provided this function.
    pub defined_in: &'ast str,
    pub span: Span,
}

/// An event signature.
#[derive(Debug, Clone)]
pub struct EventInfo<'ast> {
    pub name: &'ast str,
    pub params: Vec<Type>,
    pub defined_in: &'ast str,
    pub span: Span,
}

impl EventInfo<'_> {
    /// Render as `Name(T, U)` for diagnostics.
    pub fn signature(&self) -> String {
        let list = format_type_list(&self.params);
        format!("{}{}", self.name, &list["List".len()..])
    }
}

/// A contract constant.
#[derive(Debug, Clone)]
pub struct ConstInfo<'ast> {
    pub name: &'ast str,
    pub value: Val,
    pub span: Span,
}

/// An enum with its merged variant set.
#[derive(Debug, Clone)]
pub struct EnumInfo<'ast> {
    pub name: &'ast str,
    /// The shared primitive type of all variants.
    pub ty: Type,
    pub variants: Vec<(&'ast str, Val)>,
    pub span: Span,
}

/// Everything the compiler knows about one declaration.
#[derive(Debug, Clone)]
pub struct ContractMeta<'ast> {
    pub name: &'ast str,
    pub kind: DeclKind,
    pub span: Span,
    pub item: Item<'ast>,

    /// Declared fields, in source order. The inheritance resolver may
    /// append a synthetic `@std` id field.
    pub fields: Vec<FieldInfo<'ast>>,
    /// Field name to slot, filled by the inheritance resolver.
    pub field_slots: FxHashMap<&'ast str, FieldSlot>,
    /// Scalar slots in the immutable region (including synthetic).
    pub imm_field_count: usize,
    /// Scalar slots in the mutable region.
    pub mut_field_count: usize,

    // Members as declared.
    pub own_funcs: Vec<FuncInfo<'ast>>,
    pub own_events: Vec<EventInfo<'ast>>,
    pub own_consts: Vec<ConstInfo<'ast>>,
    pub own_enums: Vec<EnumInfo<'ast>>,

    // Members after linearization and merging.
    pub funcs: Vec<FuncInfo<'ast>>,
    pub func_index: FxHashMap<&'ast str, usize>,
    pub events: Vec<EventInfo<'ast>>,
    pub event_index: FxHashMap<&'ast str, usize>,
    pub consts: Vec<ConstInfo<'ast>>,
    pub const_index: FxHashMap<&'ast str, usize>,
    pub enums: Vec<EnumInfo<'ast>>,
    pub enum_index: FxHashMap<&'ast str, usize>,

    /// Linearized ancestor indices, base-first. Filled by the
    /// inheritance resolver.
    pub ancestors: Vec<usize>,

    /// `@std` id carried by this interface, or resolved for this
    /// contract from its interface chain.
    pub std_id: Option<Vec<u8>>,
    /// `@std(enabled = …)` on the contract; defaults to true.
    pub std_enabled: bool,

    /// Template variables of a script, in declaration order.
    pub template_params: Vec<(&'ast str, Type)>,
}

impl<'ast> ContractMeta<'ast> {
    /// Create an empty meta for a declaration.
    pub fn new(name: &'ast str, kind: DeclKind, span: Span, item: Item<'ast>) -> Self {
        Self {
            name,
            kind,
            span,
            item,
            fields: Vec::new(),
            field_slots: FxHashMap::default(),
            imm_field_count: 0,
            mut_field_count: 0,
            own_funcs: Vec::new(),
            own_events: Vec::new(),
            own_consts: Vec::new(),
            own_enums: Vec::new(),
            funcs: Vec::new(),
            func_index: FxHashMap::default(),
            events: Vec::new(),
            event_index: FxHashMap::default(),
            consts: Vec::new(),
            const_index: FxHashMap::default(),
            enums: Vec::new(),
            enum_index: FxHashMap::default(),
            ancestors: Vec::new(),
            std_id: None,
            std_enabled: true,
            template_params: Vec::new(),
        }
    }

    /// Look up a resolved function by name.
    pub fn func(&self, name: &str) -> Option<(usize, &FuncInfo<'ast>)> {
        let index = *self.func_index.get(name)?;
        Some((index, &self.funcs[index]))
    }

    /// Look up a resolved constant by name.
    pub fn constant(&self, name: &str) -> Option<&ConstInfo<'ast>> {
        self.const_index.get(name).map(|i| &self.consts[*i])
    }

    /// Look up a resolved enum by name.
    pub fn enum_def(&self, name: &str) -> Option<&EnumInfo<'ast>> {
        self.enum_index.get(name).map(|i| &self.enums[*i])
    }

    /// Look up a script template variable by name.
    pub fn template_param(&self, name: &str) -> Option<(usize, &Type)> {
        self.template_params
            .iter()
            .position(|(n, _)| *n == name)
            .map(|i| (i, &self.template_params[i].1))
    }

    /// Total scalar field slots, immutable plus mutable.
    pub fn field_length(&self) -> usize {
        self.imm_field_count + self.mut_field_count
    }

    /// Rebuild the name-to-index maps from the resolved member lists.
    pub fn rebuild_indices(&mut self) {
        self.func_index = self
            .funcs
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();
        self.event_index = self
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name, i))
            .collect();
        self.const_index = self
            .consts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name, i))
            .collect();
        self.enum_index = self
            .enums
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name, i))
            .collect();
    }
}

/// All declarations of one compilation unit, by name and in
/// declaration order.
#[derive(Debug, Default)]
pub struct Registry<'ast> {
    pub metas: Vec<ContractMeta<'ast>>,
    pub by_name: FxHashMap<&'ast str, usize>,
}

impl<'ast> Registry<'ast> {
    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&ContractMeta<'ast>> {
        self.by_name.get(name).map(|i| &self.metas[*i])
    }

    /// Look up a declaration index by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_signature_rendering() {
        let event = EventInfo {
            name: "Add",
            params: vec![Type::U256, Type::U256],
            defined_in: "Foo",
            span: Span::default(),
        };
        assert_eq!(event.signature(), "Add(U256, U256)");
    }
}
