//! Top-level declaration AST nodes.
//!
//! The five declaration kinds: `Contract`, `Abstract Contract`,
//! `Interface`, `TxScript`, and `AssetScript`, plus their members.

use crate::ast::expr::LiteralExpr;
use crate::ast::stmt::{Block, Stmt};
use crate::ast::types::TypeExpr;
use crate::ast::Ident;
use ralph_core::Span;

/// A top-level item in a source unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    /// `Contract` or `Abstract Contract`.
    Contract(&'ast ContractDecl<'ast>),
    /// `Interface`.
    Interface(&'ast InterfaceDecl<'ast>),
    /// `TxScript`.
    TxScript(&'ast TxScriptDecl<'ast>),
    /// `AssetScript`.
    AssetScript(&'ast AssetScriptDecl<'ast>),
}

impl<'ast> Item<'ast> {
    /// The declared name.
    pub fn name(&self) -> Ident<'ast> {
        match self {
            Item::Contract(d) => d.name,
            Item::Interface(d) => d.name,
            Item::TxScript(d) => d.name,
            Item::AssetScript(d) => d.name,
        }
    }

    /// Get the span of this item.
    pub fn span(&self) -> Span {
        match self {
            Item::Contract(d) => d.span,
            Item::Interface(d) => d.span,
            Item::TxScript(d) => d.span,
            Item::AssetScript(d) => d.span,
        }
    }
}

/// An `@std(…)` annotation: `id = #hex` on interfaces,
/// `enabled = false` on contracts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StdAnnotation<'ast> {
    /// `id = #hex` bytes, when present.
    pub id: Option<&'ast [u8]>,
    /// `enabled = …`, when present.
    pub enabled: Option<bool>,
    pub span: Span,
}

/// The `@using(…)` annotation state of a function.
///
/// `checkExternalCaller` defaults to `true`; the other flags default to
/// `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncAnnotations {
    pub preapproved_assets: bool,
    pub assets_in_contract: bool,
    pub check_external_caller: bool,
    pub update_fields: bool,
}

impl Default for FuncAnnotations {
    fn default() -> Self {
        Self {
            preapproved_assets: false,
            assets_in_contract: false,
            check_external_caller: true,
            update_fields: false,
        }
    }
}

/// A contract field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub mutable: bool,
    /// `@unused` annotation.
    pub unused: bool,
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// A function or script parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDecl<'ast> {
    pub mutable: bool,
    /// `@unused` annotation.
    pub unused: bool,
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// An event declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [EventParam<'ast>],
    pub span: Span,
}

/// A single event parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventParam<'ast> {
    pub name: Ident<'ast>,
    pub ty: TypeExpr<'ast>,
}

/// A contract constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstDecl<'ast> {
    pub name: Ident<'ast>,
    pub value: LiteralExpr<'ast>,
    pub span: Span,
}

/// An enum declaration. All variants must share one primitive type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumDecl<'ast> {
    pub name: Ident<'ast>,
    pub variants: &'ast [EnumVariant<'ast>],
    pub span: Span,
}

/// One enum variant with its literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumVariant<'ast> {
    pub name: Ident<'ast>,
    pub value: LiteralExpr<'ast>,
}

/// A function declaration.
///
/// `body` is `None` for interface signatures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuncDecl<'ast> {
    pub annotations: FuncAnnotations,
    pub is_pub: bool,
    pub name: Ident<'ast>,
    pub params: &'ast [ParamDecl<'ast>],
    pub returns: &'ast [TypeExpr<'ast>],
    pub body: Option<Block<'ast>>,
    pub span: Span,
}

/// An `extends Parent(field, …)` clause. The arguments forward the
/// child's fields to the parent's field list, by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendsClause<'ast> {
    pub parent: Ident<'ast>,
    pub args: &'ast [Ident<'ast>],
    pub span: Span,
}

/// A `Contract` or `Abstract Contract` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractDecl<'ast> {
    pub is_abstract: bool,
    pub std: Option<StdAnnotation<'ast>>,
    pub name: Ident<'ast>,
    pub fields: &'ast [FieldDecl<'ast>],
    pub extends: &'ast [ExtendsClause<'ast>],
    pub implements: &'ast [Ident<'ast>],
    pub events: &'ast [EventDecl<'ast>],
    pub consts: &'ast [ConstDecl<'ast>],
    pub enums: &'ast [EnumDecl<'ast>],
    pub funcs: &'ast [FuncDecl<'ast>],
    pub span: Span,
}

/// An `Interface` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceDecl<'ast> {
    pub std: Option<StdAnnotation<'ast>>,
    pub name: Ident<'ast>,
    /// Parent interfaces. At most one is legal; the resolver enforces the
    /// single-chain rule.
    pub extends: &'ast [Ident<'ast>],
    pub events: &'ast [EventDecl<'ast>],
    pub funcs: &'ast [FuncDecl<'ast>],
    pub span: Span,
}

/// A `TxScript` declaration. The parameters are template variables;
/// the main statements form the implicit entry function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxScriptDecl<'ast> {
    /// Script-level `@using(…)`, applied to the implicit main function.
    pub annotations: FuncAnnotations,
    pub name: Ident<'ast>,
    pub params: &'ast [ParamDecl<'ast>],
    pub main: &'ast [Stmt<'ast>],
    pub funcs: &'ast [FuncDecl<'ast>],
    pub span: Span,
}

/// An `AssetScript` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetScriptDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [ParamDecl<'ast>],
    pub funcs: &'ast [FuncDecl<'ast>],
    pub span: Span,
}
