//! Syntactic type expressions.
//!
//! Types as written in source: a bare name (`U256`, `Bool`, a contract
//! name) or a fixed-size array `[T; n]` whose size is a constant
//! expression. Resolution to semantic types happens in the compiler.

use crate::ast::expr::Expr;
use crate::ast::Ident;
use ralph_core::Span;

/// A type expression as written in source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeExpr<'ast> {
    /// A named type: primitive scalar or contract/interface reference.
    Named(Ident<'ast>),
    /// A fixed-size array type: `[T; n]`.
    Array(&'ast ArrayTypeExpr<'ast>),
}

/// A fixed-size array type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayTypeExpr<'ast> {
    /// Element type (possibly itself an array).
    pub elem: TypeExpr<'ast>,
    /// Size, a constant expression.
    pub size: &'ast Expr<'ast>,
    /// Source location.
    pub span: Span,
}

impl TypeExpr<'_> {
    /// Get the span of this type expression.
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(ident) => ident.span,
            TypeExpr::Array(array) => array.span,
        }
    }
}
