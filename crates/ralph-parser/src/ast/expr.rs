//! Expression AST nodes.

use crate::ast::ops::{BinaryOp, UnaryOp};
use crate::ast::Ident;
use ralph_core::{Span, I256, U256};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    /// A literal value.
    Literal(LiteralExpr<'ast>),
    /// A variable, field, or constant reference.
    Var(Ident<'ast>),
    /// A dotted access `Base.name`: enum variant or namespaced constant.
    Select(&'ast SelectExpr<'ast>),
    /// A binary operation.
    Binary(&'ast BinaryExpr<'ast>),
    /// A unary operation.
    Unary(&'ast UnaryExpr<'ast>),
    /// A parenthesized expression.
    Paren(&'ast ParenExpr<'ast>),
    /// An array literal `[a, b, c]`.
    ArrayLit(&'ast ArrayLitExpr<'ast>),
    /// An array fill `[v; n]` with constant `n`.
    ArrayFill(&'ast ArrayFillExpr<'ast>),
    /// An index access `a[i]`.
    Index(&'ast IndexExpr<'ast>),
    /// A call: local, builtin, external method, or static.
    Call(&'ast CallExpr<'ast>),
    /// An if/else expression (both branches mandatory).
    IfElse(&'ast IfElseExpr<'ast>),
}

impl Expr<'_> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Var(ident) => ident.span,
            Expr::Select(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::ArrayLit(e) => e.span,
            Expr::ArrayFill(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::IfElse(e) => e.span,
        }
    }
}

/// A literal expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    /// The literal's value.
    pub kind: LiteralKind<'ast>,
    /// Source location.
    pub span: Span,
}

/// The value of a literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    /// Unsigned 256-bit integer (default for decimal literals).
    U256(U256),
    /// Signed 256-bit integer (`i` suffix).
    I256(I256),
    /// Boolean.
    Bool(bool),
    /// Byte string `#…` (decoded).
    ByteVec(&'ast [u8]),
    /// Address `@…` (base58-decoded).
    Address(&'ast [u8]),
    /// The distinguished `ALPH` native-token id.
    Alph,
    /// Quoted string contents (debug messages), as UTF-8 bytes.
    String(&'ast [u8]),
}

/// A dotted access `Base.name`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectExpr<'ast> {
    /// The namespace: an enum name.
    pub base: Ident<'ast>,
    /// The selected member.
    pub field: Ident<'ast>,
    /// Source location.
    pub span: Span,
}

/// A binary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

/// A unary operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// A parenthesized expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParenExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// An array literal `[a, b, c]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayLitExpr<'ast> {
    pub elems: &'ast [Expr<'ast>],
    pub span: Span,
}

/// An array fill `[v; n]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayFillExpr<'ast> {
    pub value: &'ast Expr<'ast>,
    pub size: &'ast Expr<'ast>,
    pub span: Span,
}

/// An index access `a[i]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub base: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

/// What a call refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallTarget<'ast> {
    /// A function of the enclosing contract: `foo(…)`.
    Local(Ident<'ast>),
    /// A builtin: `assert!(…)`. The name excludes the trailing `!`.
    Builtin(Ident<'ast>),
    /// An external call on a contract reference: `obj.foo(…)`.
    Method {
        receiver: Ident<'ast>,
        func: Ident<'ast>,
    },
    /// A static call on a type: `Type.encodeFields!(…)`.
    /// The name excludes the trailing `!`.
    Static {
        ty: Ident<'ast>,
        func: Ident<'ast>,
    },
}

/// A single `addr -> tokenId: amount` clause of the braces-approval syntax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApprovalClause<'ast> {
    pub address: &'ast Expr<'ast>,
    pub token: &'ast Expr<'ast>,
    pub amount: &'ast Expr<'ast>,
    pub span: Span,
}

/// A call expression, optionally carrying braces-approval clauses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub target: CallTarget<'ast>,
    /// Approval clauses from `f{addr -> tokenId: amount, …}(…)`; empty
    /// when the braces syntax is absent.
    pub approvals: &'ast [ApprovalClause<'ast>],
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// An if/else expression. Both branches are mandatory and must agree
/// on type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfElseExpr<'ast> {
    pub cond: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub span: Span,
}
