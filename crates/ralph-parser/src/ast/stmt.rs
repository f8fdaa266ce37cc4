//! Statement AST nodes.

use crate::ast::expr::Expr;
use crate::ast::Ident;
use ralph_core::Span;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// A let binding, possibly destructuring a multi-value call.
    Let(&'ast LetStmt<'ast>),
    /// An assignment, possibly to multiple targets.
    Assign(&'ast AssignStmt<'ast>),
    /// An if/else-if/else chain.
    If(&'ast IfStmt<'ast>),
    /// A while loop.
    While(&'ast WhileStmt<'ast>),
    /// A for loop with init/cond/update.
    For(&'ast ForStmt<'ast>),
    /// A return, possibly with multiple values.
    Return(&'ast ReturnStmt<'ast>),
    /// An event emission.
    Emit(&'ast EmitStmt<'ast>),
    /// An expression statement (a call).
    Expr(&'ast ExprStmt<'ast>),
}

impl Stmt<'_> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Emit(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }
}

/// A braced block of statements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// One variable bound by a `let`.
///
/// The name `_` discards the bound slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetVar<'ast> {
    /// `mut` binding.
    pub mutable: bool,
    /// `@unused` annotation (suppresses the unused warning).
    pub unused: bool,
    pub name: Ident<'ast>,
}

impl LetVar<'_> {
    /// Whether this binds the anonymous `_` slot.
    pub fn is_anonymous(&self) -> bool {
        self.name.name == "_"
    }
}

/// A let binding: `let a = e` or `let (a, mut b, _) = f()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetStmt<'ast> {
    pub vars: &'ast [LetVar<'ast>],
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// An assignable location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignTarget<'ast> {
    /// A named local or field.
    Var(Ident<'ast>),
    /// An element of an array target.
    Index(&'ast IndexTarget<'ast>),
    /// The anonymous `_` slot: the value is popped.
    Anonymous(Span),
}

impl AssignTarget<'_> {
    /// Get the span of this target.
    pub fn span(&self) -> Span {
        match self {
            AssignTarget::Var(ident) => ident.span,
            AssignTarget::Index(t) => t.span,
            AssignTarget::Anonymous(span) => *span,
        }
    }
}

/// An indexed assignment target `a[i]…`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexTarget<'ast> {
    pub base: &'ast AssignTarget<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

/// An assignment: `a = e`, `a[i] = e`, or `(a, b, _) = f()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignStmt<'ast> {
    pub targets: &'ast [AssignTarget<'ast>],
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// One `if`/`else if` arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfBranch<'ast> {
    pub cond: &'ast Expr<'ast>,
    pub body: Block<'ast>,
}

/// An if statement with any number of `else if` arms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    /// The `if` arm followed by any `else if` arms; never empty.
    pub branches: &'ast [IfBranch<'ast>],
    pub else_block: Option<Block<'ast>>,
    pub span: Span,
}

/// A while loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub cond: &'ast Expr<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}

/// A for loop. All three header parts are mandatory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: &'ast Stmt<'ast>,
    pub cond: &'ast Expr<'ast>,
    pub update: &'ast Stmt<'ast>,
    pub body: Block<'ast>,
    pub span: Span,
}

/// A return statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub values: &'ast [Expr<'ast>],
    pub span: Span,
}

/// An `emit Event(args…)` statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitStmt<'ast> {
    pub event: Ident<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

/// An expression statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}
