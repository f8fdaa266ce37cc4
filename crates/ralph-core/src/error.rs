//! Unified error types for the Ralph compiler.
//!
//! Every phase has its own error type, and all of them convert into the
//! top-level [`RalphError`] wrapper:
//!
//! ```text
//! RalphError
//! ├── LexError      - tokenization errors
//! ├── ParseError    - syntax errors (with ParseErrorKind)
//! └── CompileError  - semantic errors (with DiagnosticKind)
//! ```
//!
//! Semantic errors are fatal for the whole compilation unit; the first one
//! aborts compilation. Non-fatal findings are reported as
//! [`Warning`](crate::Warning)s instead and never become errors.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer errors
// ============================================================================

/// Errors that occur during lexical analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    /// A quoted string was not terminated before end of line or file.
    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },

    /// A `#…` byte-string literal was not valid hex.
    #[error("invalid byte string at {span}: {detail}")]
    InvalidByteString { span: Span, detail: String },

    /// An `@…` address literal was not valid base58.
    #[error("invalid address at {span}: {detail}")]
    InvalidAddress { span: Span, detail: String },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
            LexError::InvalidByteString { span, .. } => *span,
            LexError::InvalidAddress { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of file.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// A type was expected.
    ExpectedType,
    /// A statement was expected.
    ExpectedStatement,
    /// A declaration was expected.
    ExpectedDeclaration,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// An annotation was malformed or applied to the wrong target.
    InvalidAnnotation,
    /// Nesting exceeded the parser's depth limit.
    TooDeep,
    /// General syntax error.
    InvalidSyntax,
}

impl ParseErrorKind {
    /// Human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::InvalidAnnotation => "invalid annotation",
            ParseErrorKind::TooDeep => "nesting too deep",
            ParseErrorKind::InvalidSyntax => "invalid syntax",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message, including the expected-token trace.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "expected identifier" error.
    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    /// Create an "expected expression" error.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }

    /// Format the error with source context for display.
    ///
    /// Renders the relevant source line with a caret pointing at the
    /// error location.
    pub fn display_with_source(&self, source: &str) -> String {
        render_with_source(source, self.span, &format!("{}", self.kind), &self.message)
    }
}

// ============================================================================
// Compile errors
// ============================================================================

/// The kind of a fatal semantic diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Structural errors found after parsing (e.g. missing main statements).
    Syntax,
    /// Type mismatches and invalid operations.
    Type,
    /// Unknown or duplicate names.
    Name,
    /// Assignment to immutable locations, never-assigned `mut` bindings.
    Mutability,
    /// Inheritance graph and signature-compatibility violations.
    Inheritance,
    /// Asset-annotation and braces-syntax violations.
    Assets,
    /// Missing or ill-typed return paths.
    Return,
    /// Violated compiler invariant; always a bug.
    Internal,
}

impl DiagnosticKind {
    /// Human-readable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::Type => "type error",
            DiagnosticKind::Name => "name error",
            DiagnosticKind::Mutability => "mutability error",
            DiagnosticKind::Inheritance => "inheritance error",
            DiagnosticKind::Assets => "asset error",
            DiagnosticKind::Return => "return error",
            DiagnosticKind::Internal => "internal error",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fatal semantic error.
///
/// The message strings are the stable, user-facing contract of the
/// compiler; tests match on them verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CompileError {
    /// The category of this error.
    pub kind: DiagnosticKind,
    /// The formatted error message.
    pub message: String,
    /// The source location, when one is available.
    pub span: Option<Span>,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source span to this error.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// A structural error found after parsing.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Syntax, message)
    }

    /// A type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Type, message)
    }

    /// A name resolution error.
    pub fn name(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Name, message)
    }

    /// A mutability error.
    pub fn mutability(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Mutability, message)
    }

    /// An inheritance error.
    pub fn inheritance(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Inheritance, message)
    }

    /// An asset-usage error.
    pub fn assets(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Assets, message)
    }

    /// A return-path error.
    pub fn return_error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Return, message)
    }

    /// A violated internal invariant.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Internal, message)
    }

    /// Format the error with source context, when a span is attached.
    pub fn display_with_source(&self, source: &str) -> String {
        match self.span {
            Some(span) => render_with_source(source, span, self.kind.as_str(), &self.message),
            None => format!("{}: {}\n", self.kind, self.message),
        }
    }
}

/// Render an error header, source line, and caret pointer.
fn render_with_source(source: &str, span: Span, kind: &str, message: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Error at {}:{}: {}\n", span.line, span.col, kind));
    if !message.is_empty() {
        output.push_str(&format!("  {}\n", message));
    }
    if let Some(line_text) = source.lines().nth(span.line as usize - 1) {
        output.push_str("  |\n");
        output.push_str(&format!("{:>3} | {}\n", span.line, line_text));
        let indent = " ".repeat(span.col.saturating_sub(1) as usize);
        let pointer = if span.len <= 1 {
            "^".to_string()
        } else {
            "^".to_string() + &"~".repeat((span.len - 1) as usize)
        };
        output.push_str(&format!("  | {}{}\n", indent, pointer));
    }
    output
}

// ============================================================================
// Unified error type
// ============================================================================

/// The unified error type for the whole compilation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RalphError {
    /// A lexer error.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A parse error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A semantic error.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl RalphError {
    /// Check if this is a lexer error.
    pub fn is_lex(&self) -> bool {
        matches!(self, RalphError::Lex(_))
    }

    /// Check if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, RalphError::Parse(_))
    }

    /// Check if this is a semantic error.
    pub fn is_compile(&self) -> bool {
        matches!(self, RalphError::Compile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::UnexpectedChar {
            ch: '$',
            span: Span::new(1, 5, 1),
        };
        assert_eq!(format!("{err}"), "unexpected character '$' at 1:5");
        assert_eq!(err.span(), Span::new(1, 5, 1));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::expected_token(Span::new(1, 10, 1), "'}'", "end of file");
        assert_eq!(
            format!("{err}"),
            "expected token at 1:10: expected '}', found end of file"
        );
    }

    #[test]
    fn parse_error_with_source() {
        let source = "Contract Foo( {";
        let err = ParseError::expected_identifier(Span::new(1, 15, 1), "'{'");
        let display = err.display_with_source(source);
        assert!(display.contains("1:15"));
        assert!(display.contains("Contract Foo( {"));
        assert!(display.contains('^'));
    }

    #[test]
    fn compile_error_kinds() {
        let err = CompileError::type_error("Invalid return types: List(U256)");
        assert_eq!(err.kind, DiagnosticKind::Type);
        assert_eq!(format!("{err}"), "Invalid return types: List(U256)");
        assert!(err.span.is_none());

        let err = err.with_span(Span::new(2, 3, 4));
        assert_eq!(err.span, Some(Span::new(2, 3, 4)));
    }

    #[test]
    fn compile_error_caret_width() {
        let source = "let abc = 1";
        let err = CompileError::name("unknown variable").with_span(Span::new(1, 5, 3));
        let display = err.display_with_source(source);
        assert!(display.contains("^~~"));
    }

    #[test]
    fn ralph_error_conversions() {
        let err: RalphError = LexError::UnterminatedString {
            span: Span::new(1, 1, 0),
        }
        .into();
        assert!(err.is_lex());

        let err: RalphError = CompileError::internal("bad state").into();
        assert!(err.is_compile());
        assert_eq!(format!("{err}"), "bad state");
    }
}
