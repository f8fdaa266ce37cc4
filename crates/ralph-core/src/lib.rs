//! Shared leaf crate for the Ralph compiler.
//!
//! Provides the types every phase depends on:
//! - [`Span`]: source locations for diagnostics
//! - the error hierarchy ([`LexError`], [`ParseError`], [`CompileError`],
//!   unified as [`RalphError`])
//! - [`Warning`]: collected non-fatal diagnostics
//! - [`Val`]: compile-time constant values over 256-bit integers

mod error;
mod span;
mod val;
mod warning;

pub use error::{
    CompileError, DiagnosticKind, LexError, ParseError, ParseErrorKind, RalphError,
};
pub use span::Span;
pub use val::{Val, I256, U256};
pub use warning::Warning;
