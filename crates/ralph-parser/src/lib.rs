//! Ralph parser crate.
//!
//! Provides the lexer and parser for Ralph source code:
//! - lexical analysis (tokenization into arena-allocated lexemes)
//! - the arena-allocated AST
//! - a recursive-descent parser with Pratt expression parsing
//!
//! # Example
//!
//! ```
//! use ralph_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     AssetScript Sum {
//!         pub fn add(a: U256, b: U256) -> (U256) {
//!             return a + b
//!         }
//!     }
//! "#;
//!
//! let unit = Parser::parse(source, &arena).unwrap();
//! assert_eq!(unit.items().len(), 1);
//! ```

pub mod ast;
pub mod lexer;

pub use ast::{Parser, Source};
pub use lexer::{Lexer, Token, TokenKind};
