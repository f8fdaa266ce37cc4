//! Core parser state and token plumbing.
//!
//! The declaration, statement, expression, and type grammars live in
//! their own modules as `impl Parser` blocks; this module provides the
//! shared machinery: lookahead, expectation errors, arena allocation,
//! annotation parsing, and literal decoding.

use bumpalo::Bump;

use crate::ast::decl::{FuncAnnotations, Item, StdAnnotation};
use crate::ast::{Ident, Source};
use crate::lexer::{Lexer, Token, TokenKind};
use ralph_core::{ParseError, ParseErrorKind, Span};

/// Maximum nesting depth for expressions, statements, and types.
///
/// Pathological input fails cleanly instead of overflowing the stack.
pub(crate) const MAX_DEPTH: u32 = 128;

/// Parser for Ralph source code.
///
/// The `'src` lifetime is the source buffer (needed only while parsing);
/// `'ast` is the arena every AST node and lexeme is allocated in.
pub struct Parser<'src, 'ast> {
    lexer: Lexer<'src, 'ast>,
    pub(crate) arena: &'ast Bump,
    current: Token<'ast>,
    depth: u32,
}

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse a source unit into an arena-allocated [`Source`].
    pub fn parse(source: &'src str, arena: &'ast Bump) -> Result<Source<'ast>, ParseError> {
        let mut lexer = Lexer::new(source, arena);
        let current = lexer.next_token();
        let mut parser = Parser {
            lexer,
            arena,
            current,
            depth: 0,
        };
        if parser.check(TokenKind::Error) {
            return Err(parser.lex_failure());
        }

        let mut items = Vec::new();
        while !parser.check(TokenKind::Eof) {
            items.push(parser.parse_item()?);
        }
        let span = items.first().map(Item::span).unwrap_or_default();
        Ok(Source::new(parser.alloc_slice(&items), span))
    }

    // =========================================
    // Token plumbing
    // =========================================

    /// The token about to be consumed.
    #[inline]
    pub(crate) fn peek(&self) -> Token<'ast> {
        self.current
    }

    /// The kind of the token about to be consumed.
    #[inline]
    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.current.kind
    }

    /// Peek n tokens ahead (0 = current).
    pub(crate) fn peek_nth(&mut self, n: usize) -> Token<'ast> {
        if n == 0 {
            self.current
        } else {
            self.lexer.peek_nth(n - 1)
        }
    }

    /// Consume the current token and return it.
    pub(crate) fn advance(&mut self) -> Token<'ast> {
        let token = self.current;
        self.current = self.lexer.next_token();
        token
    }

    /// Whether the current token has the given kind.
    #[inline]
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Consume the current token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail with an
    /// expected-token error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        if self.check(TokenKind::Error) {
            return Err(self.lex_failure());
        }
        Err(ParseError::expected_token(
            self.current.span,
            kind.description(),
            self.found_description(),
        ))
    }

    /// Consume an identifier token into an [`Ident`].
    pub(crate) fn expect_identifier(&mut self) -> Result<Ident<'ast>, ParseError> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            return Ok(Ident {
                name: token.lexeme,
                span: token.span,
            });
        }
        Err(ParseError::expected_identifier(
            self.current.span,
            self.found_description(),
        ))
    }

    /// Description of the current token for error messages.
    pub(crate) fn found_description(&self) -> &'ast str {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::Builtin => {
                self.arena.alloc_str(&format!("'{}'", self.current.lexeme))
            }
            kind => kind.description(),
        }
    }

    /// Convert pending lexer errors into a parse error.
    pub(crate) fn lex_failure(&mut self) -> ParseError {
        match self.lexer.take_errors().into_iter().next() {
            Some(err) => {
                ParseError::new(ParseErrorKind::InvalidSyntax, err.span(), format!("{err}"))
            }
            None => ParseError::new(
                ParseErrorKind::InvalidSyntax,
                self.current.span,
                "invalid token",
            ),
        }
    }

    // =========================================
    // Depth limiting
    // =========================================

    /// Enter a nested construct; fails past [`MAX_DEPTH`].
    pub(crate) fn descend(&mut self, span: Span) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                ParseErrorKind::TooDeep,
                span,
                format!("nesting exceeds the limit of {MAX_DEPTH}"),
            ));
        }
        Ok(())
    }

    /// Leave a nested construct.
    #[inline]
    pub(crate) fn ascend(&mut self) {
        self.depth -= 1;
    }

    // =========================================
    // Arena helpers
    // =========================================

    /// Allocate a value in the arena.
    #[inline]
    pub(crate) fn alloc<T>(&self, value: T) -> &'ast T {
        self.arena.alloc(value)
    }

    /// Allocate a slice of `Copy` values in the arena.
    #[inline]
    pub(crate) fn alloc_slice<T: Copy>(&self, values: &[T]) -> &'ast [T] {
        self.arena.alloc_slice_copy(values)
    }

    // =========================================
    // Annotations
    // =========================================

    /// Parse `@using(k = v, …)` after the `@using` token was consumed,
    /// merging into `annotations`.
    pub(crate) fn parse_using_annotation(
        &mut self,
        annotations: &mut FuncAnnotations,
    ) -> Result<(), ParseError> {
        self.expect(TokenKind::LParen)?;
        loop {
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Equal)?;
            let value = self.parse_bool_value()?;
            match key.name {
                "preapprovedAssets" => annotations.preapproved_assets = value,
                "assetsInContract" => annotations.assets_in_contract = value,
                "checkExternalCaller" => annotations.check_external_caller = value,
                "updateFields" => annotations.update_fields = value,
                other => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAnnotation,
                        key.span,
                        format!("unknown @using key \"{other}\""),
                    ));
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(())
    }

    /// Parse `@std(id = #hex)` / `@std(enabled = bool)` after the `@std`
    /// token was consumed.
    pub(crate) fn parse_std_annotation(
        &mut self,
        at_span: Span,
    ) -> Result<StdAnnotation<'ast>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut std = StdAnnotation {
            id: None,
            enabled: None,
            span: at_span,
        };
        loop {
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Equal)?;
            match key.name {
                "id" => {
                    let token = self.expect(TokenKind::BytesLiteral)?;
                    std.id = Some(self.decode_bytes_literal(token)?);
                }
                "enabled" => {
                    std.enabled = Some(self.parse_bool_value()?);
                }
                other => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAnnotation,
                        key.span,
                        format!("unknown @std key \"{other}\""),
                    ));
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(std)
    }

    fn parse_bool_value(&mut self) -> Result<bool, ParseError> {
        if self.eat(TokenKind::True) {
            Ok(true)
        } else if self.eat(TokenKind::False) {
            Ok(false)
        } else {
            Err(ParseError::expected_token(
                self.current.span,
                "'true' or 'false'",
                self.found_description(),
            ))
        }
    }

    // =========================================
    // Literal decoding
    // =========================================

    /// Decode a `#…` byte-string token into arena-allocated bytes.
    pub(crate) fn decode_bytes_literal(
        &self,
        token: Token<'ast>,
    ) -> Result<&'ast [u8], ParseError> {
        let hex = &token.lexeme[1..];
        let bytes = alloy_primitives::hex::decode(hex).map_err(|e| {
            ParseError::new(
                ParseErrorKind::InvalidSyntax,
                token.span,
                format!("invalid byte string: {e}"),
            )
        })?;
        Ok(self.arena.alloc_slice_copy(&bytes))
    }

    /// Decode an `@…` base58 address token into arena-allocated bytes.
    pub(crate) fn decode_address_literal(
        &self,
        token: Token<'ast>,
    ) -> Result<&'ast [u8], ParseError> {
        let body = &token.lexeme[1..];
        let bytes = decode_base58(body).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::InvalidSyntax,
                token.span,
                "invalid base58 address literal",
            )
        })?;
        Ok(self.arena.alloc_slice_copy(&bytes))
    }
}

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Decode a base58 string. No checksum; address semantics are the
/// chain's concern.
fn decode_base58(s: &str) -> Option<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    for ch in s.bytes() {
        let digit = BASE58_ALPHABET.iter().position(|&c| c == ch)? as u32;
        let mut carry = digit;
        for byte in out.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            out.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    for ch in s.bytes() {
        if ch != b'1' {
            break;
        }
        out.push(0);
    }
    out.reverse();
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_decode() {
        // "StV1DL6CwTryKyV" is base58 for "hello world"
        assert_eq!(
            decode_base58("StV1DL6CwTryKyV"),
            Some(b"hello world".to_vec())
        );
        assert_eq!(decode_base58("1"), Some(vec![0]));
        assert_eq!(decode_base58("0"), None); // '0' not in the alphabet
    }

    #[test]
    fn parse_empty_source() {
        let arena = Bump::new();
        let source = Parser::parse("", &arena).unwrap();
        assert!(source.items().is_empty());
    }

    #[test]
    fn depth_limit_trips() {
        let arena = Bump::new();
        let mut nested = String::from("Contract Foo() { fn f() -> U256 { return ");
        for _ in 0..200 {
            nested.push('(');
        }
        nested.push('1');
        for _ in 0..200 {
            nested.push(')');
        }
        nested.push_str(" } }");
        let err = Parser::parse(&nested, &arena).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
    }
}
