//! Lexer for Ralph source code.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s using
//! direct dispatch on the first character. All lexemes are copied into the
//! arena, so the source buffer can be dropped after lexing.

use std::collections::VecDeque;

use bumpalo::Bump;

use super::cursor::{is_ident_continue, is_ident_start, Cursor};
use super::token::{lookup_keyword, Token, TokenKind};
use ralph_core::{LexError, Span};

/// Characters allowed in a base58-encoded address literal.
fn is_base58(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

/// Lexer for Ralph source code.
///
/// Provides single-token lookahead via [`peek`](Self::peek) and
/// [`peek_nth`](Self::peek_nth).
pub struct Lexer<'src, 'ast> {
    /// Low-level character cursor.
    cursor: Cursor<'src>,
    /// Arena for token lexemes.
    arena: &'ast Bump,
    /// Lookahead buffer.
    lookahead: VecDeque<Token<'ast>>,
    /// Accumulated errors.
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            lookahead: VecDeque::with_capacity(4),
            errors: Vec::new(),
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    /// Whether any errors occurred so far.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Token<'ast> {
        if let Some(token) = self.lookahead.pop_front() {
            return token;
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Token<'ast> {
        self.peek_nth(0)
    }

    /// Peek at the nth token ahead (0 = next).
    pub fn peek_nth(&mut self, n: usize) -> Token<'ast> {
        while self.lookahead.len() <= n {
            let token = self.scan_token();
            self.lookahead.push_back(token);
        }
        self.lookahead[n]
    }

    // =========================================
    // Internal: token scanning
    // =========================================

    fn scan_token(&mut self) -> Token<'ast> {
        self.skip_whitespace_and_comments();

        if self.cursor.is_eof() {
            let lexeme = self.arena.alloc_str("");
            return Token::new(
                TokenKind::Eof,
                lexeme,
                Span::point(self.cursor.line(), self.cursor.column()),
            );
        }

        let line = self.cursor.line();
        let col = self.cursor.column();
        let start = self.cursor.offset();

        match self.cursor.peek().unwrap_or('\0') {
            '#' => self.scan_bytes(line, col, start),
            '@' => self.scan_at(line, col, start),
            '"' => self.scan_string(line, col, start),
            c if c.is_ascii_digit() => self.scan_number(line, col, start),
            c if is_ident_start(c) => self.scan_identifier(line, col, start),
            _ => self.scan_operator(line, col, start),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.cursor.check(|c| c.is_ascii_whitespace()) {
                self.cursor.advance();
            }
            // Line comment: `//` to end of line
            if self.cursor.peek() == Some('/') && self.cursor.peek_nth(1) == Some('/') {
                while let Some(c) = self.cursor.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.cursor.advance();
                }
                continue;
            }
            break;
        }
    }

    /// Create a token from the start position to the current position.
    fn make_token(&self, kind: TokenKind, line: u32, col: u32, start: u32) -> Token<'ast> {
        let len = self.cursor.offset() - start;
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start));
        Token::new(kind, lexeme, Span::new(line, col, len))
    }

    /// Record an error and produce an error token.
    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        let lexeme = self.arena.alloc_str("");
        Token::new(TokenKind::Error, lexeme, span)
    }

    /// Scan a `#…` byte-string literal.
    fn scan_bytes(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.advance(); // '#'
        let hex = self.cursor.eat_while(|c| c.is_ascii_hexdigit());
        if hex.len() % 2 != 0 {
            let span = Span::new(line, col, self.cursor.offset() - start);
            return self.make_error(LexError::InvalidByteString {
                span,
                detail: "odd number of hex digits".to_string(),
            });
        }
        self.make_token(TokenKind::BytesLiteral, line, col, start)
    }

    /// Scan `@…`: either an annotation keyword or a base58 address literal.
    fn scan_at(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.advance(); // '@'
        let body = self.cursor.eat_while(is_base58);
        let kind = match body {
            "using" => TokenKind::AtUsing,
            "std" => TokenKind::AtStd,
            "unused" => TokenKind::AtUnused,
            "" => {
                let span = Span::new(line, col, self.cursor.offset() - start);
                return self.make_error(LexError::InvalidAddress {
                    span,
                    detail: "empty address literal".to_string(),
                });
            }
            _ => TokenKind::AddressLiteral,
        };
        self.make_token(kind, line, col, start)
    }

    /// Scan a quoted string literal. No escape sequences.
    fn scan_string(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.advance(); // opening '"'
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = Span::new(line, col, self.cursor.offset() - start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('"') => {
                    self.cursor.advance();
                    return self.make_token(TokenKind::StringLiteral, line, col, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Scan a decimal integer literal with optional `_` grouping and
    /// `u`/`i` type suffix.
    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
        if self.cursor.peek() == Some('u') || self.cursor.peek() == Some('i') {
            // Suffix only when not the start of a trailing identifier
            if !self.cursor.peek_nth(1).is_some_and(is_ident_continue) {
                self.cursor.advance();
            }
        }
        if self.cursor.check(is_ident_continue) {
            let bad = self.cursor.eat_while(is_ident_continue);
            let detail = format!("unexpected trailing '{bad}'");
            let span = Span::new(line, col, self.cursor.offset() - start);
            return self.make_error(LexError::InvalidNumber { span, detail });
        }
        self.make_token(TokenKind::IntLiteral, line, col, start)
    }

    /// Scan an identifier, keyword, or builtin name (`ident!`).
    fn scan_identifier(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        let word = self.cursor.eat_while(is_ident_continue);
        if let Some(kind) = lookup_keyword(word) {
            return self.make_token(kind, line, col, start);
        }
        // `foo!` is a builtin call name; `foo !=` is an identifier
        // followed by the inequality operator.
        if self.cursor.peek() == Some('!') && self.cursor.peek_nth(1) != Some('=') {
            self.cursor.advance();
            return self.make_token(TokenKind::Builtin, line, col, start);
        }
        self.make_token(TokenKind::Identifier, line, col, start)
    }

    /// Scan an operator or delimiter.
    fn scan_operator(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        let c = match self.cursor.advance() {
            Some(c) => c,
            None => {
                let lexeme = self.arena.alloc_str("");
                return Token::new(TokenKind::Eof, lexeme, Span::point(line, col));
            }
        };
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => {
                if self.cursor.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.cursor.eat('*') {
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '&' => {
                if self.cursor.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.cursor.peek() == Some('*')
                    && self.cursor.peek_nth(1) == Some('*')
                    && self.cursor.peek_nth(2) == Some('|')
                {
                    self.cursor.advance();
                    self.cursor.advance();
                    self.cursor.advance();
                    TokenKind::ModExp
                } else if self.cursor.eat('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            '<' => {
                if self.cursor.eat('<') {
                    TokenKind::Shl
                } else if self.cursor.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.eat('>') {
                    TokenKind::Shr
                } else if self.cursor.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Equal
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            other => {
                let span = Span::new(line, col, self.cursor.offset() - start);
                return self.make_error(LexError::UnexpectedChar { ch: other, span });
            }
        };
        self.make_token(kind, line, col, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        let mut lexer = Lexer::new(source, &arena);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn lex_keywords_and_idents() {
        assert_eq!(
            kinds("Contract Foo extends Bar"),
            vec![
                TokenKind::Contract,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn lex_builtin_vs_neq() {
        assert_eq!(
            kinds("assert!(a != b)"),
            vec![
                TokenKind::Builtin,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::NotEq,
                TokenKind::Identifier,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("1_000_000 5u 3i", &arena);
        let a = lexer.next_token();
        assert_eq!(a.kind, TokenKind::IntLiteral);
        assert_eq!(a.lexeme, "1_000_000");
        let b = lexer.next_token();
        assert_eq!(b.lexeme, "5u");
        let c = lexer.next_token();
        assert_eq!(c.lexeme, "3i");
    }

    #[test]
    fn lex_bad_number() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("12abc", &arena);
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert!(lexer.has_errors());
    }

    #[test]
    fn lex_bytes_and_address() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("#00ff @1DrDyTr9RpRsQnDnXo2YRiPzPW4ooHX5LLoqXrqfMrpQH", &arena);
        let bytes = lexer.next_token();
        assert_eq!(bytes.kind, TokenKind::BytesLiteral);
        assert_eq!(bytes.lexeme, "#00ff");
        let addr = lexer.next_token();
        assert_eq!(addr.kind, TokenKind::AddressLiteral);
    }

    #[test]
    fn lex_odd_hex_is_error() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("#00f", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
    }

    #[test]
    fn lex_annotations() {
        assert_eq!(
            kinds("@using @std @unused"),
            vec![TokenKind::AtUsing, TokenKind::AtStd, TokenKind::AtUnused]
        );
    }

    #[test]
    fn lex_operators() {
        assert_eq!(
            kinds("a ** b |**| c << 1 -> ()"),
            vec![
                TokenKind::Identifier,
                TokenKind::StarStar,
                TokenKind::Identifier,
                TokenKind::ModExp,
                TokenKind::Identifier,
                TokenKind::Shl,
                TokenKind::IntLiteral,
                TokenKind::Arrow,
                TokenKind::LParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn lex_comments_skipped() {
        assert_eq!(
            kinds("let x // trailing note\nlet y"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Let,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn lex_string() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("\"insufficient output\"", &arena);
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.lexeme, "\"insufficient output\"");
    }

    #[test]
    fn peek_does_not_consume() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("fn main", &arena);
        assert_eq!(lexer.peek().kind, TokenKind::Fn);
        assert_eq!(lexer.peek_nth(1).kind, TokenKind::Identifier);
        assert_eq!(lexer.next_token().kind, TokenKind::Fn);
    }
}
