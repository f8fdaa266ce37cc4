//! Expression parsing using Pratt precedence climbing.

use alloy_primitives::Sign;

use super::parser::Parser;
use crate::ast::expr::*;
use crate::ast::ops::{BinaryOp, UnaryOp};
use crate::ast::Ident;
use crate::lexer::{Token, TokenKind};
use ralph_core::{ParseError, ParseErrorKind, Span, I256, U256};

/// Binding power of prefix operators (`!`).
const UNARY_BP: u8 = 21;
/// Binding power of postfix index `[…]`.
const INDEX_BP: u8 = 27;

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse an expression with a minimum binding power.
    ///
    /// Core of the Pratt parser: only operators with sufficient binding
    /// power are consumed, which encodes precedence and associativity.
    pub(crate) fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let start = self.peek().span;
        self.descend(start)?;
        let mut lhs = self.parse_prefix()?;

        loop {
            // Postfix index access
            if self.check(TokenKind::LBracket) {
                if INDEX_BP < min_bp {
                    break;
                }
                self.advance();
                let index = self.parse_expr(0)?;
                let end = self.expect(TokenKind::RBracket)?.span;
                let span = lhs.span().merge(end);
                lhs = self.alloc(Expr::Index(self.alloc(IndexExpr {
                    base: lhs,
                    index,
                    span,
                })));
                continue;
            }

            // Infix binary operators
            if let Some(op) = BinaryOp::from_token(self.peek_kind()) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                let span = lhs.span().merge(rhs.span());
                lhs = self.alloc(Expr::Binary(self.alloc(BinaryExpr {
                    left: lhs,
                    op,
                    right: rhs,
                    span,
                })));
                continue;
            }

            break;
        }

        self.ascend();
        Ok(lhs)
    }

    /// Parse a prefix expression: literals, variables, calls, arrays,
    /// parenthesized and if/else expressions.
    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let kind = self.int_literal(token, false)?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind,
                    span: token.span,
                })))
            }

            // Negative integer literal; Ralph has no general unary minus.
            TokenKind::Minus => {
                let minus_span = self.advance().span;
                let lit = self.expect(TokenKind::IntLiteral)?;
                let kind = self.int_literal(lit, true)?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind,
                    span: minus_span.merge(lit.span),
                })))
            }

            TokenKind::BytesLiteral => {
                self.advance();
                let bytes = self.decode_bytes_literal(token)?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::ByteVec(bytes),
                    span: token.span,
                })))
            }

            TokenKind::AddressLiteral => {
                self.advance();
                let bytes = self.decode_address_literal(token)?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Address(bytes),
                    span: token.span,
                })))
            }

            TokenKind::StringLiteral => {
                self.advance();
                let contents = &token.lexeme[1..token.lexeme.len() - 1];
                let bytes = self.arena.alloc_slice_copy(contents.as_bytes());
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::String(bytes),
                    span: token.span,
                })))
            }

            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Bool(token.kind == TokenKind::True),
                    span: token.span,
                })))
            }

            TokenKind::Alph => {
                self.advance();
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind: LiteralKind::Alph,
                    span: token.span,
                })))
            }

            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_expr(UNARY_BP)?;
                let span = token.span.merge(operand.span());
                Ok(self.alloc(Expr::Unary(self.alloc(UnaryExpr {
                    op: UnaryOp::Not,
                    operand,
                    span,
                }))))
            }

            TokenKind::LParen => {
                let start = self.advance().span;
                let expr = self.parse_expr(0)?;
                let end = self.expect(TokenKind::RParen)?.span;
                Ok(self.alloc(Expr::Paren(self.alloc(ParenExpr {
                    expr,
                    span: start.merge(end),
                }))))
            }

            TokenKind::LBracket => self.parse_array_literal(),

            TokenKind::If => self.parse_if_expr(),

            TokenKind::Builtin => {
                let tok = self.advance();
                let name = self.builtin_ident(tok);
                self.parse_call(CallTarget::Builtin(name), name.span)
            }

            TokenKind::Identifier => self.parse_ident_expr(),

            TokenKind::Error => Err(self.lex_failure()),

            _ => Err(ParseError::expected_expression(
                token.span,
                self.found_description(),
            )),
        }
    }

    /// Parse an expression starting with an identifier: a variable,
    /// an enum access, or one of the call forms.
    fn parse_ident_expr(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let base = self.expect_identifier()?;

        if self.eat(TokenKind::Dot) {
            // `Type.encodeFields!(…)` static call
            if self.check(TokenKind::Builtin) {
                let tok = self.advance();
                let func = self.builtin_ident(tok);
                return self.parse_call(CallTarget::Static { ty: base, func }, base.span);
            }
            let field = self.expect_identifier()?;
            // `obj.f(…)` or `obj.f{…}(…)` external call
            if self.check(TokenKind::LParen) || self.check(TokenKind::LBrace) {
                return self.parse_call(
                    CallTarget::Method {
                        receiver: base,
                        func: field,
                    },
                    base.span,
                );
            }
            // `Enum.Variant`
            let span = base.span.merge(field.span);
            return Ok(self.alloc(Expr::Select(self.alloc(SelectExpr { base, field, span }))));
        }

        // `f(…)` or `f{…}(…)` local call
        if self.check(TokenKind::LParen) || self.check(TokenKind::LBrace) {
            return self.parse_call(CallTarget::Local(base), base.span);
        }

        Ok(self.alloc(Expr::Var(base)))
    }

    /// Parse the approvals and argument list of a call.
    fn parse_call(
        &mut self,
        target: CallTarget<'ast>,
        start: Span,
    ) -> Result<&'ast Expr<'ast>, ParseError> {
        let approvals = if self.check(TokenKind::LBrace) {
            self.parse_approvals()?
        } else {
            self.alloc_slice(&[])
        };

        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(*self.parse_expr(0)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen)?.span;

        Ok(self.alloc(Expr::Call(self.alloc(CallExpr {
            target,
            approvals,
            args: self.alloc_slice(&args),
            span: start.merge(end),
        }))))
    }

    /// Parse braces-approval clauses: `{ addr -> tokenId: amount, … }`.
    fn parse_approvals(&mut self) -> Result<&'ast [ApprovalClause<'ast>], ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        loop {
            let address = self.parse_expr(0)?;
            self.expect(TokenKind::Arrow)?;
            let token = self.parse_expr(0)?;
            self.expect(TokenKind::Colon)?;
            let amount = self.parse_expr(0)?;
            clauses.push(ApprovalClause {
                address,
                token,
                amount,
                span: address.span().merge(amount.span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.alloc_slice(&clauses))
    }

    /// Parse `[a, b, c]` or `[v; n]`.
    fn parse_array_literal(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let start = self.expect(TokenKind::LBracket)?.span;
        let first = self.parse_expr(0)?;

        if self.eat(TokenKind::Semicolon) {
            let size = self.parse_expr(0)?;
            let end = self.expect(TokenKind::RBracket)?.span;
            return Ok(self.alloc(Expr::ArrayFill(self.alloc(ArrayFillExpr {
                value: first,
                size,
                span: start.merge(end),
            }))));
        }

        let mut elems = vec![*first];
        while self.eat(TokenKind::Comma) {
            elems.push(*self.parse_expr(0)?);
        }
        let end = self.expect(TokenKind::RBracket)?.span;
        Ok(self.alloc(Expr::ArrayLit(self.alloc(ArrayLitExpr {
            elems: self.alloc_slice(&elems),
            span: start.merge(end),
        }))))
    }

    /// Parse an if/else expression: `if (cond) a else b`, with
    /// `else if` chaining.
    fn parse_if_expr(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let start = self.expect(TokenKind::If)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::RParen)?;
        let then_expr = self.parse_expr(0)?;
        self.expect(TokenKind::Else)?;
        let else_expr = if self.check(TokenKind::If) {
            self.parse_if_expr()?
        } else {
            self.parse_expr(0)?
        };
        let span = start.merge(else_expr.span());
        Ok(self.alloc(Expr::IfElse(self.alloc(IfElseExpr {
            cond,
            then_expr,
            else_expr,
            span,
        }))))
    }

    /// An [`Ident`] for a builtin token, with the trailing `!` stripped.
    pub(crate) fn builtin_ident(&self, token: Token<'ast>) -> Ident<'ast> {
        Ident {
            name: &token.lexeme[..token.lexeme.len() - 1],
            span: token.span,
        }
    }

    /// Parse an integer literal lexeme into a value.
    pub(crate) fn int_literal(
        &self,
        token: Token<'ast>,
        negative: bool,
    ) -> Result<LiteralKind<'ast>, ParseError> {
        let raw: String = token.lexeme.chars().filter(|c| *c != '_').collect();

        if let Some(digits) = raw.strip_suffix('i') {
            let abs = U256::from_str_radix(digits, 10).map_err(|e| {
                ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    token.span,
                    format!("invalid I256 literal: {e}"),
                )
            })?;
            let sign = if negative {
                Sign::Negative
            } else {
                Sign::Positive
            };
            let value = I256::checked_from_sign_and_abs(sign, abs).ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::InvalidSyntax,
                    token.span,
                    "I256 literal out of range",
                )
            })?;
            return Ok(LiteralKind::I256(value));
        }

        if negative {
            return Err(ParseError::new(
                ParseErrorKind::InvalidSyntax,
                token.span,
                "negative literal requires the 'i' suffix",
            ));
        }
        let digits = raw.strip_suffix('u').unwrap_or(&raw);
        let value = U256::from_str_radix(digits, 10).map_err(|e| {
            ParseError::new(
                ParseErrorKind::InvalidSyntax,
                token.span,
                format!("invalid U256 literal: {e}"),
            )
        })?;
        Ok(LiteralKind::U256(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Item, Parser, Stmt};
    use bumpalo::Bump;

    fn first_return_expr<'ast>(
        arena: &'ast bumpalo::Bump,
        body: &str,
    ) -> &'ast Expr<'ast> {
        let source = format!(
            "Contract Foo() {{ pub fn f(a: U256, b: U256, c: Bool) -> U256 {{ return {body} }} }}"
        );
        let text = arena.alloc_str(&source);
        let unit = Parser::parse(text, arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        let body = contract.funcs[0].body.unwrap();
        let Stmt::Return(ret) = body.stmts[0] else {
            panic!("expected return");
        };
        &ret.values[0]
    }

    #[test]
    fn precedence_mul_over_add() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "a + b * 2");
        let Expr::Binary(outer) = expr else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinaryOp::Add);
        let Expr::Binary(rhs) = outer.right else {
            panic!("expected nested binary");
        };
        assert_eq!(rhs.op, BinaryOp::Mul);
    }

    #[test]
    fn exp_right_assoc() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "a ** b ** 2");
        let Expr::Binary(outer) = expr else {
            panic!("expected binary");
        };
        assert_eq!(outer.op, BinaryOp::Exp);
        assert!(matches!(outer.right, Expr::Binary(_)));
        assert!(matches!(outer.left, Expr::Var(_)));
    }

    #[test]
    fn logical_short_circuit_parse() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "if (c && a == b) 1 else 0");
        assert!(matches!(expr, Expr::IfElse(_)));
    }

    #[test]
    fn index_chain() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "a[0][1]");
        let Expr::Index(outer) = expr else {
            panic!("expected index");
        };
        assert!(matches!(outer.base, Expr::Index(_)));
    }

    #[test]
    fn array_fill() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "[0; 4][b]");
        let Expr::Index(index) = expr else {
            panic!("expected index");
        };
        assert!(matches!(index.base, Expr::ArrayFill(_)));
    }

    #[test]
    fn negative_literal() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "-5i");
        let Expr::Literal(lit) = expr else {
            panic!("expected literal");
        };
        assert!(matches!(lit.kind, LiteralKind::I256(_)));
    }

    #[test]
    fn braces_call_parses() {
        let arena = Bump::new();
        let source = r#"
            TxScript Main(swapper: Swap) {
                swapper.swap{callerAddress!() -> ALPH: 100}(100)
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::TxScript(script) = unit.items()[0] else {
            panic!("expected script");
        };
        let Stmt::Expr(stmt) = script.main[0] else {
            panic!("expected expr stmt");
        };
        let Expr::Call(call) = stmt.expr else {
            panic!("expected call");
        };
        assert_eq!(call.approvals.len(), 1);
        assert!(matches!(call.target, CallTarget::Method { .. }));
        assert!(matches!(
            *call.approvals[0].token,
            Expr::Literal(LiteralExpr {
                kind: LiteralKind::Alph,
                ..
            })
        ));
    }

    #[test]
    fn static_encode_call() {
        let arena = Bump::new();
        let expr = first_return_expr(&arena, "if (c) 1 else 0");
        assert!(matches!(expr, Expr::IfElse(_)));

        let arena2 = Bump::new();
        let source = r#"
            Contract Foo(x: U256) {
                pub fn f() -> ByteVec {
                    return Foo.encodeImmFields!(1)
                }
            }
        "#;
        let unit = Parser::parse(source, &arena2).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        let body = contract.funcs[0].body.unwrap();
        let Stmt::Return(ret) = body.stmts[0] else {
            panic!("expected return");
        };
        let Expr::Call(call) = &ret.values[0] else {
            panic!("expected call");
        };
        let CallTarget::Static { ty, func } = call.target else {
            panic!("expected static call");
        };
        assert_eq!(ty.name, "Foo");
        assert_eq!(func.name, "encodeImmFields");
    }
}
