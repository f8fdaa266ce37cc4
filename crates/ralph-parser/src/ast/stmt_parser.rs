//! Statement parsing.

use super::parser::Parser;
use crate::ast::stmt::*;
use crate::lexer::TokenKind;
use ralph_core::{ParseError, ParseErrorKind};

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse a braced block of statements.
    pub(crate) fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Block {
            stmts: self.alloc_slice(&stmts),
            span: start.merge(end),
        })
    }

    /// Parse a single statement.
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let span = self.peek().span;
        self.descend(span)?;
        let stmt = match self.peek_kind() {
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Emit => self.parse_emit(),
            TokenKind::LParen => self.parse_assignment(),
            TokenKind::Identifier => self.parse_ident_stmt(),
            TokenKind::Builtin => self.parse_expr_stmt(),
            TokenKind::Error => Err(self.lex_failure()),
            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedStatement,
                span,
                format!("found {}", self.found_description()),
            )),
        };
        self.ascend();
        stmt
    }

    /// Parse `let [(]var, …[)] = expr`.
    fn parse_let(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Let)?.span;
        let mut vars = Vec::new();
        if self.eat(TokenKind::LParen) {
            loop {
                vars.push(self.parse_let_var()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        } else {
            vars.push(self.parse_let_var()?);
        }
        self.expect(TokenKind::Equal)?;
        let value = self.parse_expr(0)?;
        let span = start.merge(value.span());
        Ok(Stmt::Let(self.alloc(LetStmt {
            vars: self.alloc_slice(&vars),
            value,
            span,
        })))
    }

    fn parse_let_var(&mut self) -> Result<LetVar<'ast>, ParseError> {
        let unused = self.eat(TokenKind::AtUnused);
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_identifier()?;
        Ok(LetVar {
            mutable,
            unused,
            name,
        })
    }

    /// Parse a statement starting with an identifier: an assignment when
    /// the lookahead shows `=`, `,`, or an index chain; otherwise an
    /// expression statement (a call).
    fn parse_ident_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        match self.peek_nth(1).kind {
            TokenKind::Equal | TokenKind::Comma | TokenKind::LBracket => self.parse_assignment(),
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse `target, … = expr` with optional parentheses around the
    /// target list.
    fn parse_assignment(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.peek().span;
        let mut targets = Vec::new();
        if self.eat(TokenKind::LParen) {
            loop {
                targets.push(self.parse_assign_target()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        } else {
            loop {
                targets.push(self.parse_assign_target()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Equal)?;
        let value = self.parse_expr(0)?;
        let span = start.merge(value.span());
        Ok(Stmt::Assign(self.alloc(AssignStmt {
            targets: self.alloc_slice(&targets),
            value,
            span,
        })))
    }

    fn parse_assign_target(&mut self) -> Result<AssignTarget<'ast>, ParseError> {
        let ident = self.expect_identifier()?;
        if ident.name == "_" {
            return Ok(AssignTarget::Anonymous(ident.span));
        }
        let mut target = AssignTarget::Var(ident);
        while self.eat(TokenKind::LBracket) {
            let index = self.parse_expr(0)?;
            let end = self.expect(TokenKind::RBracket)?.span;
            target = AssignTarget::Index(self.alloc(IndexTarget {
                base: self.alloc(target),
                index,
                span: ident.span.merge(end),
            }));
        }
        Ok(target)
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let expr = self.parse_expr(0)?;
        let span = expr.span();
        Ok(Stmt::Expr(self.alloc(ExprStmt { expr, span })))
    }

    /// Parse an `if` statement with `else if` chaining.
    fn parse_if_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::If)?.span;
        let mut branches = Vec::new();
        let mut else_block = None;
        let mut end = start;
        loop {
            self.expect(TokenKind::LParen)?;
            let cond = self.parse_expr(0)?;
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            end = body.span;
            branches.push(IfBranch { cond, body });

            if self.eat(TokenKind::Else) {
                if self.eat(TokenKind::If) {
                    continue;
                }
                let block = self.parse_block()?;
                end = block.span;
                else_block = Some(block);
            }
            break;
        }
        Ok(Stmt::If(self.alloc(IfStmt {
            branches: self.alloc_slice(&branches),
            else_block,
            span: start.merge(end),
        })))
    }

    fn parse_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::While)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While(self.alloc(WhileStmt {
            cond,
            body,
            span: start.merge(body.span),
        })))
    }

    /// Parse `for (init; cond; update) { body }`. All three header
    /// parts are mandatory.
    fn parse_for(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;
        let init = self.parse_stmt()?;
        self.expect(TokenKind::Semicolon)?;
        let cond = self.parse_expr(0)?;
        self.expect(TokenKind::Semicolon)?;
        let update = self.parse_stmt()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For(self.alloc(ForStmt {
            init: self.alloc(init),
            cond,
            update: self.alloc(update),
            body,
            span: start.merge(body.span),
        })))
    }

    fn parse_return(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Return)?.span;
        let mut values = Vec::new();
        if self.starts_expr() {
            loop {
                values.push(*self.parse_expr(0)?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let span = values.last().map(|v| start.merge(v.span())).unwrap_or(start);
        Ok(Stmt::Return(self.alloc(ReturnStmt {
            values: self.alloc_slice(&values),
            span,
        })))
    }

    fn parse_emit(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Emit)?.span;
        let event = self.expect_identifier()?;
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
        Ok(Stmt::Emit(self.alloc(EmitStmt {
            event,
            args: self.alloc_slice(&args),
            span: start.merge(end),
        })))
    }

    /// Whether the current token can start an expression. Used to
    /// detect bare `return`.
    fn starts_expr(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::IntLiteral
                | TokenKind::BytesLiteral
                | TokenKind::AddressLiteral
                | TokenKind::StringLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Alph
                | TokenKind::Identifier
                | TokenKind::Builtin
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::Bang
                | TokenKind::Minus
                | TokenKind::If
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AssignTarget, Item, Parser, Stmt};
    use bumpalo::Bump;

    fn parse_body<'ast>(arena: &'ast Bump, body: &str) -> &'ast [Stmt<'ast>] {
        let source =
            format!("Contract Foo(mut x: U256) {{ pub fn f(mut a: [U256; 2]) -> () {{ {body} return }} }}");
        let text = arena.alloc_str(&source);
        let unit = Parser::parse(text, arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        contract.funcs[0].body.unwrap().stmts
    }

    #[test]
    fn parse_let_tuple() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "let (p, mut q, _) = f2()");
        let Stmt::Let(stmt) = stmts[0] else {
            panic!("expected let");
        };
        assert_eq!(stmt.vars.len(), 3);
        assert!(stmt.vars[1].mutable);
        assert!(stmt.vars[2].is_anonymous());
    }

    #[test]
    fn parse_index_assignment() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "a[0] = 1");
        let Stmt::Assign(stmt) = stmts[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(stmt.targets[0], AssignTarget::Index(_)));
    }

    #[test]
    fn parse_tuple_assignment() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "(x, _) = f2()");
        let Stmt::Assign(stmt) = stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(stmt.targets.len(), 2);
        assert!(matches!(stmt.targets[1], AssignTarget::Anonymous(_)));
    }

    #[test]
    fn parse_else_if_chain() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "if (true) { x = 1 } else if (false) { x = 2 } else { x = 3 }");
        let Stmt::If(stmt) = stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(stmt.branches.len(), 2);
        assert!(stmt.else_block.is_some());
    }

    #[test]
    fn parse_for_loop() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "for (let mut i = 0; i < 4; i = i + 1) { x = x + i }");
        let Stmt::For(stmt) = stmts[0] else {
            panic!("expected for");
        };
        assert!(matches!(stmt.init, Stmt::Let(_)));
        assert!(matches!(stmt.update, Stmt::Assign(_)));
    }

    #[test]
    fn parse_bare_return() {
        let arena = Bump::new();
        let stmts = parse_body(&arena, "emit Nothing()");
        let Stmt::Return(ret) = stmts[stmts.len() - 1] else {
            panic!("expected return");
        };
        assert!(ret.values.is_empty());
    }
}
