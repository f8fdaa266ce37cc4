//! Parsing of type expressions.

use super::parser::Parser;
use crate::ast::types::{ArrayTypeExpr, TypeExpr};
use crate::lexer::TokenKind;
use ralph_core::ParseError;

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse a type expression: a named type or `[T; n]`.
    pub(crate) fn parse_type(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        if self.check(TokenKind::LBracket) {
            let start = self.advance().span;
            self.descend(start)?;
            let elem = self.parse_type()?;
            self.expect(TokenKind::Semicolon)?;
            let size = self.parse_expr(0)?;
            let end = self.expect(TokenKind::RBracket)?.span;
            self.ascend();
            return Ok(TypeExpr::Array(self.alloc(ArrayTypeExpr {
                elem,
                size,
                span: start.merge(end),
            })));
        }
        let ident = self.expect_identifier()?;
        Ok(TypeExpr::Named(ident))
    }

    /// Parse the return types of a function signature after the `->`:
    /// `-> T`, `-> (T, U)`, or `-> ()`.
    pub(crate) fn parse_return_types(&mut self) -> Result<&'ast [TypeExpr<'ast>], ParseError> {
        self.expect(TokenKind::Arrow)?;
        if self.eat(TokenKind::LParen) {
            let mut types = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    types.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
            return Ok(self.alloc_slice(&types));
        }
        let ty = self.parse_type()?;
        Ok(self.alloc_slice(&[ty]))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Item, Parser, TypeExpr};
    use bumpalo::Bump;

    #[test]
    fn parse_nested_array_type() {
        let arena = Bump::new();
        let source = "Contract Foo(grid: [[U256; 2]; 3]) { pub fn f() -> () { return } }";
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        let TypeExpr::Array(outer) = contract.fields[0].ty else {
            panic!("expected array type");
        };
        assert!(matches!(outer.elem, TypeExpr::Array(_)));
    }
}
