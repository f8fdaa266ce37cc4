//! Top-level declaration parsing.

use super::parser::Parser;
use crate::ast::decl::*;
use crate::ast::expr::LiteralExpr;
use crate::lexer::TokenKind;
use ralph_core::{ParseError, ParseErrorKind, Span};

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse one top-level declaration, including its leading
    /// annotations.
    pub(crate) fn parse_item(&mut self) -> Result<Item<'ast>, ParseError> {
        let mut std_ann: Option<StdAnnotation<'ast>> = None;
        let mut using = FuncAnnotations::default();
        let mut has_using = false;

        loop {
            match self.peek_kind() {
                TokenKind::AtStd => {
                    let span = self.advance().span;
                    std_ann = Some(self.parse_std_annotation(span)?);
                }
                TokenKind::AtUsing => {
                    self.advance();
                    self.parse_using_annotation(&mut using)?;
                    has_using = true;
                }
                TokenKind::AtUnused => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAnnotation,
                        self.peek().span,
                        "@unused cannot be applied to a declaration",
                    ));
                }
                _ => break,
            }
        }

        let kw = self.peek();
        match kw.kind {
            TokenKind::Abstract => {
                self.advance();
                self.expect(TokenKind::Contract)?;
                self.forbid_using(has_using, kw.span)?;
                Ok(Item::Contract(self.parse_contract(true, std_ann, kw.span)?))
            }
            TokenKind::Contract => {
                self.advance();
                self.forbid_using(has_using, kw.span)?;
                Ok(Item::Contract(self.parse_contract(false, std_ann, kw.span)?))
            }
            TokenKind::Interface => {
                self.advance();
                self.forbid_using(has_using, kw.span)?;
                Ok(Item::Interface(self.parse_interface(std_ann, kw.span)?))
            }
            TokenKind::TxScript => {
                self.advance();
                self.forbid_std(&std_ann, kw.span)?;
                Ok(Item::TxScript(self.parse_txscript(using, kw.span)?))
            }
            TokenKind::AssetScript => {
                self.advance();
                self.forbid_using(has_using, kw.span)?;
                self.forbid_std(&std_ann, kw.span)?;
                Ok(Item::AssetScript(self.parse_asset_script(kw.span)?))
            }
            _ => Err(ParseError::new(
                ParseErrorKind::ExpectedDeclaration,
                kw.span,
                format!(
                    "expected 'Contract', 'Abstract', 'Interface', 'TxScript', or 'AssetScript', found {}",
                    self.found_description()
                ),
            )),
        }
    }

    fn forbid_using(&self, has_using: bool, span: Span) -> Result<(), ParseError> {
        if has_using {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAnnotation,
                span,
                "@using is only valid on TxScript declarations and functions",
            ));
        }
        Ok(())
    }

    fn forbid_std(
        &self,
        std_ann: &Option<StdAnnotation<'ast>>,
        span: Span,
    ) -> Result<(), ParseError> {
        if std_ann.is_some() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAnnotation,
                span,
                "@std is only valid on contracts and interfaces",
            ));
        }
        Ok(())
    }

    // =========================================
    // Contract
    // =========================================

    fn parse_contract(
        &mut self,
        is_abstract: bool,
        std: Option<StdAnnotation<'ast>>,
        kw_span: Span,
    ) -> Result<&'ast ContractDecl<'ast>, ParseError> {
        let name = self.expect_identifier()?;
        let fields = self.parse_field_list()?;

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        loop {
            if self.eat(TokenKind::Extends) {
                loop {
                    extends.push(self.parse_extends_clause()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            } else if self.eat(TokenKind::Implements) {
                loop {
                    implements.push(self.expect_identifier()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            } else {
                break;
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut events = Vec::new();
        let mut consts = Vec::new();
        let mut enums = Vec::new();
        let mut funcs = Vec::new();
        let mut pending = FuncAnnotations::default();

        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::AtUsing => {
                    self.advance();
                    self.parse_using_annotation(&mut pending)?;
                }
                TokenKind::Event => events.push(self.parse_event()?),
                TokenKind::Const => consts.push(self.parse_const()?),
                TokenKind::Enum => enums.push(self.parse_enum()?),
                TokenKind::Pub | TokenKind::Fn => {
                    funcs.push(self.parse_function(pending)?);
                    pending = FuncAnnotations::default();
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        self.peek().span,
                        format!(
                            "expected contract member, found {}",
                            self.found_description()
                        ),
                    ));
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;

        Ok(self.alloc(ContractDecl {
            is_abstract,
            std,
            name,
            fields,
            extends: self.alloc_slice(&extends),
            implements: self.alloc_slice(&implements),
            events: self.alloc_slice(&events),
            consts: self.alloc_slice(&consts),
            enums: self.alloc_slice(&enums),
            funcs: self.alloc_slice(&funcs),
            span: kw_span.merge(end),
        }))
    }

    fn parse_extends_clause(&mut self) -> Result<ExtendsClause<'ast>, ParseError> {
        let parent = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.expect_identifier()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(ExtendsClause {
            parent,
            args: self.alloc_slice(&args),
            span: parent.span.merge(end),
        })
    }

    fn parse_field_list(&mut self) -> Result<&'ast [FieldDecl<'ast>], ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RParen) {
            fields.push(self.parse_field()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(self.alloc_slice(&fields))
    }

    fn parse_field(&mut self) -> Result<FieldDecl<'ast>, ParseError> {
        let unused = self.eat(TokenKind::AtUnused);
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(FieldDecl {
            mutable,
            unused,
            name,
            ty,
            span: name.span.merge(ty.span()),
        })
    }

    // =========================================
    // Members
    // =========================================

    fn parse_event(&mut self) -> Result<EventDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Event)?.span;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param_name = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(EventParam {
                    name: param_name,
                    ty,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(EventDecl {
            name,
            params: self.alloc_slice(&params),
            span: start.merge(end),
        })
    }

    fn parse_const(&mut self) -> Result<ConstDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Const)?.span;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Equal)?;
        let value = self.parse_literal()?;
        Ok(ConstDecl {
            name,
            value,
            span: start.merge(value.span),
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Enum)?.span;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let variant_name = self.expect_identifier()?;
            self.expect(TokenKind::Equal)?;
            let value = self.parse_literal()?;
            variants.push(EnumVariant {
                name: variant_name,
                value,
            });
            self.eat(TokenKind::Comma);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(EnumDecl {
            name,
            variants: self.alloc_slice(&variants),
            span: start.merge(end),
        })
    }

    /// Parse a literal for constants and enum variants.
    fn parse_literal(&mut self) -> Result<LiteralExpr<'ast>, ParseError> {
        use crate::ast::expr::LiteralKind;
        let token = self.peek();
        let kind = match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                self.int_literal(token, false)?
            }
            TokenKind::Minus => {
                self.advance();
                let lit = self.expect(TokenKind::IntLiteral)?;
                return Ok(LiteralExpr {
                    kind: self.int_literal(lit, true)?,
                    span: token.span.merge(lit.span),
                });
            }
            TokenKind::BytesLiteral => {
                self.advance();
                LiteralKind::ByteVec(self.decode_bytes_literal(token)?)
            }
            TokenKind::AddressLiteral => {
                self.advance();
                LiteralKind::Address(self.decode_address_literal(token)?)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                LiteralKind::Bool(token.kind == TokenKind::True)
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedExpression,
                    token.span,
                    format!("expected literal, found {}", self.found_description()),
                ));
            }
        };
        Ok(LiteralExpr {
            kind,
            span: token.span,
        })
    }

    /// Parse a function declaration. The body is optional so interface
    /// signatures reuse this path.
    fn parse_function(
        &mut self,
        annotations: FuncAnnotations,
    ) -> Result<FuncDecl<'ast>, ParseError> {
        let is_pub = self.eat(TokenKind::Pub);
        let start = self.expect(TokenKind::Fn)?.span;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let returns = if self.check(TokenKind::Arrow) {
            self.parse_return_types()?
        } else {
            self.alloc_slice(&[])
        };
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = body.map(|b| b.span).unwrap_or(name.span);
        Ok(FuncDecl {
            annotations,
            is_pub,
            name,
            params: self.alloc_slice(&params),
            returns,
            body,
            span: start.merge(end),
        })
    }

    fn parse_param(&mut self) -> Result<ParamDecl<'ast>, ParseError> {
        let unused = self.eat(TokenKind::AtUnused);
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(ParamDecl {
            mutable,
            unused,
            name,
            ty,
            span: name.span.merge(ty.span()),
        })
    }

    fn parse_param_slice(&mut self) -> Result<&'ast [ParamDecl<'ast>], ParseError> {
        let mut params = Vec::new();
        self.expect(TokenKind::LParen)?;
        while !self.check(TokenKind::RParen) {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(self.alloc_slice(&params))
    }

    // =========================================
    // Interface
    // =========================================

    fn parse_interface(
        &mut self,
        std: Option<StdAnnotation<'ast>>,
        kw_span: Span,
    ) -> Result<&'ast InterfaceDecl<'ast>, ParseError> {
        let name = self.expect_identifier()?;
        let mut extends = Vec::new();
        if self.eat(TokenKind::Extends) {
            loop {
                extends.push(self.expect_identifier()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::LBrace)?;
        let mut events = Vec::new();
        let mut funcs = Vec::new();
        let mut pending = FuncAnnotations::default();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::AtUsing => {
                    self.advance();
                    self.parse_using_annotation(&mut pending)?;
                }
                TokenKind::Event => events.push(self.parse_event()?),
                TokenKind::Pub | TokenKind::Fn => {
                    funcs.push(self.parse_function(pending)?);
                    pending = FuncAnnotations::default();
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        self.peek().span,
                        format!(
                            "expected interface member, found {}",
                            self.found_description()
                        ),
                    ));
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(self.alloc(InterfaceDecl {
            std,
            name,
            extends: self.alloc_slice(&extends),
            events: self.alloc_slice(&events),
            funcs: self.alloc_slice(&funcs),
            span: kw_span.merge(end),
        }))
    }

    // =========================================
    // Scripts
    // =========================================

    fn parse_txscript(
        &mut self,
        annotations: FuncAnnotations,
        kw_span: Span,
    ) -> Result<&'ast TxScriptDecl<'ast>, ParseError> {
        let name = self.expect_identifier()?;
        let params = if self.check(TokenKind::LParen) {
            self.parse_param_slice()?
        } else {
            self.alloc_slice(&[])
        };
        self.expect(TokenKind::LBrace)?;
        let mut main = Vec::new();
        let mut funcs = Vec::new();
        let mut pending = FuncAnnotations::default();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::AtUsing => {
                    self.advance();
                    self.parse_using_annotation(&mut pending)?;
                }
                TokenKind::Pub | TokenKind::Fn => {
                    funcs.push(self.parse_function(pending)?);
                    pending = FuncAnnotations::default();
                }
                _ => main.push(self.parse_stmt()?),
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(self.alloc(TxScriptDecl {
            annotations,
            name,
            params,
            main: self.alloc_slice(&main),
            funcs: self.alloc_slice(&funcs),
            span: kw_span.merge(end),
        }))
    }

    fn parse_asset_script(
        &mut self,
        kw_span: Span,
    ) -> Result<&'ast AssetScriptDecl<'ast>, ParseError> {
        let name = self.expect_identifier()?;
        let params = if self.check(TokenKind::LParen) {
            self.parse_param_slice()?
        } else {
            self.alloc_slice(&[])
        };
        self.expect(TokenKind::LBrace)?;
        let mut funcs = Vec::new();
        let mut pending = FuncAnnotations::default();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            match self.peek_kind() {
                TokenKind::AtUsing => {
                    self.advance();
                    self.parse_using_annotation(&mut pending)?;
                }
                TokenKind::Pub | TokenKind::Fn => {
                    funcs.push(self.parse_function(pending)?);
                    pending = FuncAnnotations::default();
                }
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        self.peek().span,
                        format!(
                            "expected function definition, found {}",
                            self.found_description()
                        ),
                    ));
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(self.alloc(AssetScriptDecl {
            name,
            params,
            funcs: self.alloc_slice(&funcs),
            span: kw_span.merge(end),
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Item, Parser};
    use bumpalo::Bump;

    #[test]
    fn parse_contract_with_everything() {
        let arena = Bump::new();
        let source = r#"
            @std(enabled = false)
            Contract Token(
                symbol: ByteVec,
                mut supply: U256,
            ) extends Base(symbol) implements IToken {
                event Mint(to: Address, amount: U256)

                const VERSION = 2
                enum ErrorCodes {
                    Unauthorized = 0
                    Overflow = 1
                }

                @using(updateFields = true, checkExternalCaller = false)
                pub fn mint(to: Address, amount: U256) -> () {
                    supply = supply + amount
                    emit Mint(to, amount)
                }
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        assert!(!contract.is_abstract);
        assert_eq!(contract.std.unwrap().enabled, Some(false));
        assert_eq!(contract.fields.len(), 2);
        assert!(contract.fields[1].mutable);
        assert_eq!(contract.extends.len(), 1);
        assert_eq!(contract.extends[0].args.len(), 1);
        assert_eq!(contract.implements.len(), 1);
        assert_eq!(contract.events.len(), 1);
        assert_eq!(contract.consts.len(), 1);
        assert_eq!(contract.enums[0].variants.len(), 2);
        let mint = &contract.funcs[0];
        assert!(mint.is_pub);
        assert!(mint.annotations.update_fields);
        assert!(!mint.annotations.check_external_caller);
        assert!(mint.returns.is_empty());
    }

    #[test]
    fn parse_abstract_contract() {
        let arena = Bump::new();
        let source = "Abstract Contract Base(x: U256) { pub fn get() -> U256 { return x } }";
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::Contract(contract) = unit.items()[0] else {
            panic!("expected contract");
        };
        assert!(contract.is_abstract);
    }

    #[test]
    fn parse_interface_with_std() {
        let arena = Bump::new();
        let source = r#"
            @std(id = #0001)
            Interface IToken extends IBase {
                @using(preapprovedAssets = true)
                pub fn deposit(amount: U256) -> ()
                pub fn balance() -> U256
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::Interface(iface) = unit.items()[0] else {
            panic!("expected interface");
        };
        assert_eq!(iface.std.unwrap().id, Some(&[0x00, 0x01][..]));
        assert_eq!(iface.extends.len(), 1);
        assert_eq!(iface.funcs.len(), 2);
        assert!(iface.funcs[0].annotations.preapproved_assets);
        assert!(iface.funcs[0].body.is_none());
    }

    #[test]
    fn parse_txscript_with_params() {
        let arena = Bump::new();
        let source = r#"
            @using(preapprovedAssets = true)
            TxScript Main(amount: U256) {
                let result = amount + 1
                assert!(result > 0, 0)
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::TxScript(script) = unit.items()[0] else {
            panic!("expected script");
        };
        assert!(script.annotations.preapproved_assets);
        assert_eq!(script.params.len(), 1);
        assert_eq!(script.main.len(), 2);
        assert!(script.funcs.is_empty());
    }

    #[test]
    fn parse_asset_script() {
        let arena = Bump::new();
        let source = "AssetScript Foo { pub fn bar(a: U256, b: U256) -> (U256) { return a + b } }";
        let unit = Parser::parse(source, &arena).unwrap();
        let Item::AssetScript(script) = unit.items()[0] else {
            panic!("expected asset script");
        };
        assert_eq!(script.funcs.len(), 1);
        assert_eq!(script.funcs[0].returns.len(), 1);
    }

    #[test]
    fn reject_unused_on_declaration() {
        let arena = Bump::new();
        let err = Parser::parse("@unused Contract Foo() {}", &arena).unwrap_err();
        assert!(err.message.contains("@unused"));
    }
}
