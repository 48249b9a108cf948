//! Parser for topology files.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{PoeError, Result};
use crate::topology::NodeType;

/// Parser for topology files.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire topology description.
    pub fn parse(&mut self) -> Result<TopologyAst> {
        let mut ast = TopologyAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let node = self.parse_node()?;
                    ast.nodes.push(node);
                }
                _ => {
                    return Err(PoeError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            // Every statement ends the line
            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(PoeError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(PoeError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text)
            .ok_or_else(|| PoeError::parse(tok.line, format!("invalid number: {}", tok.text)))
    }

    fn parse_directive(&mut self, ast: &mut TopologyAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".config" => {
                let key = self.expect(TokenKind::Identifier)?.text;
                let value = self.expect_number()?;
                ast.config.push(ConfigDef { key, value, line });
            }
            ".poe" => {
                let node = self.expect(TokenKind::Identifier)?.text;
                let mut powers = Vec::new();
                while self.current.kind == TokenKind::Number {
                    powers.push(self.expect_number()?);
                }
                if powers.is_empty() {
                    return Err(PoeError::parse(line, ".poe needs at least one power value"));
                }
                ast.ports.push(PortDef { node, powers, line });
            }
            _ => {
                return Err(PoeError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn parse_node(&mut self) -> Result<NodeDef> {
        let type_tok = self.expect(TokenKind::Identifier)?;
        let line = type_tok.line;
        let node_type =
            NodeType::from_str(&type_tok.text).ok_or_else(|| PoeError::UnknownNodeType {
                node_type: type_tok.text.clone(),
                line,
            })?;

        let name = self.expect(TokenKind::Identifier)?.text;

        let mut parent = None;
        let mut params = HashMap::new();

        // Identifiers are either the parent (once, first) or `key=value`
        while self.current.kind == TokenKind::Identifier {
            let word = self.current.text.clone();
            self.advance()?;

            if self.current.kind == TokenKind::Equals {
                self.advance()?;
                let value = self.expect_number()?;
                params.insert(word.to_lowercase(), value);
            } else if parent.is_none() && params.is_empty() {
                parent = Some(word);
            } else {
                return Err(PoeError::parse(
                    line,
                    format!("expected key=value after node '{}', got '{}'", name, word),
                ));
            }
        }

        Ok(NodeDef {
            node_type,
            name,
            parent,
            params,
            line,
        })
    }
}
