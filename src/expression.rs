//! Recursive-descent parser for the expression micro-language.
//!
//! The grammar is call/member only, with no operators and no precedence:
//! an expression is an identifier optionally followed by a call argument
//! list or a left-associative member chain, or a terminal string/number
//! literal. `parse_expression` is the delimiter-aware entry point used on
//! raw binding text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExpressionNode {
    Identifier {
        name: String,
    },
    MemberExpression {
        object: Box<ExpressionNode>,
        property: Box<ExpressionNode>,
    },
    CallExpression {
        callee: Box<ExpressionNode>,
        #[serde(rename = "arguments")]
        args: Vec<ExpressionNode>,
    },
    Literal {
        value: Value,
    },
}

impl ExpressionNode {
    pub fn identifier(name: impl Into<String>) -> Self {
        ExpressionNode::Identifier { name: name.into() }
    }

    /// Length of the member chain under this node. An identifier has depth
    /// zero; `data.a.b` has depth two.
    pub fn member_depth(&self) -> usize {
        match self {
            ExpressionNode::MemberExpression { object, .. } => 1 + object.member_depth(),
            _ => 0,
        }
    }
}

/// Parse binding text. Returns `Ok(None)` when the trimmed text is not
/// wrapped in `{{ }}`; such text is a plain literal, not an expression.
pub fn parse_expression(text: &str) -> Result<Option<ExpressionNode>, ParseError> {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
    else {
        return Ok(None);
    };
    parse_inner_expression(inner).map(Some)
}

/// Parse expression text with the delimiters already stripped.
pub fn parse_inner_expression(inner: &str) -> Result<ExpressionNode, ParseError> {
    let tokens = tokenize(inner)?;
    let (node, pos) = parse_from(&tokens, 0)?;
    let next = &tokens[pos];
    if next.kind != TokenKind::Eof {
        return Err(unexpected_token(next));
    }
    Ok(node)
}

/// Parse one expression starting at `pos`. Returns the node and the index
/// of the first unconsumed token.
fn parse_from(tokens: &[Token], pos: usize) -> Result<(ExpressionNode, usize), ParseError> {
    let token = &tokens[pos];
    match token.kind {
        TokenKind::Str => Ok((
            ExpressionNode::Literal {
                value: Value::String(token.value.clone()),
            },
            pos + 1,
        )),
        TokenKind::Num => {
            let value: Value = serde_json::from_str(&token.value)
                .map_err(|_| ParseError::at("Invalid number literal", token.line, token.column))?;
            Ok((ExpressionNode::Literal { value }, pos + 1))
        }
        TokenKind::Identifier => {
            let head = ExpressionNode::identifier(token.value.clone());
            let mut pos = pos + 1;

            // Call: consumes the whole argument list and is terminal.
            if tokens[pos].kind == TokenKind::LParen {
                pos += 1;
                let mut args = Vec::new();
                loop {
                    match tokens[pos].kind {
                        TokenKind::RParen => {
                            pos += 1;
                            break;
                        }
                        TokenKind::Eof => return Err(unexpected_token(&tokens[pos])),
                        TokenKind::Comma => {
                            pos += 1;
                        }
                        _ => {
                            let (arg, next) = parse_from(tokens, pos)?;
                            args.push(arg);
                            pos = next;
                        }
                    }
                }
                return Ok((
                    ExpressionNode::CallExpression {
                        callee: Box::new(head),
                        args,
                    },
                    pos,
                ));
            }

            // Member chain: left-associative, each dot must be followed by
            // an identifier.
            let mut node = head;
            while tokens[pos].kind == TokenKind::Dot {
                let property = &tokens[pos + 1];
                if property.kind != TokenKind::Identifier {
                    return Err(ParseError::at(
                        format!("Expected identifier after dot, got {}", property.kind),
                        property.line,
                        property.column,
                    ));
                }
                node = ExpressionNode::MemberExpression {
                    object: Box::new(node),
                    property: Box::new(ExpressionNode::identifier(property.value.clone())),
                };
                pos += 2;
            }
            Ok((node, pos))
        }
        _ => Err(unexpected_token(token)),
    }
}

fn unexpected_token(token: &Token) -> ParseError {
    ParseError::at(
        format!("Unexpected token: {}", token.kind),
        token.line,
        token.column,
    )
}
