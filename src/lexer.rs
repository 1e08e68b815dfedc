//! Tokenizer for the `{{ ... }}` expression micro-language.
//!
//! The grammar is deliberately tiny: identifiers, string and number
//! literals, dots, parens, commas and the delimiter braces. Operators are
//! not tokens; any operator character is an immediate lex failure with its
//! line and column.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    Dot,
    LParen,
    RParen,
    Comma,
    Identifier,
    Str,
    Num,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Dot => "DOT",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Comma => "COMMA",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Str => "STRING",
            TokenKind::Num => "NUMBER",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", line, column));
                return Ok(tokens);
            };

            let token = match c {
                '{' => {
                    self.advance();
                    Token::new(TokenKind::LBrace, "{", line, column)
                }
                '}' => {
                    self.advance();
                    Token::new(TokenKind::RBrace, "}", line, column)
                }
                '.' => {
                    self.advance();
                    Token::new(TokenKind::Dot, ".", line, column)
                }
                '(' => {
                    self.advance();
                    Token::new(TokenKind::LParen, "(", line, column)
                }
                ')' => {
                    self.advance();
                    Token::new(TokenKind::RParen, ")", line, column)
                }
                ',' => {
                    self.advance();
                    Token::new(TokenKind::Comma, ",", line, column)
                }
                '"' | '\'' => self.read_string(c, line, column)?,
                c if c.is_ascii_digit() => self.read_number(line, column),
                c if is_identifier_start(c) => self.read_identifier(line, column),
                other => {
                    return Err(LexError::new(
                        format!("Unexpected character: {}", other),
                        line,
                        column,
                    ))
                }
            };
            tokens.push(token);
        }
    }

    fn read_string(&mut self, quote: char, line: u32, column: u32) -> Result<Token, LexError> {
        self.advance();
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.advance();
            if c == quote {
                return Ok(Token::new(TokenKind::Str, value, line, column));
            }
            if c == '\\' {
                // Escape takes the next character verbatim.
                match self.peek() {
                    Some(escaped) => {
                        self.advance();
                        value.push(escaped);
                    }
                    None => break,
                }
            } else {
                value.push(c);
            }
        }
        Err(LexError::new("Unterminated string", line, column))
    }

    fn read_number(&mut self, line: u32, column: u32) -> Token {
        let mut value = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.advance();
            } else if c == '.' && !seen_dot && self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit())
            {
                // A dot not followed by a digit stays a member-access token.
                seen_dot = true;
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Num, value, line, column)
    }

    fn read_identifier(&mut self, line: u32, column: u32) -> Token {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Identifier, value, line, column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Tokenize expression text. The result always ends with an EOF token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}
