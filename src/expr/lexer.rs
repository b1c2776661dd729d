//! 条件表达式的词法分析

use super::ExprError;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Dot,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "数字 {}", n),
            Token::Str(s) => write!(f, "字符串 \"{}\"", s),
            Token::Ident(s) => write!(f, "字段 '{}'", s),
            Token::Eof => f.write_str("表达式结尾"),
            other => write!(f, "{:?}", other),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExprError> {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }

        let Some((pos, c)) = self.chars.next() else {
            return Ok(Token::Eof);
        };

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '.' => Token::Dot,
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '=' => {
                if !self.eat('=') {
                    return Err(ExprError::UnexpectedChar { position: pos, found: c });
                }
                // `===` 与 `==` 同义
                self.eat('=');
                Token::Eq
            }
            '!' => {
                if self.eat('=') {
                    self.eat('=');
                    Token::Ne
                } else {
                    Token::Not
                }
            }
            '&' => {
                if !self.eat('&') {
                    return Err(ExprError::UnexpectedChar { position: pos, found: c });
                }
                Token::And
            }
            '|' => {
                if !self.eat('|') {
                    return Err(ExprError::UnexpectedChar { position: pos, found: c });
                }
                Token::Or
            }
            '"' | '\'' => self.string(pos, c)?,
            c if c.is_ascii_digit() => self.number(pos)?,
            c if c.is_alphabetic() || c == '_' || c == '$' => self.word(pos),
            _ => return Err(ExprError::UnexpectedChar { position: pos, found: c }),
        };
        Ok(token)
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some((_, c)) if *c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, ExprError> {
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(Token::Str(value)),
                c => value.push(c),
            }
        }
        Err(ExprError::UnterminatedString(start))
    }

    fn number(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut end = start + 1;
        let mut seen_dot = false;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = i + 1;
                self.chars.next();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                end = i + 1;
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.input[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::InvalidNumber(text.to_string()))
    }

    fn word(&mut self, start: usize) -> Token {
        let mut end = start + self.input[start..].chars().next().map_or(1, char::len_utf8);
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        match &self.input[start..end] {
            "true" => Token::True,
            "false" => Token::False,
            "null" | "undefined" => Token::Null,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            ident => Token::Ident(ident.to_string()),
        }
    }
}
