//! Lexer for trigger conditions.

use crate::error::{Result, RuleError};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Tok {
    Number(f64),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

pub(super) struct Lexer<'src> {
    source: &'src str,
    chars: Vec<char>,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub(super) fn new(source: &'src str) -> Self {
        Self { source, chars: source.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, msg: impl std::fmt::Display) -> RuleError {
        RuleError::Parse(format!("{msg} at column {} in condition `{}`", self.pos + 1, self.source))
    }

    pub(super) fn tokenize(mut self) -> Result<Vec<Tok>> {
        let mut out = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
                continue;
            }
            let tok = match c {
                '(' => self.single(Tok::LParen),
                ')' => self.single(Tok::RParen),
                '+' => self.single(Tok::Plus),
                '-' => self.single(Tok::Minus),
                '*' => self.single(Tok::Star),
                '/' => self.single(Tok::Slash),
                '%' => self.single(Tok::Percent),
                '<' => self.with_eq(Tok::Lt, Tok::Le),
                '>' => self.with_eq(Tok::Gt, Tok::Ge),
                '=' if self.peek_next() == Some('=') => {
                    self.pos += 2;
                    Tok::EqEq
                }
                '!' if self.peek_next() == Some('=') => {
                    self.pos += 2;
                    Tok::Ne
                }
                '!' => self.single(Tok::Not),
                '&' if self.peek_next() == Some('&') => {
                    self.pos += 2;
                    Tok::And
                }
                '|' if self.peek_next() == Some('|') => {
                    self.pos += 2;
                    Tok::Or
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit())) => {
                    self.scan_number()?
                }
                c if c.is_alphabetic() || c == '_' => self.scan_word(),
                other => return Err(self.error(format!("unexpected character `{other}`"))),
            };
            out.push(tok);
        }
        Ok(out)
    }

    fn single(&mut self, tok: Tok) -> Tok {
        self.pos += 1;
        tok
    }

    fn with_eq(&mut self, plain: Tok, with_eq: Tok) -> Tok {
        self.pos += 1;
        if self.peek() == Some('=') {
            self.pos += 1;
            with_eq
        } else {
            plain
        }
    }

    fn scan_number(&mut self) -> Result<Tok> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.advance();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Tok::Number)
            .map_err(|_| self.error(format!("invalid number `{text}`")))
    }

    /// Identifiers, keywords and dotted measurement names.
    fn scan_word(&mut self) -> Tok {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        while self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.advance();
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "and" => Tok::And,
            "or" => Tok::Or,
            "not" => Tok::Not,
            "True" | "true" => Tok::True,
            "False" | "false" => Tok::False,
            _ => Tok::Ident(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Tok> {
        Lexer::new(s).tokenize().unwrap()
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            lex("a <= 1 != b >= 2 == c < d > e"),
            vec![
                Tok::Ident("a".into()),
                Tok::Le,
                Tok::Number(1.0),
                Tok::Ne,
                Tok::Ident("b".into()),
                Tok::Ge,
                Tok::Number(2.0),
                Tok::EqEq,
                Tok::Ident("c".into()),
                Tok::Lt,
                Tok::Ident("d".into()),
                Tok::Gt,
                Tok::Ident("e".into()),
            ]
        );
    }

    #[test]
    fn dotted_names_and_keywords() {
        assert_eq!(
            lex("env.system.time > 10 and not False"),
            vec![
                Tok::Ident("env.system.time".into()),
                Tok::Gt,
                Tok::Number(10.0),
                Tok::And,
                Tok::Not,
                Tok::False,
            ]
        );
    }

    #[test]
    fn rejects_assignment_and_calls() {
        assert!(Lexer::new("a = 1").tokenize().is_err());
        assert!(Lexer::new("__import__('os')").tokenize().is_err());
    }
}
