//! Recursive-descent parser producing a condition [`Expr`].

use edgekb_core::sanitize_name;

use super::lexer::Tok;
use crate::error::{Result, RuleError};
use crate::syntax::MAX_NESTING;

/// A sub-expression with the height of its tree.
type Parsed = (Expr, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Condition syntax tree. Identifiers are stored sanitized.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Bool(bool),
    Ident(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
}

pub(super) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
    /// Open parentheses and prefix operators on the current path.
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(source: &'a str, tokens: Vec<Tok>) -> Self {
        Self { source, tokens, pos: 0, nesting: 0 }
    }

    pub(super) fn parse(mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(RuleError::Parse("empty condition".into()));
        }
        let (expr, _) = self.or()?;
        if self.pos < self.tokens.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    fn error(&self, msg: &str) -> RuleError {
        match self.tokens.get(self.pos) {
            Some(tok) => RuleError::Parse(format!("{msg} near {tok:?} in condition `{}`", self.source)),
            None => RuleError::Parse(format!("{msg} at end of condition `{}`", self.source)),
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Run `inner` one nesting level deeper, refusing past [`MAX_NESTING`].
    fn nested(&mut self, inner: fn(&mut Self) -> Result<Parsed>) -> Result<Parsed> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.nesting += 1;
        let parsed = inner(self);
        self.nesting -= 1;
        parsed
    }

    /// Height of a new node over children of height `below`.
    fn height(&self, below: usize) -> Result<usize> {
        if below >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        Ok(below + 1)
    }

    fn or(&mut self) -> Result<Parsed> {
        let (mut lhs, mut h) = self.and()?;
        while self.eat(&Tok::Or) {
            let (rhs, rh) = self.and()?;
            h = self.height(h.max(rh))?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, h))
    }

    fn and(&mut self) -> Result<Parsed> {
        let (mut lhs, mut h) = self.not()?;
        while self.eat(&Tok::And) {
            let (rhs, rh) = self.not()?;
            h = self.height(h.max(rh))?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, h))
    }

    fn not(&mut self) -> Result<Parsed> {
        if self.eat(&Tok::Not) {
            let (inner, h) = self.nested(Self::not)?;
            return Ok((Expr::Not(Box::new(inner)), self.height(h)?));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Parsed> {
        let (first, mut h) = self.sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => CmpOp::Lt,
                Some(Tok::Le) => CmpOp::Le,
                Some(Tok::Gt) => CmpOp::Gt,
                Some(Tok::Ge) => CmpOp::Ge,
                Some(Tok::EqEq) => CmpOp::Eq,
                Some(Tok::Ne) => CmpOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let (rhs, rh) = self.sum()?;
            h = h.max(rh);
            rest.push((op, rhs));
        }
        if rest.is_empty() {
            Ok((first, h))
        } else {
            Ok((Expr::Compare(Box::new(first), rest), self.height(h)?))
        }
    }

    fn sum(&mut self) -> Result<Parsed> {
        let (mut lhs, mut h) = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => ArithOp::Add,
                Some(Tok::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let (rhs, rh) = self.product()?;
            h = self.height(h.max(rh))?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, h))
    }

    fn product(&mut self) -> Result<Parsed> {
        let (mut lhs, mut h) = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => ArithOp::Mul,
                Some(Tok::Slash) => ArithOp::Div,
                Some(Tok::Percent) => ArithOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let (rhs, rh) = self.unary()?;
            h = self.height(h.max(rh))?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, h))
    }

    fn unary(&mut self) -> Result<Parsed> {
        if self.eat(&Tok::Minus) {
            let (inner, h) = self.nested(Self::unary)?;
            return Ok((Expr::Neg(Box::new(inner)), self.height(h)?));
        }
        if self.eat(&Tok::Plus) {
            return self.nested(Self::unary);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Parsed> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.error("expected a value"));
        };
        let expr = match tok {
            Tok::Number(n) => Expr::Num(n),
            Tok::True => Expr::Bool(true),
            Tok::False => Expr::Bool(false),
            Tok::Ident(name) => Expr::Ident(sanitize_name(&name)),
            Tok::LParen => {
                self.pos += 1;
                let inner = self.nested(Self::or)?;
                if !self.eat(&Tok::RParen) {
                    return Err(self.error("expected `)`"));
                }
                return Ok(inner);
            }
            _ => return Err(self.error("expected a value")),
        };
        self.pos += 1;
        Ok((expr, 0))
    }
}
