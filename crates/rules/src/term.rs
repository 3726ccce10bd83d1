//! First-order terms: variables, constants and compound `functor(args)`.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, RuleError};
use crate::syntax::{tokenize, Token, TokenKind, MAX_NESTING};

/// An immutable first-order term.
///
/// A bare symbol is a [`Term::Var`] when its first character is a lowercase
/// ASCII letter and a [`Term::Const`] otherwise. Numeric literals are
/// constants holding their canonical text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Var(String),
    Const(String),
    Compound { functor: String, args: Vec<Term> },
}

impl Term {
    /// Build a leaf from a symbol, classifying it as variable or constant.
    pub fn symbol(name: impl Into<String>) -> Self {
        let name = name.into();
        if is_variable_name(&name) {
            Term::Var(name)
        } else {
            Term::Const(name)
        }
    }

    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound { functor: functor.into(), args }
    }

    /// Parse a single term, e.g. `Run(Sampler)` or `P(f(x), B)`.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut cursor = Cursor::new(text, &tokens);
        let term = cursor.term()?;
        cursor.finish()?;
        Ok(term)
    }

    /// True when the term contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Const(_) => true,
            Term::Compound { args, .. } => args.iter().all(Term::is_ground),
        }
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    pub(crate) fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Term::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Term::Const(_) => {}
            Term::Compound { args, .. } => args.iter().for_each(|a| a.collect_variables(out)),
        }
    }

    /// Leaf constants. Functor names are not constants.
    pub fn constants(&self) -> BTreeSet<Term> {
        let mut out = BTreeSet::new();
        self.collect_constants(&mut out);
        out
    }

    pub(crate) fn collect_constants(&self, out: &mut BTreeSet<Term>) {
        match self {
            Term::Var(_) => {}
            Term::Const(_) => {
                out.insert(self.clone());
            }
            Term::Compound { args, .. } => args.iter().for_each(|a| a.collect_constants(out)),
        }
    }

    /// Whether variable `name` occurs anywhere inside this term.
    pub fn occurs(&self, name: &str) -> bool {
        match self {
            Term::Var(v) => v == name,
            Term::Const(_) => false,
            Term::Compound { args, .. } => args.iter().any(|a| a.occurs(name)),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(s) | Term::Const(s) => f.write_str(s),
            Term::Compound { functor, args } => {
                write!(f, "{functor}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

pub(crate) fn is_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}

/// Recursive-descent reader over a token slice.
pub(crate) struct Cursor<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self { source, tokens, pos: 0, depth: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn error(&self, msg: &str) -> RuleError {
        match self.tokens.get(self.pos) {
            Some(tok) => RuleError::Parse(format!(
                "{msg} at column {} in `{}`",
                tok.offset + 1,
                self.source
            )),
            None => RuleError::Parse(format!("{msg} at end of `{}`", self.source)),
        }
    }

    pub(crate) fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    pub(crate) fn term(&mut self) -> Result<Term> {
        let Some(tok) = self.advance() else {
            return Err(self.error("expected a term"));
        };
        match &tok.kind {
            TokenKind::Number(n) => Ok(Term::Const(n.clone())),
            TokenKind::Ident(name) => {
                if !self.eat(&TokenKind::LParen) {
                    return Ok(Term::symbol(name.clone()));
                }
                if self.peek() == Some(&TokenKind::RParen) {
                    return Err(self.error("empty argument list"));
                }
                if self.depth >= MAX_NESTING {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let args = self.arguments();
                self.depth -= 1;
                Ok(Term::compound(name.clone(), args?))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected a term"))
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Term>> {
        let mut args = vec![self.term()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.term()?);
        }
        if !self.eat(&TokenKind::RParen) {
            return Err(self.error("expected `)`"));
        }
        Ok(args)
    }
}
