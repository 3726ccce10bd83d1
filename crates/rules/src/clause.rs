//! Facts and definite clauses.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, RuleError};
use crate::syntax::{tokenize, TokenKind};
use crate::term::{Cursor, Term};

/// A bare fact or a definite clause `p1 & p2 ==> q`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    Fact(Term),
    Rule { antecedent: Vec<Term>, consequent: Term },
}

impl Clause {
    /// Parse `p & q ==> r`, `r <== p & q`, or a bare fact `r`.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let markers = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Implies | TokenKind::ImpliedBy))
            .count();
        if markers > 1 {
            return Err(RuleError::Parse(format!("more than one implication in `{text}`")));
        }

        let mut cursor = Cursor::new(text, &tokens);
        let first = conjunction(&mut cursor)?;

        let clause = match cursor.peek() {
            None => {
                if first.len() != 1 {
                    return Err(RuleError::Parse(format!(
                        "a fact must be a single term, got `{text}`"
                    )));
                }
                Clause::Fact(first.into_iter().next().ok_or_else(|| cursor.error("expected a term"))?)
            }
            Some(TokenKind::Implies) => {
                cursor.eat(&TokenKind::Implies);
                let consequent = single(&mut cursor, text)?;
                Clause::Rule { antecedent: first, consequent }
            }
            Some(TokenKind::ImpliedBy) => {
                cursor.eat(&TokenKind::ImpliedBy);
                if first.len() != 1 {
                    return Err(RuleError::Parse(format!(
                        "consequent must be a single term in `{text}`"
                    )));
                }
                let antecedent = conjunction(&mut cursor)?;
                let consequent = first.into_iter().next().ok_or_else(|| cursor.error("expected a term"))?;
                Clause::Rule { antecedent, consequent }
            }
            Some(_) => return Err(cursor.error("unexpected token")),
        };
        cursor.finish()?;
        Ok(clause)
    }

    pub fn is_fact(&self) -> bool {
        matches!(self, Clause::Fact(_))
    }

    /// The consequent of a rule, or the fact itself.
    pub fn head(&self) -> &Term {
        match self {
            Clause::Fact(t) => t,
            Clause::Rule { consequent, .. } => consequent,
        }
    }

    /// Variables across antecedent and consequent, in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            Clause::Fact(t) => t.collect_variables(&mut out),
            Clause::Rule { antecedent, consequent } => {
                antecedent.iter().for_each(|t| t.collect_variables(&mut out));
                consequent.collect_variables(&mut out);
            }
        }
        out
    }

    pub(crate) fn collect_constants(&self, out: &mut BTreeSet<Term>) {
        match self {
            Clause::Fact(t) => t.collect_constants(out),
            Clause::Rule { antecedent, consequent } => {
                antecedent.iter().for_each(|t| t.collect_constants(out));
                consequent.collect_constants(out);
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Fact(t) => write!(f, "{t}"),
            Clause::Rule { antecedent, consequent } => {
                for (i, t) in antecedent.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" & ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, " ==> {consequent}")
            }
        }
    }
}

fn conjunction(cursor: &mut Cursor<'_>) -> Result<Vec<Term>> {
    if matches!(cursor.peek(), None | Some(TokenKind::Implies) | Some(TokenKind::ImpliedBy)) {
        return Err(cursor.error("expected a term"));
    }
    let mut terms = vec![cursor.term()?];
    while cursor.eat(&TokenKind::Amp) {
        terms.push(cursor.term()?);
    }
    Ok(terms)
}

fn single(cursor: &mut Cursor<'_>, text: &str) -> Result<Term> {
    let terms = conjunction(cursor)?;
    if terms.len() != 1 {
        return Err(RuleError::Parse(format!("consequent must be a single term in `{text}`")));
    }
    terms.into_iter().next().ok_or_else(|| cursor.error("expected a term"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forward_rule() {
        let c = Clause::parse("Daytime(Now) & Warm(Room) ==> Run(Cloud)").unwrap();
        match &c {
            Clause::Rule { antecedent, consequent } => {
                assert_eq!(antecedent.len(), 2);
                assert_eq!(consequent.to_string(), "Run(Cloud)");
            }
            other => panic!("expected rule, got {other:?}"),
        }
        assert_eq!(c.to_string(), "Daytime(Now) & Warm(Room) ==> Run(Cloud)");
    }

    #[test]
    fn reverse_arrow_is_equivalent() {
        assert_eq!(
            Clause::parse("Run(x) <== Hot(x) & Day(Now)").unwrap(),
            Clause::parse("Hot(x) & Day(Now) ==> Run(x)").unwrap()
        );
    }

    #[test]
    fn bare_fact() {
        let c = Clause::parse("Daytime(Now)").unwrap();
        assert!(c.is_fact());
        assert_eq!(c.head().to_string(), "Daytime(Now)");
    }

    #[test]
    fn variables_span_both_sides() {
        let c = Clause::parse("Hot(x) ==> Run(y)").unwrap();
        assert_eq!(c.variables(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "==> Run(x)",
            "Hot(x) ==>",
            "Hot(x) ==> Run(x) ==> Stop(x)",
            "Hot(x ==> Run(x)",
            "P() ==> Q(a)",
            "A(b) & C(d)",
            "A(b) ==> C(d) & E(f)",
        ] {
            assert!(matches!(Clause::parse(bad), Err(RuleError::Parse(_))), "{bad}");
        }
    }
}
