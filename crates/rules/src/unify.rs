//! Syntactic unification and substitution application.

use std::collections::BTreeMap;
use std::fmt;

use crate::term::Term;

/// Variable bindings produced by [`unify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution(BTreeMap<String, Term>);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.0.get(var)
    }

    pub fn bind(&mut self, var: impl Into<String>, term: Term) {
        self.0.insert(var.into(), term);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.0.iter()
    }

    /// Fully resolved value of `var`, following binding chains.
    pub fn resolve(&self, var: &str) -> Option<Term> {
        self.0.get(var).map(|t| subst(self, t))
    }
}

impl FromIterator<(String, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

/// Extend `theta` so that `a` and `b` become identical, or return `None`.
///
/// The input substitution is never modified. Binding a variable to a term
/// that contains it fails (occurs check).
pub fn unify(a: &Term, b: &Term, theta: &Substitution) -> Option<Substitution> {
    let mut out = theta.clone();
    unify_into(a, b, &mut out).then_some(out)
}

fn unify_into(a: &Term, b: &Term, theta: &mut Substitution) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Term::Var(v), other) => unify_var(v, other, theta),
        (other, Term::Var(v)) => unify_var(v, other, theta),
        (
            Term::Compound { functor: fa, args: aa },
            Term::Compound { functor: fb, args: ab },
        ) => {
            fa == fb
                && aa.len() == ab.len()
                && aa.iter().zip(ab).all(|(x, y)| unify_into(x, y, theta))
        }
        _ => false,
    }
}

fn unify_var(var: &str, other: &Term, theta: &mut Substitution) -> bool {
    if let Some(bound) = theta.get(var).cloned() {
        return unify_into(&bound, other, theta);
    }
    if let Term::Var(o) = other {
        if let Some(bound) = theta.get(o).cloned() {
            return unify_into(&Term::Var(var.to_string()), &bound, theta);
        }
    }
    let resolved = subst(theta, other);
    if resolved == Term::Var(var.to_string()) {
        return true;
    }
    if resolved.occurs(var) {
        return false;
    }
    theta.bind(var, other.clone());
    true
}

/// Replace bound variables in `term`, following chains to their end.
pub fn subst(theta: &Substitution, term: &Term) -> Term {
    subst_guarded(theta, term, &mut Vec::new())
}

fn subst_guarded(theta: &Substitution, term: &Term, seen: &mut Vec<String>) -> Term {
    match term {
        Term::Var(v) => match theta.get(v) {
            Some(bound) if !seen.contains(v) => {
                seen.push(v.clone());
                let out = subst_guarded(theta, bound, seen);
                seen.pop();
                out
            }
            _ => term.clone(),
        },
        Term::Const(_) => term.clone(),
        Term::Compound { functor, args } => Term::Compound {
            functor: functor.clone(),
            args: args.iter().map(|a| subst_guarded(theta, a, seen)).collect(),
        },
    }
}
