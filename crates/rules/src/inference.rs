//! Forward-chaining entailment over definite clauses.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::trace;

use crate::clause::Clause;
use crate::term::Term;
use crate::unify::{subst, unify, Substitution};

/// Lazily enumerate substitutions under which `clauses` entail `query`.
///
/// Existing facts are matched first. Then rules are applied in saturation
/// passes until a pass derives nothing new. Each pass grounds every rule by
/// trying every assignment of domain constants to the rule's variables, so a
/// pass costs `O(|rules| * |domain|^|vars|)` unifications. This is a brute-force
/// bound with no indexing; keep rule sets and domains small.
///
/// Substitutions may repeat when several facts match the query the same way.
pub fn entails(clauses: &[Clause], query: &Term) -> Entailment {
    let mut domain = BTreeSet::new();
    let mut facts = Vec::new();
    let mut rules = Vec::new();
    for clause in clauses {
        clause.collect_constants(&mut domain);
        match clause {
            Clause::Fact(t) => {
                if !facts.contains(t) {
                    facts.push(t.clone());
                }
            }
            Clause::Rule { antecedent, consequent } => rules.push(GroundableRule {
                variables: clause.variables(),
                antecedent: antecedent.clone(),
                consequent: consequent.clone(),
            }),
        }
    }
    let known = facts.iter().cloned().collect();
    Entailment {
        facts,
        known,
        rules,
        domain: domain.into_iter().collect(),
        query: query.clone(),
        pending: VecDeque::new(),
        phase: Phase::DirectMatch,
        passes: 0,
    }
}

#[derive(Debug, Clone)]
struct GroundableRule {
    variables: Vec<String>,
    antecedent: Vec<Term>,
    consequent: Term,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    DirectMatch,
    Saturating,
    Done,
}

/// Iterator returned by [`entails`].
#[derive(Debug)]
pub struct Entailment {
    facts: Vec<Term>,
    known: HashSet<Term>,
    rules: Vec<GroundableRule>,
    domain: Vec<Term>,
    query: Term,
    pending: VecDeque<Substitution>,
    phase: Phase,
    passes: usize,
}

impl Entailment {
    /// Facts known so far, including those derived by completed passes.
    pub fn facts(&self) -> &[Term] {
        &self.facts
    }

    /// Number of saturation passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run one saturation pass. Returns false when nothing new was derived.
    fn saturate_once(&mut self) -> bool {
        self.passes += 1;
        let mut batch: Vec<Term> = Vec::new();
        let empty = Substitution::new();

        for rule in &self.rules {
            for theta in assignments(&rule.variables, &self.domain) {
                let satisfied = rule
                    .antecedent
                    .iter()
                    .all(|p| self.known.contains(&subst(&theta, p)));
                if !satisfied {
                    continue;
                }
                let derived = subst(&theta, &rule.consequent);
                let seen = self
                    .facts
                    .iter()
                    .chain(batch.iter())
                    .any(|f| unify(&derived, f, &empty).is_some());
                if seen {
                    continue;
                }
                if let Some(phi) = unify(&derived, &self.query, &empty) {
                    self.pending.push_back(phi);
                }
                trace!(fact = %derived, "derived");
                batch.push(derived);
            }
        }

        if batch.is_empty() {
            return false;
        }
        for fact in batch {
            self.known.insert(fact.clone());
            self.facts.push(fact);
        }
        true
    }
}

impl Iterator for Entailment {
    type Item = Substitution;

    fn next(&mut self) -> Option<Substitution> {
        loop {
            if let Some(theta) = self.pending.pop_front() {
                return Some(theta);
            }
            match self.phase {
                Phase::DirectMatch => {
                    let empty = Substitution::new();
                    for fact in &self.facts {
                        if let Some(phi) = unify(fact, &self.query, &empty) {
                            self.pending.push_back(phi);
                        }
                    }
                    self.phase = Phase::Saturating;
                }
                Phase::Saturating => {
                    if !self.saturate_once() {
                        self.phase = Phase::Done;
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

/// Every mapping of `vars` to elements of `domain`, odometer order.
fn assignments<'a>(vars: &'a [String], domain: &'a [Term]) -> impl Iterator<Item = Substitution> + 'a {
    let total = if vars.is_empty() {
        1
    } else if domain.is_empty() {
        0
    } else {
        domain.len().saturating_pow(vars.len() as u32)
    };
    (0..total).map(move |mut n| {
        vars.iter()
            .map(|v| {
                let pick = domain[n % domain.len().max(1)].clone();
                n /= domain.len().max(1);
                (v.clone(), pick)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clauses(texts: &[&str]) -> Vec<Clause> {
        texts.iter().map(|t| Clause::parse(t).unwrap()).collect()
    }

    fn bindings(cs: &[Clause], query: &str, var: &str) -> Vec<String> {
        entails(cs, &Term::parse(query).unwrap())
            .filter_map(|theta| theta.resolve(var))
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn direct_match_on_existing_fact() {
        let cs = clauses(&["Run(Cloud)"]);
        assert_eq!(bindings(&cs, "Run(x)", "x"), vec!["Cloud"]);
    }

    #[test]
    fn derives_through_rules() {
        let cs = clauses(&[
            "Daytime(Now)",
            "Daytime(Now) ==> Run(Cloud)",
            "Daytime(Now) ==> Run(Smoke)",
            "Nighttime(Now) ==> Stop(Cloud)",
        ]);
        let mut run = bindings(&cs, "Run(x)", "x");
        run.sort();
        assert_eq!(run, vec!["Cloud", "Smoke"]);
        assert!(bindings(&cs, "Stop(x)", "x").is_empty());
    }

    #[test]
    fn chains_with_variables() {
        let cs = clauses(&[
            "Sensor(Cam)",
            "Sensor(x) ==> Healthy(x)",
            "Healthy(x) & Daytime(Now) ==> Run(x)",
            "Daytime(Now)",
        ]);
        assert_eq!(bindings(&cs, "Run(x)", "x"), vec!["Cam"]);
    }

    #[test]
    fn cyclic_rules_reach_fixpoint() {
        let cs = clauses(&["P(A)", "P(x) ==> Q(x)", "Q(x) ==> P(x)", "Q(x) ==> R(x)"]);
        let mut it = entails(&cs, &Term::parse("R(y)").unwrap());
        let found: Vec<_> = it.by_ref().collect();
        assert_eq!(found.len(), 1);
        assert!(it.passes() <= 4);
        assert_eq!(it.facts().len(), 3);
    }

    #[test]
    fn no_rules_no_domain() {
        let cs: Vec<Clause> = Vec::new();
        assert_eq!(entails(&cs, &Term::parse("Run(x)").unwrap()).count(), 0);
    }

    #[test]
    fn assignment_enumeration_is_full_cross_product() {
        let vars = vec!["a".to_string(), "b".to_string()];
        let domain = vec![Term::Const("X".into()), Term::Const("Y".into()), Term::Const("Z".into())];
        assert_eq!(assignments(&vars, &domain).count(), 9);
        assert_eq!(assignments(&[], &domain).count(), 1);
        assert_eq!(assignments(&vars, &[]).count(), 0);
    }

    #[test]
    fn yields_lazily() {
        let cs = clauses(&["Run(A)", "Run(A) ==> Run(B)", "Run(B) ==> Run(C)"]);
        let mut it = entails(&cs, &Term::parse("Run(x)").unwrap());
        assert_eq!(it.next().and_then(|t| t.resolve("x")), Some(Term::Const("A".into())));
        assert_eq!(it.passes(), 0);
        assert_eq!(it.next().and_then(|t| t.resolve("x")), Some(Term::Const("B".into())));
        assert_eq!(it.passes(), 1);
    }
}
