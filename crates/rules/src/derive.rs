//! Fact derivation: turning trigger conditions and measurements into facts.

use std::collections::HashMap;

use edgekb_core::sanitize_name;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::condition::Condition;
use crate::syntax::format_number;
use crate::term::Term;

/// One registered trigger: when `condition` holds, `template` (with
/// measurement values substituted for its variables) becomes a fact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionEntry {
    pub template: Term,
    pub condition: Condition,
    pub goal_id: String,
}

impl ExpressionEntry {
    pub fn new(template: Term, condition: Condition, goal_id: impl Into<String>) -> Self {
        Self { template: sanitize_template(&template), condition, goal_id: goal_id.into() }
    }

    /// The derived fact for the current snapshot.
    pub fn instantiate(&self, values: &HashMap<String, f64>) -> Term {
        fill_template(&self.template, values)
    }
}

/// Expression entries grouped by the identifiers their condition reads.
#[derive(Debug, Default, Clone)]
pub struct ExpressionTable {
    buckets: IndexMap<Vec<String>, Vec<ExpressionEntry>>,
}

impl ExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ExpressionEntry) {
        let key = entry.condition.identifiers().to_vec();
        self.buckets.entry(key).or_default().push(entry);
    }

    /// Remove every entry owned by `goal_id`; empty buckets are dropped.
    pub fn remove_goal(&mut self, goal_id: &str) -> usize {
        let mut removed = 0;
        for entries in self.buckets.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.goal_id != goal_id);
            removed += before - entries.len();
        }
        self.buckets.retain(|_, entries| !entries.is_empty());
        removed
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&[String], &[ExpressionEntry])> {
        self.buckets.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn entries_for<'a>(&'a self, goal_id: &'a str) -> impl Iterator<Item = &'a ExpressionEntry> + 'a {
        self.buckets.values().flatten().filter(move |e| e.goal_id == goal_id)
    }

    pub fn has_goal(&self, goal_id: &str) -> bool {
        self.entries_for(goal_id).next().is_some()
    }
}

/// Derived facts for the current snapshot, in table order without duplicates.
///
/// Every bucket whose key shares a name with the snapshot is evaluated, not
/// only the buckets of the goal being queried. An entry whose condition fails
/// to evaluate is logged and counts as false.
pub fn derive_facts(values: &HashMap<String, f64>, table: &ExpressionTable) -> Vec<Term> {
    let mut facts: Vec<Term> = Vec::new();
    for (key, entries) in table.buckets() {
        if !key.iter().any(|name| values.contains_key(name)) {
            continue;
        }
        for entry in entries {
            match entry.condition.evaluate(values) {
                Ok(true) => {
                    let fact = entry.instantiate(values);
                    if !facts.contains(&fact) {
                        facts.push(fact);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(
                    goal_id = %entry.goal_id,
                    condition = %entry.condition,
                    error = %e,
                    "trigger condition failed to evaluate"
                ),
            }
        }
    }
    debug!(count = facts.len(), "derived facts");
    facts
}

/// Goals whose conditions reading `name` currently hold.
pub fn triggered_goals(name: &str, values: &HashMap<String, f64>, table: &ExpressionTable) -> Vec<String> {
    let mut goals: Vec<String> = Vec::new();
    for (key, entries) in table.buckets() {
        if !key.iter().any(|k| k == name) {
            continue;
        }
        for entry in entries {
            match entry.condition.evaluate(values) {
                Ok(true) if !goals.contains(&entry.goal_id) => goals.push(entry.goal_id.clone()),
                Ok(_) => {}
                Err(e) => warn!(
                    goal_id = %entry.goal_id,
                    condition = %entry.condition,
                    error = %e,
                    "trigger condition failed to evaluate"
                ),
            }
        }
    }
    goals
}

fn sanitize_template(term: &Term) -> Term {
    match term {
        Term::Var(v) => Term::Var(sanitize_name(v)),
        Term::Const(_) => term.clone(),
        Term::Compound { functor, args } => Term::Compound {
            functor: functor.clone(),
            args: args.iter().map(sanitize_template).collect(),
        },
    }
}

fn fill_template(term: &Term, values: &HashMap<String, f64>) -> Term {
    match term {
        Term::Var(v) => match values.get(v) {
            Some(value) => Term::Const(format_number(*value)),
            None => term.clone(),
        },
        Term::Const(_) => term.clone(),
        Term::Compound { functor, args } => Term::Compound {
            functor: functor.clone(),
            args: args.iter().map(|a| fill_template(a, values)).collect(),
        },
    }
}
