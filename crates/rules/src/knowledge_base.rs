//! Per-goal rules, triggers, measurements and the transition state machine.

use std::collections::HashMap;
use std::fmt;

use edgekb_core::Measurement;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::clause::Clause;
use crate::condition::Condition;
use crate::derive::{derive_facts, triggered_goals, ExpressionEntry, ExpressionTable};
use crate::error::{Result, RuleError};
use crate::inference::entails;
use crate::measures::MeasureStore;
use crate::term::Term;

/// Last state reported for a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    Run,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionStatus {
    Runnable,
    Stoppable,
}

impl TransitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionStatus::Runnable => "Runnable",
            TransitionStatus::Stoppable => "Stoppable",
        }
    }

    fn target(self) -> PluginState {
        match self {
            TransitionStatus::Runnable => PluginState::Run,
            TransitionStatus::Stoppable => PluginState::Stop,
        }
    }

    fn predicate(self) -> &'static str {
        match self {
            TransitionStatus::Runnable => "Run",
            TransitionStatus::Stoppable => "Stop",
        }
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plugin whose decided state changed for a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub goal_id: String,
    pub status: TransitionStatus,
    pub plugin_name: String,
}

/// The engine state: rules per goal, trigger expressions, the latest
/// measurements and the last reported state of every plugin.
///
/// Not thread-safe by itself; a single owner applies commands in order.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    goal_rules: IndexMap<String, Vec<Clause>>,
    expressions: ExpressionTable,
    measures: MeasureStore,
    goal_status: HashMap<String, HashMap<String, PluginState>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append science rules to `goal_id`. Either every text parses and all
    /// are appended, or nothing changes.
    pub fn register_rules<S: AsRef<str>>(&mut self, goal_id: &str, texts: &[S]) -> Result<usize> {
        check_goal_id(goal_id)?;
        let parsed = texts
            .iter()
            .map(|t| Clause::parse(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let count = parsed.len();
        self.goal_rules.entry(goal_id.to_string()).or_default().extend(parsed);
        info!(goal_id, count, "registered rules");
        Ok(count)
    }

    /// Register `condition ==> fact` triggers for `goal_id`, all or nothing.
    pub fn register_triggers<S: AsRef<str>>(&mut self, goal_id: &str, texts: &[S]) -> Result<usize> {
        check_goal_id(goal_id)?;
        let entries = texts
            .iter()
            .map(|t| parse_trigger(goal_id, t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let count = entries.len();
        for entry in entries {
            self.expressions.insert(entry);
        }
        self.goal_rules.entry(goal_id.to_string()).or_default();
        info!(goal_id, count, "registered triggers");
        Ok(count)
    }

    /// Forget the rules and triggers of `goal_id`. Reported plugin states
    /// are kept, so re-registering the goal does not repeat old events.
    pub fn dump(&mut self, goal_id: &str) -> Result<()> {
        check_goal_id(goal_id)?;
        let rules = self.goal_rules.shift_remove(goal_id).map_or(0, |r| r.len());
        let triggers = self.expressions.remove_goal(goal_id);
        info!(goal_id, rules, triggers, "dumped goal");
        Ok(())
    }

    /// Store a measurement and return the identifier it is stored under.
    pub fn ingest(&mut self, measurement: &Measurement) -> Result<String> {
        let name = self.measures.ingest(measurement)?;
        debug!(name = %name, value = measurement.value, timestamp = measurement.timestamp, "measurement");
        Ok(name)
    }

    /// Goals whose triggers reading `name` hold against the current snapshot.
    pub fn check_triggers(&self, name: &str) -> Vec<String> {
        let name = edgekb_core::sanitize_name(name);
        triggered_goals(&name, self.measures.values(), &self.expressions)
    }

    /// Re-evaluate `Run(x)` then `Stop(x)` for each goal and report plugins
    /// whose state differs from the last report.
    ///
    /// When both hold for a plugin in the same pass, both transitions are
    /// returned in that order and the recorded state ends as `Stop`.
    pub fn check_status_change<S: AsRef<str>>(&mut self, goal_ids: &[S]) -> Vec<Transition> {
        let facts: Vec<Clause> = derive_facts(self.measures.values(), &self.expressions)
            .into_iter()
            .map(Clause::Fact)
            .collect();
        let mut transitions = Vec::new();

        for goal_id in goal_ids.iter().map(AsRef::as_ref) {
            let mut clauses = facts.clone();
            if let Some(rules) = self.goal_rules.get(goal_id) {
                clauses.extend(rules.iter().cloned());
            }
            let status = self.goal_status.entry(goal_id.to_string()).or_default();

            for kind in [TransitionStatus::Runnable, TransitionStatus::Stoppable] {
                let query = Term::compound(kind.predicate(), vec![Term::Var("x".into())]);
                for theta in entails(&clauses, &query) {
                    let Some(plugin) = theta.resolve("x").filter(Term::is_ground) else {
                        continue;
                    };
                    let plugin = plugin.to_string();
                    if status.get(&plugin) == Some(&kind.target()) {
                        continue;
                    }
                    status.insert(plugin.clone(), kind.target());
                    info!(goal_id, plugin = %plugin, status = %kind, "transition");
                    transitions.push(Transition {
                        goal_id: goal_id.to_string(),
                        status: kind,
                        plugin_name: plugin,
                    });
                }
            }
        }
        transitions
    }

    /// Values bound to the variables of `predicate`, read-only.
    pub fn ask(&self, goal_id: &str, predicate: &str) -> Result<Vec<String>> {
        let Some(rules) = self.goal_rules.get(goal_id) else {
            return Err(RuleError::Validation(format!("unknown goal `{goal_id}`")));
        };
        let query = Term::parse(predicate)?;
        let variables = query.variables();
        let mut clauses: Vec<Clause> = derive_facts(self.measures.values(), &self.expressions)
            .into_iter()
            .map(Clause::Fact)
            .collect();
        clauses.extend(rules.iter().cloned());

        let mut out = Vec::new();
        for theta in entails(&clauses, &query) {
            for var in &variables {
                if let Some(value) = theta.resolve(var) {
                    out.push(value.to_string());
                }
            }
        }
        Ok(out)
    }

    /// Ingest, find triggered goals and return their transitions.
    pub fn on_measurement(&mut self, measurement: &Measurement) -> Result<Vec<Transition>> {
        let name = self.ingest(measurement)?;
        let goals = self.check_triggers(&name);
        if goals.is_empty() {
            return Ok(Vec::new());
        }
        debug!(name = %name, goals = ?goals, "triggered goals");
        Ok(self.check_status_change(&goals))
    }

    pub fn goal_ids(&self) -> impl Iterator<Item = &str> {
        self.goal_rules.keys().map(String::as_str)
    }

    pub fn rules_for(&self, goal_id: &str) -> Option<&[Clause]> {
        self.goal_rules.get(goal_id).map(Vec::as_slice)
    }

    pub fn expression_bucket_count(&self) -> usize {
        self.expressions.bucket_count()
    }

    pub fn has_triggers(&self, goal_id: &str) -> bool {
        self.expressions.has_goal(goal_id)
    }

    pub fn measure(&self, name: &str) -> Option<f64> {
        self.measures.get(&edgekb_core::sanitize_name(name))
    }

    pub fn status_of(&self, goal_id: &str, plugin: &str) -> Option<PluginState> {
        self.goal_status.get(goal_id)?.get(plugin).copied()
    }
}

fn check_goal_id(goal_id: &str) -> Result<()> {
    if goal_id.trim().is_empty() {
        return Err(RuleError::Validation("goal id must not be empty".into()));
    }
    Ok(())
}

fn parse_trigger(goal_id: &str, text: &str) -> Result<ExpressionEntry> {
    let Some((condition, fact)) = text.split_once("==>") else {
        return Err(RuleError::Parse(format!("trigger `{text}` has no `==>`")));
    };
    let condition = Condition::parse(condition)?;
    if condition.identifiers().is_empty() {
        return Err(RuleError::Validation(format!(
            "trigger condition `{condition}` references no measurement"
        )));
    }
    let template = Term::parse(fact.trim())?;
    Ok(ExpressionEntry::new(template, condition, goal_id))
}
