//! First-order rule engine for per-goal plugin decisions.
//!
//! This crate provides:
//! - Term and definite-clause parsing (`Daytime(Now) ==> Run(Cloud)`)
//! - Unification with occurs check and idempotent substitution
//! - A sandboxed condition language for telemetry triggers
//! - Fact derivation from the latest measurements
//! - Lazy forward-chaining entailment
//! - The [`KnowledgeBase`] goal state machine that reports only transitions

pub mod clause;
pub mod condition;
pub mod derive;
pub mod error;
pub mod inference;
pub mod knowledge_base;
pub mod measures;
mod syntax;
pub mod term;
pub mod unify;

pub use clause::Clause;
pub use condition::Condition;
pub use error::{EvaluationError, Result, RuleError};
pub use inference::{entails, Entailment};
pub use knowledge_base::{KnowledgeBase, PluginState, Transition, TransitionStatus};
pub use syntax::format_number;
pub use term::Term;
pub use unify::{subst, unify, Substitution};
