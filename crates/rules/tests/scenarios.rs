//! End-to-end behaviour of the knowledge base: registration, telemetry,
//! inference and transition reporting.

use edgekb_core::Measurement;
use edgekb_rules::{
    subst, unify, KnowledgeBase, PluginState, Substitution, Term, Transition, TransitionStatus,
};

fn reading(name: &str, value: f64) -> Measurement {
    Measurement { name: name.to_string(), timestamp: 1_700_000_000, value }
}

fn transition(goal: &str, status: TransitionStatus, plugin: &str) -> Transition {
    Transition { goal_id: goal.into(), status, plugin_name: plugin.into() }
}

/// The daytime/nighttime sampler goal.
fn g1() -> KnowledgeBase {
    let mut kb = KnowledgeBase::new();
    kb.register_rules(
        "g1",
        &[
            "Daytime(Now) ==> Run(Cloud)",
            "Daytime(Now) ==> Run(Smoke)",
            "Nighttime(Now) ==> Stop(Cloud)",
        ],
    )
    .unwrap();
    kb.register_triggers(
        "g1",
        &["env.system.time > 10 ==> Daytime(Now)", "env.system.time <= 10 ==> Nighttime(Now)"],
    )
    .unwrap();
    kb
}

// ── transitions ─────────────────────────────────────────────

#[test]
fn g1_day_night_day() {
    let mut kb = g1();

    let events = kb.on_measurement(&reading("env.system.time", 11.0)).unwrap();
    assert_eq!(
        events,
        vec![
            transition("g1", TransitionStatus::Runnable, "Cloud"),
            transition("g1", TransitionStatus::Runnable, "Smoke"),
        ]
    );

    let events = kb.on_measurement(&reading("env.system.time", 5.0)).unwrap();
    assert_eq!(events, vec![transition("g1", TransitionStatus::Stoppable, "Cloud")]);
    assert_eq!(kb.status_of("g1", "Smoke"), Some(PluginState::Run));

    let events = kb.on_measurement(&reading("env.system.time", 12.0)).unwrap();
    assert_eq!(events, vec![transition("g1", TransitionStatus::Runnable, "Cloud")]);
}

#[test]
fn repeated_state_is_not_reported_again() {
    let mut kb = g1();
    assert_eq!(kb.on_measurement(&reading("env.system.time", 11.0)).unwrap().len(), 2);
    assert!(kb.on_measurement(&reading("env.system.time", 12.0)).unwrap().is_empty());
    assert!(kb.on_measurement(&reading("env.system.time", 23.0)).unwrap().is_empty());
}

#[test]
fn unrelated_measurement_triggers_nothing() {
    let mut kb = g1();
    assert!(kb.on_measurement(&reading("env.humidity", 40.0)).unwrap().is_empty());
    assert_eq!(kb.measure("env.humidity"), Some(40.0));
}

// ── dump ────────────────────────────────────────────────────

#[test]
fn dump_leaves_other_goals_alone() {
    let mut kb = g1();
    kb.register_rules("g2", &["Humid(Air) ==> Run(Dryer)"]).unwrap();
    kb.register_triggers("g2", &["env.humidity > 70 ==> Humid(Air)"]).unwrap();
    assert_eq!(kb.expression_bucket_count(), 2);

    kb.dump("g1").unwrap();
    assert!(kb.rules_for("g1").is_none());
    assert!(!kb.has_triggers("g1"));
    assert_eq!(kb.expression_bucket_count(), 1);
    assert_eq!(kb.goal_ids().collect::<Vec<_>>(), vec!["g2"]);

    assert!(kb.on_measurement(&reading("env.system.time", 11.0)).unwrap().is_empty());
    assert_eq!(
        kb.on_measurement(&reading("env.humidity", 80.0)).unwrap(),
        vec![transition("g2", TransitionStatus::Runnable, "Dryer")]
    );
}

#[test]
fn dump_keeps_reported_status() {
    let mut kb = g1();
    kb.on_measurement(&reading("env.system.time", 11.0)).unwrap();
    kb.dump("g1").unwrap();
    assert_eq!(kb.status_of("g1", "Cloud"), Some(PluginState::Run));

    kb.register_rules("g1", &["Daytime(Now) ==> Run(Cloud)"]).unwrap();
    kb.register_triggers("g1", &["env.system.time > 10 ==> Daytime(Now)"]).unwrap();
    assert!(kb.on_measurement(&reading("env.system.time", 12.0)).unwrap().is_empty());
}

#[test]
fn dump_unknown_goal_is_harmless() {
    let mut kb = g1();
    kb.dump("nope").unwrap();
    assert_eq!(kb.rules_for("g1").map(<[_]>::len), Some(3));
}

// ── inference ───────────────────────────────────────────────

#[test]
fn facts_from_other_goals_are_visible() {
    let mut kb = KnowledgeBase::new();
    kb.register_triggers("weather", &["env.rain > 0 ==> Raining(Outside)"]).unwrap();
    kb.register_rules("camera", &["Raining(Outside) ==> Stop(Camera)"]).unwrap();
    kb.register_triggers("camera", &["env.rain > 0 ==> Wet(Lens)"]).unwrap();

    let events = kb.on_measurement(&reading("env.rain", 3.0)).unwrap();
    assert_eq!(events, vec![transition("camera", TransitionStatus::Stoppable, "Camera")]);
}

#[test]
fn cyclic_rules_terminate() {
    let mut kb = KnowledgeBase::new();
    kb.register_rules(
        "loop",
        &["Busy(x) ==> Hot(x)", "Hot(x) ==> Busy(x)", "Hot(x) & Busy(x) ==> Stop(x)"],
    )
    .unwrap();
    kb.register_triggers("loop", &["load > 90 ==> Busy(Worker)"]).unwrap();

    let events = kb.on_measurement(&reading("load", 95.0)).unwrap();
    assert_eq!(events, vec![transition("loop", TransitionStatus::Stoppable, "Worker")]);
    assert_eq!(kb.ask("loop", "Hot(x)").unwrap(), vec!["Worker".to_string()]);
}

#[test]
fn measurement_values_flow_into_facts() {
    let mut kb = KnowledgeBase::new();
    kb.register_rules("g", &["Level(Alarm) ==> Run(Siren)"]).unwrap();
    kb.register_triggers("g", &["co2 > 1000 ==> Reading(co2)", "co2 > 1000 ==> Level(Alarm)"])
        .unwrap();
    kb.ingest(&reading("co2", 1200.0)).unwrap();
    assert_eq!(kb.ask("g", "Reading(v)").unwrap(), vec!["1200".to_string()]);
}

#[test]
fn ask_does_not_change_status() {
    let mut kb = g1();
    kb.ingest(&reading("env.system.time", 11.0)).unwrap();
    let mut plugins = kb.ask("g1", "Run(p)").unwrap();
    plugins.sort();
    assert_eq!(plugins, vec!["Cloud".to_string(), "Smoke".to_string()]);
    assert!(kb.status_of("g1", "Cloud").is_none());
    assert_eq!(kb.on_measurement(&reading("env.system.time", 11.0)).unwrap().len(), 2);
}

// ── unification laws ────────────────────────────────────────

fn t(s: &str) -> Term {
    Term::parse(s).unwrap()
}

#[test]
fn unifier_makes_both_sides_equal() {
    let pairs = [
        ("P(x, B)", "P(A, y)"),
        ("Q(f(x), x)", "Q(f(A), A)"),
        ("R(x, y, z)", "R(y, z, C)"),
        ("Run(x)", "Run(Cloud)"),
    ];
    for (a, b) in pairs {
        let theta = unify(&t(a), &t(b), &Substitution::new())
            .unwrap_or_else(|| panic!("{a} and {b} should unify"));
        assert_eq!(subst(&theta, &t(a)), subst(&theta, &t(b)), "{a} ~ {b}");
    }
}

#[test]
fn substitution_is_idempotent() {
    let theta = unify(&t("R(x, y, z)"), &t("R(y, z, C)"), &Substitution::new()).unwrap();
    for term in ["R(x, y, z)", "S(f(x), w)", "x"] {
        let once = subst(&theta, &t(term));
        assert_eq!(subst(&theta, &once), once, "{term}");
    }
}

#[test]
fn non_unifiable_pairs() {
    for (a, b) in [("P(A)", "P(B)"), ("P(x, x)", "P(A, B)"), ("P(x)", "Q(x)"), ("x", "f(x)")] {
        assert!(unify(&t(a), &t(b), &Substitution::new()).is_none(), "{a} ~ {b}");
    }
}

#[test]
fn deeply_nested_input_is_rejected_without_side_effects() {
    let mut kb = g1();
    let depth = 2000;
    let trigger = format!("{}hour > 1{} ==> Daytime(Now)", "(".repeat(depth), ")".repeat(depth));
    assert!(kb.register_triggers("g2", &[trigger]).is_err());
    assert!(!kb.has_triggers("g2"));

    let rule = format!("Daytime({}Now{}) ==> Run(Cloud)", "f(".repeat(depth), ")".repeat(depth));
    assert!(kb.register_rules("g1", &[rule]).is_err());
    assert_eq!(kb.rules_for("g1").map(|r| r.len()), Some(3));
}
