//! End-to-end evaluation scenarios, verbatim from the design's worked
//! examples (S1, S3, S4, S7). S2 (ramp-up gating) and S5/S6 (parse-failure
//! and kill-switch/rollback) live in `bucketing.rs` and
//! `snapshot_lifecycle.rs` respectively, since they need a larger N or a
//! registry lifecycle to demonstrate.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use konditional::{
    evaluate, evaluate_with_shadow, evaluate_with_trace, Criterion, Decision, Flag, FlagDefinition,
    FlagId, FlagValue, RampUp, Registry, RegistryConfig, Rule, ShadowMismatch, ShadowOptions,
    Snapshot, StableId,
};
use once_cell::sync::Lazy;

/// Installs a `tracing` subscriber once per test binary, so a shadow
/// mismatch's warning-level log (emitted through the default `Logger`) is
/// visible when a test is run with `--nocapture` instead of silently
/// swallowed by the absence of any subscriber.
static INIT_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("konditional=debug")
        .try_init();
});

fn platforms(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn s1_platform_specific_rule_beats_ramp_up() {
    let id = FlagId::new("acme", "dark_mode").unwrap();
    let rule = Rule::new(
        FlagValue::Boolean(true),
        vec![Criterion::Platforms(platforms(&["iOS"]))],
        RampUp::full(),
        BTreeSet::new(),
        None,
    );
    let definition = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![rule], true, "v1").unwrap();
    let registry = Registry::new("acme", Snapshot::empty(0).with_flag(definition), RegistryConfig::default());

    let flag = Flag::new(id, false);
    let ctx = konditional::Context::new()
        .with_platform("iOS")
        .with_stable_id(StableId::of("abc").unwrap());

    let (value, result) = evaluate_with_trace(&registry, &flag, &ctx);
    assert!(value);
    assert!(matches!(
        result.decision,
        Decision::RuleMatched { rule_index: 0, .. }
    ));
}

#[test]
fn s3_specificity_ordering_picks_the_matching_broader_rule() {
    let id = FlagId::new("acme", "x").unwrap();
    let specific = Rule::new(
        FlagValue::Boolean(true),
        vec![
            Criterion::Platforms(platforms(&["iOS"])),
            Criterion::Locales(platforms(&["en-US"])),
        ],
        RampUp::full(),
        BTreeSet::new(),
        None,
    );
    let broad = Rule::new(
        FlagValue::Boolean(true),
        vec![Criterion::Platforms(platforms(&["iOS"]))],
        RampUp::full(),
        BTreeSet::new(),
        None,
    );
    let definition = FlagDefinition::new(
        id.clone(),
        FlagValue::Boolean(false),
        vec![specific, broad],
        true,
        "v1",
    )
    .unwrap();
    let registry = Registry::new("acme", Snapshot::empty(0).with_flag(definition), RegistryConfig::default());

    let flag = Flag::new(id, false);
    let ctx = konditional::Context::new()
        .with_platform("iOS")
        .with_locale("fr-FR")
        .with_stable_id(StableId::of("user").unwrap());

    let (value, result) = evaluate_with_trace(&registry, &flag, &ctx);
    assert!(value);
    assert!(matches!(
        result.decision,
        Decision::RuleMatched { rule_index: 1, .. }
    ));
}

#[test]
fn s4_allowlist_bypasses_ramp_up_gate() {
    let tester = StableId::of("tester-1").unwrap();
    let mut allowlist = BTreeSet::new();
    allowlist.insert(tester.clone());

    let id = FlagId::new("acme", "launch").unwrap();
    let rule = Rule::new(
        FlagValue::Boolean(true),
        vec![Criterion::Platforms(platforms(&["iOS"]))],
        RampUp::new(5.0).unwrap(),
        allowlist,
        None,
    );
    let definition = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![rule], true, "v1").unwrap();
    let registry = Registry::new("acme", Snapshot::empty(0).with_flag(definition), RegistryConfig::default());

    let flag = Flag::new(id, false);
    let ctx = konditional::Context::new().with_platform("iOS").with_stable_id(tester);

    assert!(evaluate(&registry, &flag, &ctx));
}

#[test]
fn s7_shadow_mode_reports_mismatch_without_changing_returned_value() {
    Lazy::force(&INIT_TRACING);

    let id = FlagId::new("acme", "launch").unwrap();
    let baseline_def = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![], true, "v1").unwrap();
    let candidate_def = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![], false, "v1").unwrap();

    let baseline = Registry::new("acme", Snapshot::empty(0).with_flag(baseline_def), RegistryConfig::default());
    let candidate = Registry::new("acme", Snapshot::empty(0).with_flag(candidate_def), RegistryConfig::default());

    // baseline flag is active with no rules -> default false; flip baseline
    // default on via override to produce true vs candidate's false so the
    // scenario's "baseline true, candidate false" shape holds.
    baseline.set_override(id.clone(), FlagValue::Boolean(true));

    let flag = Flag::new(id, false);
    let ctx = konditional::Context::new().with_stable_id(StableId::of("u1").unwrap());

    let mismatches = Arc::new(AtomicUsize::new(0));
    let recorded = Arc::new(std::sync::Mutex::new(None));
    let mismatches_clone = mismatches.clone();
    let recorded_clone = recorded.clone();
    let opts = ShadowOptions {
        evaluate_candidate_when_baseline_disabled: false,
        compare_decision_kind: false,
        on_mismatch: Some(Arc::new(move |m: ShadowMismatch| {
            mismatches_clone.fetch_add(1, Ordering::SeqCst);
            *recorded_clone.lock().unwrap() = Some(m);
        })),
    };

    let returned = evaluate_with_shadow(&baseline, &candidate, &flag, &ctx, &opts);

    assert!(returned, "shadow evaluation must return the baseline's value");
    assert_eq!(mismatches.load(Ordering::SeqCst), 1);
    let recorded = recorded.lock().unwrap().clone().unwrap();
    assert_eq!(recorded.baseline.value, FlagValue::Boolean(true));
    assert_eq!(recorded.candidate.value, FlagValue::Boolean(false));
}
