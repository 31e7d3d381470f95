//! Statistical properties of deterministic bucketing: S2 (ramp-up gating
//! under a realistic rollout), and quantified invariants 3-5 (uniform
//! distribution, monotonicity under increasing ramp-up, salt reshuffle).

use std::collections::BTreeSet;

use konditional::{
    evaluate, Context, Criterion, Flag, FlagDefinition, FlagId, FlagValue, RampUp, Registry,
    RegistryConfig, Rule, Snapshot, StableId,
};
use rand::distributions::Alphanumeric;
use rand::Rng;

const N: usize = 10_000;

/// Distinct random stable ids, not sequential counters -- bucketing is
/// meant to behave uniformly over arbitrary user identities, not just a
/// monotonic sequence.
fn stable_ids(n: usize) -> Vec<StableId> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let raw: String = (&mut rng).sample_iter(&Alphanumeric).take(24).map(char::from).collect();
            StableId::of(&raw).unwrap()
        })
        .collect()
}

fn registry_with_android_rollout(salt: &str, ramp_up: f64) -> (Registry, FlagId) {
    let id = FlagId::new("acme", "beta").unwrap();
    let mut android = BTreeSet::new();
    android.insert("android".to_string());
    let rule = Rule::new(
        FlagValue::Boolean(true),
        vec![Criterion::Platforms(android)],
        RampUp::new(ramp_up).unwrap(),
        BTreeSet::new(),
        None,
    );
    let definition = FlagDefinition::new(id.clone(), FlagValue::Boolean(false), vec![rule], true, salt).unwrap();
    let registry = Registry::new("acme", Snapshot::empty(0).with_flag(definition), RegistryConfig::default());
    (registry, id)
}

fn enabled_count(registry: &Registry, id: &FlagId, ids: &[StableId]) -> usize {
    let flag = Flag::new(id.clone(), false);
    ids.iter()
        .filter(|stable_id| {
            let ctx = Context::new().with_platform("android").with_stable_id((*stable_id).clone());
            evaluate(registry, &flag, &ctx)
        })
        .count()
}

fn enabled_set(registry: &Registry, id: &FlagId, ids: &[StableId]) -> BTreeSet<String> {
    let flag = Flag::new(id.clone(), false);
    ids.iter()
        .filter(|stable_id| {
            let ctx = Context::new().with_platform("android").with_stable_id((*stable_id).clone());
            evaluate(registry, &flag, &ctx)
        })
        .map(|id| id.as_hex().to_string())
        .collect()
}

/// ~30% ramp-up over 10,000 distinct ids lands within a wide statistical
/// band ([2700, 3300], i.e. +/- 2 sigma around a uniform-bucket hypothesis).
#[test]
fn s2_ramp_up_gating_lands_in_expected_band() {
    let (registry, id) = registry_with_android_rollout("v1", 30.0);
    let ids = stable_ids(N);
    let count = enabled_count(&registry, &id, &ids);
    assert!(
        (2700..=3300).contains(&count),
        "expected enabled count in [2700, 3300], got {count}"
    );
}

/// Property 3: for p in {10, 25, 50, 75, 90}, the enabled fraction tracks
/// p/100 within a generous tolerance over N = 10_000 ids.
#[test]
fn property_3_bucket_distribution_tracks_ramp_up_fraction() {
    let ids = stable_ids(N);
    for p in [10.0, 25.0, 50.0, 75.0, 90.0] {
        let (registry, id) = registry_with_android_rollout("v1", p);
        let count = enabled_count(&registry, &id, &ids);
        let expected = (p / 100.0 * N as f64) as i64;
        let tolerance = (N as f64 * 0.03) as i64; // +/- 3 percentage points
        assert!(
            (count as i64 - expected).abs() <= tolerance,
            "p={p}: expected ~{expected}, got {count} (tolerance {tolerance})"
        );
    }
}

/// Property 4: increasing ramp-up from p1 to p2 > p1 never removes anyone
/// already included -- the included set at p1 is a subset of the included
/// set at p2, for the same salt and flag.
#[test]
fn property_4_increasing_ramp_up_is_monotonic() {
    let ids = stable_ids(N);
    let (registry_30, id) = registry_with_android_rollout("v1", 30.0);
    let (registry_70, _) = registry_with_android_rollout("v1", 70.0);

    let at_30 = enabled_set(&registry_30, &id, &ids);
    let at_70 = enabled_set(&registry_70, &id, &ids);

    assert!(
        at_30.is_subset(&at_70),
        "every id included at 30% must remain included at 70%"
    );
    assert!(at_70.len() > at_30.len());
}

/// Property 5: changing the salt reshuffles bucket assignment -- the
/// included set at a fixed ramp-up differs substantially from the
/// pre-change set.
#[test]
fn property_5_changing_salt_reshuffles_buckets() {
    let ids = stable_ids(N);
    let (registry_v1, id) = registry_with_android_rollout("v1", 50.0);
    let (registry_v2, _) = registry_with_android_rollout("v2", 50.0);

    let set_v1 = enabled_set(&registry_v1, &id, &ids);
    let set_v2 = enabled_set(&registry_v2, &id, &ids);

    let symmetric_difference = set_v1.symmetric_difference(&set_v2).count();
    assert!(
        symmetric_difference > N / 10,
        "expected substantial reshuffle, got symmetric difference of {symmetric_difference}"
    );
}
