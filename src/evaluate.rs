use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crate::context::Context;
use crate::flag::{Decision, EvaluationResult, Trace};
use crate::hooks::EvaluationMetric;
use crate::identity::FlagId;
use crate::registry::Registry;
use crate::value::FlagValueType;

/// A strongly-typed handle to a declared flag. Declared once at container
/// initialization alongside the compile-time default and rules registered
/// via `Registry::update_definition`; every call site narrows through the
/// same `T` rather than matching on `FlagValue` directly.
#[derive(Debug, Clone)]
pub struct Flag<T: FlagValueType> {
    id: FlagId,
    default: T,
    _marker: PhantomData<T>,
}

impl<T: FlagValueType> Flag<T> {
    pub fn new(id: FlagId, default: T) -> Self {
        Flag {
            id,
            default,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &FlagId {
        &self.id
    }

    pub fn default(&self) -> &T {
        &self.default
    }
}

/// Fast path: current snapshot, kill switch, override, then C3. Emits
/// exactly one `EvaluationMetric` per call.
pub fn evaluate<T: FlagValueType>(registry: &Registry, flag: &Flag<T>, ctx: &Context) -> T {
    evaluate_with_trace(registry, flag, ctx).0
}

/// Same fast path as `evaluate`, but also returns the full trace (decision
/// kind, matched rule index, bucket) for diagnostics and shadow comparison.
/// Returns `(value, EvaluationResult)` rather than a generic
/// `EvaluationResult<V>` -- the untyped `EvaluationResult` already carries
/// everything the trace needs, and `T` only narrows the value for the
/// caller's convenience.
pub fn evaluate_with_trace<T: FlagValueType>(
    registry: &Registry,
    flag: &Flag<T>,
    ctx: &Context,
) -> (T, EvaluationResult) {
    let start = Instant::now();
    let hooks = registry.hooks();

    // Order matches spec §4.6 exactly: kill switch, then the flag's own
    // `active` bit, then the override map, then C3. A definition's
    // `evaluate_with_trace` already returns `FlagInactive` as its very first
    // check, so routing through it here (rather than consulting the
    // override first) is what makes an inactive flag with an override set
    // still resolve to its declared default.
    let result = if registry.is_all_disabled() {
        EvaluationResult {
            value: flag.default.clone().into_value(),
            decision: Decision::ContainerDisabled,
            trace: Trace {
                flag_id: flag.id.clone(),
                note: None,
            },
        }
    } else {
        let snapshot = registry.current();
        match snapshot.get(&flag.id) {
            Some(definition) if !definition.active => definition.evaluate_with_trace(ctx),
            Some(definition) => {
                if let Some(value) = registry.override_for(&flag.id) {
                    EvaluationResult {
                        value: value.clone(),
                        decision: Decision::Override(value),
                        trace: Trace {
                            flag_id: flag.id.clone(),
                            note: None,
                        },
                    }
                } else {
                    definition.evaluate_with_trace(ctx)
                }
            }
            None => {
                if let Some(value) = registry.override_for(&flag.id) {
                    EvaluationResult {
                        value: value.clone(),
                        decision: Decision::Override(value),
                        trace: Trace {
                            flag_id: flag.id.clone(),
                            note: None,
                        },
                    }
                } else {
                    hooks.logger.warn(&format!(
                        "flag {} not present in current snapshot, returning compile-time default",
                        flag.id
                    ));
                    EvaluationResult {
                        value: flag.default.clone().into_value(),
                        decision: Decision::DefaultReturned {
                            skipped_by_ramp_up: None,
                        },
                        trace: Trace {
                            flag_id: flag.id.clone(),
                            note: None,
                        },
                    }
                }
            }
        }
    };

    let value = T::from_value(&result.value).unwrap_or_else(|| {
        hooks.logger.warn(&format!(
            "flag {} resolved to a value of the wrong kind for its declared type, using compile-time default",
            flag.id
        ));
        flag.default.clone()
    });

    hooks.metrics.record_evaluation(EvaluationMetric {
        flag_id: flag.id.clone(),
        container_id: registry.container_id().to_string(),
        decision_kind: decision_kind(&result.decision),
        platform: ctx.platform.clone(),
        duration: start.elapsed(),
    });

    (value, result)
}

fn decision_kind(decision: &Decision) -> &'static str {
    match decision {
        Decision::ContainerDisabled => "container_disabled",
        Decision::FlagInactive => "flag_inactive",
        Decision::Override(_) => "override",
        Decision::RuleMatched { .. } => "rule_matched",
        Decision::DefaultReturned { .. } => "default",
    }
}

/// Controls `evaluate_with_shadow`'s comparison behavior.
#[derive(Clone)]
pub struct ShadowOptions {
    /// When `false` (default), a `ContainerDisabled` baseline skips the
    /// candidate evaluation entirely -- there is nothing meaningful to
    /// compare a disabled container against.
    pub evaluate_candidate_when_baseline_disabled: bool,
    /// When `true`, a mismatch is also reported if baseline and candidate
    /// agree on `value` but disagree on `Decision` kind (e.g. one side hits
    /// `RuleMatched` while the other falls through to `DefaultReturned`
    /// with the same resulting value). `false` by default -- spec §4.6
    /// only compares decision kind "when enabled".
    pub compare_decision_kind: bool,
    pub on_mismatch: Option<Arc<dyn Fn(ShadowMismatch) + Send + Sync>>,
}

impl Default for ShadowOptions {
    fn default() -> Self {
        ShadowOptions {
            evaluate_candidate_when_baseline_disabled: false,
            compare_decision_kind: false,
            on_mismatch: None,
        }
    }
}

impl std::fmt::Debug for ShadowOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowOptions")
            .field(
                "evaluate_candidate_when_baseline_disabled",
                &self.evaluate_candidate_when_baseline_disabled,
            )
            .field("compare_decision_kind", &self.compare_decision_kind)
            .field("on_mismatch", &self.on_mismatch.is_some())
            .finish()
    }
}

/// Reported when the baseline and candidate registries disagree on a
/// shadowed flag. Carries the full trace on both sides so a caller can
/// distinguish a value mismatch from a decision-kind mismatch.
#[derive(Debug, Clone)]
pub struct ShadowMismatch {
    pub flag_id: FlagId,
    pub baseline: EvaluationResult,
    pub candidate: EvaluationResult,
    pub ctx_summary: String,
}

/// Evaluates `flag` against `baseline` (the registry whose value is
/// returned and whose behavior production traffic sees) and, for
/// comparison only, against `candidate`. Never lets a candidate failure or
/// disagreement affect the returned value -- this is strictly a safe way
/// to compare two registries under live traffic.
pub fn evaluate_with_shadow<T: FlagValueType>(
    baseline: &Registry,
    candidate: &Registry,
    flag: &Flag<T>,
    ctx: &Context,
    opts: &ShadowOptions,
) -> T {
    let (baseline_value, baseline_result) = evaluate_with_trace(baseline, flag, ctx);

    let skip_candidate =
        matches!(baseline_result.decision, Decision::ContainerDisabled) && !opts.evaluate_candidate_when_baseline_disabled;

    if !skip_candidate {
        let (_, candidate_result) = evaluate_with_trace(candidate, flag, ctx);
        let disagrees = baseline_result.value != candidate_result.value
            || (opts.compare_decision_kind
                && decision_kind(&baseline_result.decision) != decision_kind(&candidate_result.decision));
        if disagrees {
            let ctx_summary = summarize_context(ctx);
            let mismatch = ShadowMismatch {
                flag_id: flag.id.clone(),
                baseline: baseline_result.clone(),
                candidate: candidate_result,
                ctx_summary,
            };
            baseline.hooks().logger.warn(&format!(
                "shadow mismatch for {}: baseline={:?} candidate={:?}",
                mismatch.flag_id, mismatch.baseline.value, mismatch.candidate.value
            ));
            if let Some(on_mismatch) = &opts.on_mismatch {
                on_mismatch(mismatch);
            }
        }
    }

    baseline_value
}

fn summarize_context(ctx: &Context) -> String {
    format!(
        "platform={:?} locale={:?} stable_id={}",
        ctx.platform,
        ctx.locale,
        ctx.stable_id().map(|id| id.as_hex()).unwrap_or("<fallback>")
    )
}
