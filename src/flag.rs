use sha2::{Digest, Sha256};

use crate::context::Context;
use crate::error::IdentityError;
use crate::identity::{FlagId, RampUp, StableId};
use crate::rule::Rule;
use crate::value::{FlagValue, ValueKind};

/// The fallback bucket used when a context carries no stable bucketing
/// identity. `9999 < threshold` only once `ramp_up == 100.0` (threshold
/// `10_000`), so a fallback context is excluded from any partial ramp-up
/// unless allowlisted, but is included once a rule ramps to 100%. Reproduced
/// by routing the fallback bucket through the same `bucket < threshold`
/// comparison as any concrete bucket, with no special case.
pub const FALLBACK_BUCKET: u32 = 9999;

const BUCKET_MODULUS: u64 = 10_000;

/// The decisive outcome of one evaluation. `FlagInactive`/`RuleMatched`/
/// `DefaultReturned` are produced by the pure per-flag evaluator (C3);
/// `ContainerDisabled` and `Override` are layered on by the registry-aware
/// entrypoints (C6), which check the kill switch and the override map
/// before ever consulting a flag definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    ContainerDisabled,
    FlagInactive,
    Override(FlagValue),
    RuleMatched {
        rule_index: usize,
        bucket: u32,
        ramp_up: RampUp,
    },
    DefaultReturned {
        skipped_by_ramp_up: Option<SkippedRule>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRule {
    pub rule_index: usize,
    pub bucket: u32,
    pub ramp_up: RampUp,
}

/// Diagnostic trail attached to an `EvaluationResult`. Kept intentionally
/// thin: the `Decision` already carries the load-bearing facts (rule index,
/// bucket), `Trace` adds the human-readable label for the rule that
/// decided, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub flag_id: FlagId,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub value: FlagValue,
    pub decision: Decision,
    pub trace: Trace,
}

/// Per-flag, per-container definition: the default, the precedence-sorted
/// rule list, the kill switch, and the bucketing salt.
#[derive(Debug, Clone)]
pub struct FlagDefinition {
    pub id: FlagId,
    pub default_value: FlagValue,
    rules: Vec<Rule>,
    pub active: bool,
    pub salt: String,
    value_kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("rule value kind {got} disagrees with flag {flag_id}'s declared kind {expected}")]
    ValueKindMismatch {
        flag_id: String,
        expected: ValueKind,
        got: ValueKind,
    },
}

impl FlagDefinition {
    /// Constructs a definition, sorting rules once by `(specificity DESC,
    /// declaration order ASC)` -- a stable sort on specificity alone
    /// preserves declaration order among ties, so no explicit index is
    /// needed. Rejects any rule whose value variant disagrees with the
    /// flag's declared type (invariant 3).
    pub fn new(
        id: FlagId,
        default_value: FlagValue,
        mut rules: Vec<Rule>,
        active: bool,
        salt: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let value_kind = default_value.kind();
        for rule in &rules {
            if rule.value.kind() != value_kind {
                return Err(DefinitionError::ValueKindMismatch {
                    flag_id: id.render(),
                    expected: value_kind,
                    got: rule.value.kind(),
                });
            }
        }
        rules.sort_by(|a, b| b.specificity().cmp(&a.specificity()));
        Ok(FlagDefinition {
            id,
            default_value,
            rules,
            active,
            salt: salt.into(),
            value_kind,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Pure evaluation over a context. Total: always returns a value of the
    /// declared kind. Deterministic for a fixed `(definition, context)`.
    pub fn evaluate_with_trace(&self, ctx: &Context) -> EvaluationResult {
        if !self.active {
            return EvaluationResult {
                value: self.default_value.clone(),
                decision: Decision::FlagInactive,
                trace: Trace {
                    flag_id: self.id.clone(),
                    note: None,
                },
            };
        }

        let bucket = self.bucket_for(ctx);
        let mut skipped_by_ramp_up = None;

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.criteria_match(ctx) {
                continue;
            }

            let threshold = rule.ramp_up.threshold();
            let allowlisted = ctx
                .stable_id()
                .is_some_and(|id| rule.allows(id));
            let passes = u64::from(bucket) < u64::from(threshold) || allowlisted;

            if passes {
                return EvaluationResult {
                    value: rule.value.clone(),
                    decision: Decision::RuleMatched {
                        rule_index: index,
                        bucket,
                        ramp_up: rule.ramp_up,
                    },
                    trace: Trace {
                        flag_id: self.id.clone(),
                        note: rule.note.clone(),
                    },
                };
            }

            if skipped_by_ramp_up.is_none() {
                skipped_by_ramp_up = Some(SkippedRule {
                    rule_index: index,
                    bucket,
                    ramp_up: rule.ramp_up,
                });
            }
        }

        EvaluationResult {
            value: self.default_value.clone(),
            decision: Decision::DefaultReturned { skipped_by_ramp_up },
            trace: Trace {
                flag_id: self.id.clone(),
                note: None,
            },
        }
    }

    pub fn evaluate(&self, ctx: &Context) -> FlagValue {
        self.evaluate_with_trace(ctx).value
    }

    /// `bucket = SHA-256(salt:flag_name:stable_id_hex) mod 10_000`, or the
    /// fixed fallback bucket for contexts with no stable identity. Computed
    /// once per evaluation and reused across every rule in the loop.
    fn bucket_for(&self, ctx: &Context) -> u32 {
        let Some(stable_id) = ctx.stable_id() else {
            return FALLBACK_BUCKET;
        };
        bucket_of(&self.salt, self.id.name(), stable_id)
    }
}

/// Exposed standalone so tests (and callers computing buckets ahead of
/// evaluation, e.g. for analytics) can reproduce the exact digest.
pub fn bucket_of(salt: &str, flag_name: &str, stable_id: &StableId) -> u32 {
    let msg = format!("{salt}:{flag_name}:{}", stable_id.as_hex());
    let digest = Sha256::digest(msg.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    let h64 = u64::from_be_bytes(buf);
    (h64 % BUCKET_MODULUS) as u32
}

pub fn parse_stable_id_for_bucket(raw: &str) -> Result<StableId, IdentityError> {
    StableId::from_hex(raw)
}
