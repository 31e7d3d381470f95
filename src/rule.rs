use std::collections::BTreeSet;

use crate::context::Context;
use crate::criteria::Criterion;
use crate::identity::{RampUp, StableId};
use crate::value::FlagValue;

/// A targeting-gated value candidate for a flag. `specificity` is cached at
/// construction time from the criteria alone -- ramp-up never contributes.
#[derive(Debug, Clone)]
pub struct Rule {
    pub value: FlagValue,
    pub criteria: Vec<Criterion>,
    pub ramp_up: RampUp,
    pub allowlist: BTreeSet<StableId>,
    pub note: Option<String>,
    specificity: i64,
}

impl Rule {
    pub fn new(
        value: FlagValue,
        criteria: Vec<Criterion>,
        ramp_up: RampUp,
        allowlist: BTreeSet<StableId>,
        note: Option<String>,
    ) -> Self {
        let specificity = criteria.iter().map(Criterion::specificity).sum();
        Rule {
            value,
            criteria,
            ramp_up,
            allowlist,
            note,
            specificity,
        }
    }

    pub fn specificity(&self) -> i64 {
        self.specificity
    }

    /// All criteria must match (logical AND).
    pub fn criteria_match(&self, ctx: &Context) -> bool {
        self.criteria.iter().all(|c| c.matches(ctx))
    }

    pub fn allows(&self, stable_id: &StableId) -> bool {
        self.allowlist.contains(stable_id)
    }
}
