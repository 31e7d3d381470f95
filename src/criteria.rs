use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::identity::Version;

/// An opaque, non-serializable predicate supplied at source-declaration
/// time. Custom predicates are merged with serialized criteria at decode
/// time by rule key (the rule's `note`); they are never instantiated from
/// JSON. Implementations must be pure over their inputs -- a predicate that
/// reads mutable state outside `Context` breaks the evaluator's determinism
/// contract, and that is the caller's bug, not the engine's.
pub trait CustomPredicate: fmt::Debug + Send + Sync {
    fn matches(&self, ctx: &Context) -> bool;
}

/// A criterion that targets a subset of requests. A rule matches iff every
/// one of its criteria matches (logical AND); each criterion also
/// contributes to the rule's cached specificity score.
#[derive(Clone)]
pub enum Criterion {
    Platforms(BTreeSet<String>),
    Locales(BTreeSet<String>),
    VersionRange {
        min: Option<Version>,
        max: Option<Version>,
    },
    Axis(String, BTreeSet<String>),
    Custom {
        name: String,
        predicate: Arc<dyn CustomPredicate>,
        declared_specificity: i64,
    },
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Platforms(s) => f.debug_tuple("Platforms").field(s).finish(),
            Criterion::Locales(s) => f.debug_tuple("Locales").field(s).finish(),
            Criterion::VersionRange { min, max } => f
                .debug_struct("VersionRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Criterion::Axis(axis, s) => f.debug_tuple("Axis").field(axis).field(s).finish(),
            Criterion::Custom { name, .. } => f.debug_tuple("Custom").field(name).finish(),
        }
    }
}

impl Criterion {
    pub fn matches(&self, ctx: &Context) -> bool {
        match self {
            Criterion::Platforms(set) => {
                !set.is_empty()
                    && ctx
                        .platform
                        .as_ref()
                        .is_some_and(|p| set.contains(p.as_str()))
            }
            Criterion::Locales(set) => {
                !set.is_empty()
                    && ctx.locale.as_ref().is_some_and(|l| set.contains(l.as_str()))
            }
            Criterion::VersionRange { min, max } => match &ctx.app_version {
                None => false,
                Some(v) => min.as_ref().is_none_or(|m| v >= m) && max.as_ref().is_none_or(|m| v <= m),
            },
            Criterion::Axis(axis_id, set) => ctx
                .axes
                .get(axis_id)
                .is_some_and(|value| set.contains(value.as_str())),
            Criterion::Custom { predicate, .. } => predicate.matches(ctx),
        }
    }

    pub fn specificity(&self) -> i64 {
        match self {
            Criterion::Platforms(set) => i64::from(!set.is_empty()),
            Criterion::Locales(set) => i64::from(!set.is_empty()),
            Criterion::VersionRange { min, max } => i64::from(min.is_some() || max.is_some()),
            Criterion::Axis(_, _) => 1,
            Criterion::Custom {
                declared_specificity,
                ..
            } => *declared_specificity,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Criterion::Platforms(_) => "platforms",
            Criterion::Locales(_) => "locales",
            Criterion::VersionRange { .. } => "version_range",
            Criterion::Axis(_, _) => "axis",
            Criterion::Custom { .. } => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_ios() -> Context {
        Context::new().with_platform("ios")
    }

    #[test]
    fn platforms_requires_non_empty_set_and_membership() {
        let empty = Criterion::Platforms(BTreeSet::new());
        assert!(!empty.matches(&ctx_ios()));

        let mut set = BTreeSet::new();
        set.insert("ios".to_string());
        let crit = Criterion::Platforms(set);
        assert!(crit.matches(&ctx_ios()));
        assert!(!crit.matches(&Context::new().with_platform("android")));
        assert_eq!(crit.specificity(), 1);
    }

    #[test]
    fn version_range_bounds_are_inclusive() {
        let crit = Criterion::VersionRange {
            min: Some(Version::new(1, 0, 0)),
            max: Some(Version::new(2, 0, 0)),
        };
        assert!(crit.matches(&Context::new().with_app_version(Version::new(1, 0, 0))));
        assert!(crit.matches(&Context::new().with_app_version(Version::new(2, 0, 0))));
        assert!(!crit.matches(&Context::new().with_app_version(Version::new(2, 0, 1))));
        assert!(!crit.matches(&Context::new()));
    }

    #[test]
    fn axis_requires_presence_and_membership() {
        let mut values = BTreeSet::new();
        values.insert("vip".to_string());
        let crit = Criterion::Axis("cohort".to_string(), values);
        assert!(crit.matches(&Context::new().with_axis("cohort", "vip")));
        assert!(!crit.matches(&Context::new().with_axis("cohort", "standard")));
        assert!(!crit.matches(&Context::new()));
    }

    #[derive(Debug)]
    struct AlwaysTrue;
    impl CustomPredicate for AlwaysTrue {
        fn matches(&self, _ctx: &Context) -> bool {
            true
        }
    }

    #[test]
    fn custom_predicate_uses_declared_specificity() {
        let crit = Criterion::Custom {
            name: "is_internal_tester".to_string(),
            predicate: Arc::new(AlwaysTrue),
            declared_specificity: 5,
        };
        assert!(crit.matches(&Context::new()));
        assert_eq!(crit.specificity(), 5);
    }
}
