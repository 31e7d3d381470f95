use std::collections::HashMap;

use crate::identity::{StableId, Version};

/// The evaluation input: platform, locale, app version, and a stable
/// bucketing identity, plus an optional map of axis id to axis value id.
///
/// Host applications that need to evaluate `Criterion::Custom` predicates
/// over domain fields not modeled here (e.g. account tier, organization id)
/// are expected to extend their own request type and construct a `Context`
/// from it; custom predicates receive the same `Context` as any other
/// criterion.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub locale: Option<String>,
    pub platform: Option<String>,
    pub app_version: Option<Version>,
    stable_id: StableIdentity,
    pub axes: HashMap<String, String>,
}

/// A context's bucketing identity is either a concrete stable id, or an
/// explicit fallback marker for contexts with no stable identity available.
/// Both states are represented so the bucket-9999 rule in the evaluator has
/// a single, unambiguous trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum StableIdentity {
    #[default]
    Fallback,
    Concrete(StableId),
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_app_version(mut self, version: Version) -> Self {
        self.app_version = Some(version);
        self
    }

    pub fn with_stable_id(mut self, id: StableId) -> Self {
        self.stable_id = StableIdentity::Concrete(id);
        self
    }

    pub fn with_axis(mut self, axis_id: impl Into<String>, value_id: impl Into<String>) -> Self {
        self.axes.insert(axis_id.into(), value_id.into());
        self
    }

    /// `None` when the context carries no stable bucketing identity (the
    /// caller never set one, or explicitly marked it as fallback).
    pub fn stable_id(&self) -> Option<&StableId> {
        match &self.stable_id {
            StableIdentity::Concrete(id) => Some(id),
            StableIdentity::Fallback => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.stable_id, StableIdentity::Fallback)
    }
}
