use std::sync::Arc;

use crate::identity::FlagId;

/// How to handle an incoming flag key the compiled schema does not
/// recognize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UnknownFlagKeyStrategy {
    /// Fail the whole decode with `ParseError::FlagNotFound`.
    #[default]
    Reject,
    /// Drop the entry and continue, reporting it via `on_warning`.
    Skip,
}

/// How to handle a flag the schema declares that the payload omits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MissingDeclaredFlagStrategy {
    /// Fill the gap with the flag's compile-time declared definition.
    #[default]
    UseSourceDeclared,
    /// Fail the whole decode with `ParseError::FlagNotFound`.
    Reject,
}

/// A non-fatal divergence surfaced during a lenient decode. Warnings never
/// poison the resulting snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnknownFlagKeySkipped { flag_id: String },
    MissingDeclaredFlagFilled { flag_id: FlagId },
}

#[derive(Clone, Default)]
pub struct DecodeOptions {
    pub unknown_flag_key_strategy: UnknownFlagKeyStrategy,
    pub missing_declared_flag_strategy: MissingDeclaredFlagStrategy,
    pub on_warning: Option<Arc<dyn Fn(Warning) + Send + Sync>>,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        DecodeOptions {
            unknown_flag_key_strategy: UnknownFlagKeyStrategy::Reject,
            missing_declared_flag_strategy: MissingDeclaredFlagStrategy::Reject,
            on_warning: None,
        }
    }

    pub fn lenient() -> Self {
        DecodeOptions {
            unknown_flag_key_strategy: UnknownFlagKeyStrategy::Skip,
            missing_declared_flag_strategy: MissingDeclaredFlagStrategy::UseSourceDeclared,
            on_warning: None,
        }
    }

    pub fn with_on_warning(mut self, f: impl Fn(Warning) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Arc::new(f));
        self
    }

    pub(crate) fn warn(&self, warning: Warning) {
        if let Some(cb) = &self.on_warning {
            cb(warning);
        }
    }
}

impl std::fmt::Debug for DecodeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeOptions")
            .field("unknown_flag_key_strategy", &self.unknown_flag_key_strategy)
            .field(
                "missing_declared_flag_strategy",
                &self.missing_declared_flag_strategy,
            )
            .field("on_warning", &self.on_warning.is_some())
            .finish()
    }
}
