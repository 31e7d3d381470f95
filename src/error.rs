use thiserror::Error;

use crate::identity::FlagId;

/// Failures from the value & identity layer (C1): malformed ids, versions,
/// stable ids, and out-of-range ramp-ups. Never escapes as a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid flag id {raw:?}: {reason}")]
    InvalidFlagId { raw: String, reason: String },
    #[error("invalid container id {raw:?}: {reason}")]
    InvalidContainerId { raw: String, reason: String },
    #[error("invalid stable id: {reason}")]
    InvalidStableId { reason: String },
    #[error("invalid version {raw:?}: {reason}")]
    InvalidVersion { raw: String, reason: String },
    #[error("invalid ramp-up {value}: must be within [0.0, 100.0]")]
    InvalidRampUp { value: f64 },
}

/// Closed set of failures the parse boundary (C5) can return. A failed
/// decode never mutates the registry: the last-published snapshot is
/// untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid json: {reason}")]
    InvalidJson { reason: String },
    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },
    #[error("flag not found: {flag_id}")]
    FlagNotFound { flag_id: String },
    #[error("type mismatch for {flag_id}: expected {expected}, got {got}")]
    TypeMismatch {
        flag_id: String,
        expected: String,
        got: String,
    },
    #[error("invalid version {raw:?}: {reason}")]
    InvalidVersion { raw: String, reason: String },
    #[error("invalid ramp-up {value}")]
    InvalidRampUp { value: f64 },
    #[error("invalid stable id: {reason}")]
    InvalidStableId { reason: String },
    #[error("schema violation for {flag_id}, field {field}: {reason}")]
    SchemaViolation {
        flag_id: String,
        field: String,
        reason: String,
    },
}

impl ParseError {
    /// Prefixes `InvalidJson`/`InvalidSnapshot` with the owning container's
    /// identity, without changing the error's kind.
    pub fn with_container(self, container_id: &str) -> ParseError {
        match self {
            ParseError::InvalidJson { reason } => ParseError::InvalidJson {
                reason: format!("container='{container_id}': {reason}"),
            },
            ParseError::InvalidSnapshot { reason } => ParseError::InvalidSnapshot {
                reason: format!("container='{container_id}': {reason}"),
            },
            other => other,
        }
    }

    pub(crate) fn flag_not_found(id: &FlagId) -> ParseError {
        ParseError::FlagNotFound {
            flag_id: id.render(),
        }
    }
}

impl From<IdentityError> for ParseError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidFlagId { raw, reason } => {
                ParseError::InvalidSnapshot {
                    reason: format!("invalid flag id {raw:?}: {reason}"),
                }
            }
            IdentityError::InvalidContainerId { raw, reason } => ParseError::InvalidSnapshot {
                reason: format!("invalid container id {raw:?}: {reason}"),
            },
            IdentityError::InvalidStableId { reason } => ParseError::InvalidStableId { reason },
            IdentityError::InvalidVersion { raw, reason } => {
                ParseError::InvalidVersion { raw, reason }
            }
            IdentityError::InvalidRampUp { value } => ParseError::InvalidRampUp { value },
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::InvalidJson {
            reason: e.to_string(),
        }
    }
}
