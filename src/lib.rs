//! Konditional: a feature-flag and typed-configuration evaluation engine.
//!
//! Flags are declared in source as strongly-typed [`evaluate::Flag`] handles
//! inside a named container; at runtime [`evaluate::evaluate`] resolves a
//! flag's value for a request [`context::Context`] against whatever
//! [`snapshot::Snapshot`] is currently published in a [`registry::Registry`].
//! Configuration hot-reloads from untrusted JSON through the [`parse`]
//! module: a malformed payload is rejected in full and never displaces the
//! last-known-good snapshot.

pub mod container;
pub mod context;
pub mod criteria;
pub mod error;
pub mod evaluate;
pub mod flag;
pub mod hooks;
pub mod identity;
pub mod parse;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use container::Container;
pub use context::Context;
pub use criteria::{Criterion, CustomPredicate};
pub use error::{IdentityError, ParseError};
pub use evaluate::{evaluate, evaluate_with_shadow, evaluate_with_trace, Flag, ShadowMismatch, ShadowOptions};
pub use flag::{Decision, EvaluationResult, FlagDefinition, Trace};
pub use hooks::{ConfigLoadEvent, ConfigRollbackEvent, EvaluationMetric, Hooks, Logger, MetricsCollector};
pub use identity::{FlagId, RampUp, StableId, Version};
pub use parse::{apply_patch, decode, encode, DecodeOptions, MissingDeclaredFlagStrategy, UnknownFlagKeyStrategy, Warning};
pub use registry::{Registry, RegistryConfig};
pub use rule::Rule;
pub use schema::{CompiledSchema, FieldShape, FlagSchema};
pub use snapshot::{Snapshot, SnapshotMetadata};
pub use value::{EnumValue, FlagValue, FlagValueType, ValueKind};
