use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

const SEPARATOR: &str = "::";

/// A canonical, stable key for a flag: `feature::<container>::<name>`.
///
/// Stable across snapshots: the same `FlagId` always addresses the same
/// logical flag, even as its definition is replaced by successive
/// publications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagId {
    container: String,
    name: String,
}

impl FlagId {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Result<Self, IdentityError> {
        let container = container.into();
        let name = name.into();
        validate_part(&container, "container")?;
        validate_part(&name, "name")?;
        Ok(FlagId { container, name })
    }

    /// Parses `feature::<container>::<name>`. Requires exactly three
    /// `::`-separated parts, each non-empty and itself free of `::`.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        if parts.len() != 3 || parts[0] != "feature" {
            return Err(IdentityError::InvalidFlagId {
                raw: raw.to_string(),
                reason: "expected exactly three `::`-separated parts starting with `feature`"
                    .to_string(),
            });
        }
        FlagId::new(parts[1], parts[2]).map_err(|_| IdentityError::InvalidFlagId {
            raw: raw.to_string(),
            reason: "container and name must be non-empty and free of `::`".to_string(),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self) -> String {
        format!("feature::{}::{}", self.container, self.name)
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl TryFrom<String> for FlagId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FlagId::parse(&value)
    }
}

impl From<FlagId> for String {
    fn from(id: FlagId) -> Self {
        id.render()
    }
}

fn validate_part(part: &str, label: &str) -> Result<(), IdentityError> {
    if part.is_empty() || part.contains(SEPARATOR) {
        return Err(IdentityError::InvalidFlagId {
            raw: part.to_string(),
            reason: format!("{label} must be non-empty and free of `::`"),
        });
    }
    Ok(())
}

/// Validates a container identifier in isolation (non-empty, no `::`).
pub fn validate_container_id(raw: &str) -> Result<(), IdentityError> {
    if raw.is_empty() || raw.contains(SEPARATOR) {
        return Err(IdentityError::InvalidContainerId {
            raw: raw.to_string(),
            reason: "container id must be non-empty and free of `::`".to_string(),
        });
    }
    Ok(())
}

/// Opaque bucketing identity. Canonical form is lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StableId(String);

impl StableId {
    /// Lowercases arbitrary UTF-8 (ROOT-locale case folding, i.e. plain
    /// Unicode lowercasing, no per-locale tailoring) and hex-encodes the
    /// resulting bytes.
    pub fn of(raw: &str) -> Result<Self, IdentityError> {
        if raw.trim().is_empty() {
            return Err(IdentityError::InvalidStableId {
                reason: "blank input".to_string(),
            });
        }
        let lowered = raw.to_lowercase();
        let hex = lowered
            .as_bytes()
            .iter()
            .fold(String::with_capacity(lowered.len() * 2), |mut acc, b| {
                use std::fmt::Write;
                let _ = write!(acc, "{:02x}", b);
                acc
            });
        Ok(StableId(hex))
    }

    /// Accepts a pre-canonical hex string, lowercasing it. Rejects blank
    /// input or input containing non-hex characters.
    pub fn from_hex(raw: &str) -> Result<Self, IdentityError> {
        if raw.trim().is_empty() {
            return Err(IdentityError::InvalidStableId {
                reason: "blank input".to_string(),
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdentityError::InvalidStableId {
                reason: format!("{raw:?} is not valid hex"),
            });
        }
        Ok(StableId(raw.to_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StableId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StableId::from_hex(&value)
    }
}

impl From<StableId> for String {
    fn from(id: StableId) -> Self {
        id.0
    }
}

/// `(major, minor, patch)`, all non-negative, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parses up to three dot-separated non-negative integers; missing
    /// tail elements default to 0. No component may be empty.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let invalid = |reason: &str| IdentityError::InvalidVersion {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("empty version string"));
        }
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid("at most three components are allowed"));
        }
        let mut fields = [0u64; 3];
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(invalid("components must not be empty"));
            }
            fields[i] = part
                .parse::<u64>()
                .map_err(|_| invalid("components must be non-negative integers"))?;
        }
        Ok(Version::new(fields[0], fields[1], fields[2]))
    }

    pub fn render(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl TryFrom<String> for Version {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.render()
    }
}

/// A bounded fraction in `[0.0, 100.0]` driving ramp-up gating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RampUp(f64);

impl RampUp {
    pub fn new(value: f64) -> Result<Self, IdentityError> {
        if !(0.0..=100.0).contains(&value) || value.is_nan() {
            return Err(IdentityError::InvalidRampUp { value });
        }
        Ok(RampUp(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn full() -> Self {
        RampUp(100.0)
    }

    pub fn zero() -> Self {
        RampUp(0.0)
    }

    /// `threshold = floor(ramp_up * 100)`; buckets in `[0, threshold)` pass.
    pub fn threshold(&self) -> u32 {
        (self.0 * 100.0).floor() as u32
    }
}

impl Eq for RampUp {}

impl PartialOrd for RampUp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl TryFrom<f64> for RampUp {
    type Error = IdentityError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        RampUp::new(value)
    }
}

impl From<RampUp> for f64 {
    fn from(r: RampUp) -> Self {
        r.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_id_round_trips() {
        let id = FlagId::parse("feature::payments::dark_mode").unwrap();
        assert_eq!(id.container(), "payments");
        assert_eq!(id.name(), "dark_mode");
        assert_eq!(id.render(), "feature::payments::dark_mode");
    }

    #[test]
    fn flag_id_rejects_malformed_input() {
        assert!(FlagId::parse("payments::dark_mode").is_err());
        assert!(FlagId::parse("feature::dark_mode").is_err());
        assert!(FlagId::parse("feature::::dark_mode").is_err());
        assert!(FlagId::parse("feature::payments::").is_err());
        assert!(FlagId::parse("feature::pay::ments::dark_mode").is_err());
    }

    #[test]
    fn stable_id_of_lowercases_then_hex_encodes() {
        let a = StableId::of("ABC").unwrap();
        let b = StableId::of("abc").unwrap();
        assert_eq!(a.as_hex(), b.as_hex());
        assert_eq!(a.as_hex(), "616263");
    }

    #[test]
    fn stable_id_rejects_blank() {
        assert!(StableId::of("   ").is_err());
        assert!(StableId::from_hex("").is_err());
    }

    #[test]
    fn stable_id_from_hex_lowercases() {
        let id = StableId::from_hex("ABCDEF").unwrap();
        assert_eq!(id.as_hex(), "abcdef");
    }

    #[test]
    fn version_parse_defaults_missing_tail() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn version_parse_rejects_malformed() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.").is_err());
        assert!(Version::parse("-1.2.3").is_err());
    }

    #[test]
    fn version_compares_lexicographically() {
        assert!(Version::new(1, 9, 9) < Version::new(2, 0, 0));
        assert!(Version::new(1, 2, 3) < Version::new(1, 2, 4));
    }

    #[test]
    fn ramp_up_rejects_out_of_range() {
        assert!(RampUp::new(-0.1).is_err());
        assert!(RampUp::new(100.1).is_err());
        assert!(RampUp::new(50.0).is_ok());
    }

    #[test]
    fn ramp_up_threshold_boundaries() {
        assert_eq!(RampUp::new(50.0).unwrap().threshold(), 5000);
        assert_eq!(RampUp::new(100.0).unwrap().threshold(), 10_000);
        assert_eq!(RampUp::new(0.0).unwrap().threshold(), 0);
    }
}
