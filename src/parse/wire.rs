use serde::{Deserialize, Serialize};

use crate::value::FlagValue;

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct SnapshotWire {
    pub metadata: MetadataWire,
    pub flags: Vec<FlagEntryWire>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct MetadataWire {
    pub version: Option<String>,
    #[serde(rename = "generatedAtEpochMillis")]
    pub generated_at_epoch_millis: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct FlagEntryWire {
    pub key: String,
    pub active: bool,
    pub salt: String,
    #[serde(rename = "defaultValue")]
    pub default_value: FlagValue,
    pub rules: Vec<RuleEntryWire>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct RuleEntryWire {
    pub value: FlagValue,
    #[serde(rename = "rampUp")]
    pub ramp_up: f64,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
    #[serde(default)]
    pub locales: Option<Vec<String>>,
    #[serde(rename = "versionRange", default)]
    pub version_range: Option<VersionRangeWire>,
    #[serde(default)]
    pub axes: Vec<AxisWire>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct VersionRangeWire {
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct AxisWire {
    #[serde(rename = "axisId")]
    pub axis_id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct PatchWire {
    #[serde(rename = "upsertFlags", default)]
    pub upsert_flags: Vec<FlagEntryWire>,
    #[serde(rename = "removeKeys", default)]
    pub remove_keys: Vec<String>,
}
