use std::collections::BTreeSet;

use crate::criteria::Criterion;
use crate::error::ParseError;
use crate::parse::wire::{AxisWire, FlagEntryWire, MetadataWire, RuleEntryWire, SnapshotWire, VersionRangeWire};
use crate::rule::Rule;
use crate::snapshot::Snapshot;

/// Encodes a trusted snapshot back to wire JSON. Field order within every
/// object is deterministic (lexicographic by key) because we serialize
/// through `serde_json::Value`, whose `Map` is BTreeMap-backed by default;
/// array order (flags, rules) is preserved as stored. `Criterion::Custom`
/// is never emitted: custom predicates are source-declared only.
pub fn encode(snapshot: &Snapshot) -> Result<String, ParseError> {
    let wire = SnapshotWire {
        metadata: MetadataWire {
            version: snapshot.metadata.version.clone(),
            generated_at_epoch_millis: snapshot.metadata.generated_at_epoch_millis,
        },
        flags: snapshot
            .flags()
            .values()
            .map(|def| FlagEntryWire {
                key: def.id.render(),
                active: def.active,
                salt: def.salt.clone(),
                default_value: def.default_value.clone(),
                rules: def.rules().iter().map(rule_to_wire).collect(),
            })
            .collect(),
    };

    let value = serde_json::to_value(&wire)?;
    Ok(serde_json::to_string(&value)?)
}

fn rule_to_wire(rule: &Rule) -> RuleEntryWire {
    let mut platforms: Option<BTreeSet<String>> = None;
    let mut locales: Option<BTreeSet<String>> = None;
    let mut version_range: Option<VersionRangeWire> = None;
    let mut axes = Vec::new();

    for criterion in &rule.criteria {
        match criterion {
            Criterion::Platforms(set) => {
                platforms.get_or_insert_with(BTreeSet::new).extend(set.iter().cloned());
            }
            Criterion::Locales(set) => {
                locales.get_or_insert_with(BTreeSet::new).extend(set.iter().cloned());
            }
            Criterion::VersionRange { min, max } => {
                version_range = Some(VersionRangeWire {
                    min: min.map(|v| v.render()),
                    max: max.map(|v| v.render()),
                });
            }
            Criterion::Axis(axis_id, values) => {
                axes.push(AxisWire {
                    axis_id: axis_id.clone(),
                    values: values.iter().cloned().collect(),
                });
            }
            Criterion::Custom { .. } => {}
        }
    }

    RuleEntryWire {
        value: rule.value.clone(),
        ramp_up: rule.ramp_up.value(),
        allowlist: rule.allowlist.iter().map(|id| id.as_hex().to_string()).collect(),
        note: rule.note.clone(),
        platforms: platforms.map(|s| s.into_iter().collect()),
        locales: locales.map(|s| s.into_iter().collect()),
        version_range,
        axes,
    }
}
