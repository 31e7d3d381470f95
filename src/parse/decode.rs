use std::collections::{BTreeMap, BTreeSet};

use serde_json::Map;

use crate::criteria::Criterion;
use crate::error::ParseError;
use crate::flag::FlagDefinition;
use crate::identity::{FlagId, RampUp, StableId, Version};
use crate::parse::options::{DecodeOptions, MissingDeclaredFlagStrategy, UnknownFlagKeyStrategy, Warning};
use crate::parse::wire::{FlagEntryWire, MetadataWire, RuleEntryWire, SnapshotWire};
use crate::rule::Rule;
use crate::schema::CompiledSchema;
use crate::snapshot::{Snapshot, SnapshotMetadata};
use crate::value::{FlagValue, StructValue};

/// Decodes untrusted JSON into a trusted `Snapshot`, or a typed failure.
/// Never panics, never partially applies: on any error the caller's
/// existing registry state is untouched (callers compose this with
/// `Registry::load` only on `Ok`).
pub fn decode(json: &str, schema: &CompiledSchema, options: &DecodeOptions) -> Result<Snapshot, ParseError> {
    let wire: SnapshotWire = serde_json::from_str(json)?;
    decode_wire(wire, schema, options)
}

fn decode_wire(
    wire: SnapshotWire,
    schema: &CompiledSchema,
    options: &DecodeOptions,
) -> Result<Snapshot, ParseError> {
    let metadata = decode_metadata(wire.metadata);
    let mut flags: BTreeMap<FlagId, FlagDefinition> = BTreeMap::new();

    for entry in wire.flags {
        if let Some((flag_id, definition)) = decode_entry(entry, schema, options)? {
            flags.insert(flag_id, definition);
        }
    }

    for id in schema.ids() {
        if flags.contains_key(id) {
            continue;
        }
        match options.missing_declared_flag_strategy {
            MissingDeclaredFlagStrategy::UseSourceDeclared => {
                let declared = schema.get(id).expect("id came from schema.ids()").source_declared.clone();
                options.warn(Warning::MissingDeclaredFlagFilled { flag_id: id.clone() });
                flags.insert(id.clone(), declared);
            }
            MissingDeclaredFlagStrategy::Reject => return Err(ParseError::flag_not_found(id)),
        }
    }

    Ok(Snapshot::new(metadata, flags))
}

/// Decodes a single flag entry against the compiled schema, honoring
/// `UnknownFlagKeyStrategy` (returns `Ok(None)` to signal "skip"). Shared by
/// whole-snapshot decode and incremental patch application, so both paths
/// apply identical validation to an upserted flag.
pub(crate) fn decode_entry(
    entry: FlagEntryWire,
    schema: &CompiledSchema,
    options: &DecodeOptions,
) -> Result<Option<(FlagId, FlagDefinition)>, ParseError> {
    let flag_id = FlagId::parse(&entry.key).map_err(|e| ParseError::InvalidSnapshot {
        reason: format!("malformed flag key {:?}: {e}", entry.key),
    })?;

    let Some(flag_schema) = schema.get(&flag_id) else {
        return match options.unknown_flag_key_strategy {
            UnknownFlagKeyStrategy::Reject => Err(ParseError::flag_not_found(&flag_id)),
            UnknownFlagKeyStrategy::Skip => {
                options.warn(Warning::UnknownFlagKeySkipped {
                    flag_id: flag_id.render(),
                });
                Ok(None)
            }
        };
    };

    let default_value = decode_typed_value(entry.default_value, &flag_id, "defaultValue", flag_schema)?;
    if default_value.kind() != flag_schema.value_kind() {
        return Err(ParseError::TypeMismatch {
            flag_id: flag_id.render(),
            expected: flag_schema.value_kind().to_string(),
            got: default_value.kind().to_string(),
        });
    }

    let mut rules = Vec::with_capacity(entry.rules.len());
    for (index, rule_wire) in entry.rules.into_iter().enumerate() {
        rules.push(decode_rule(rule_wire, &flag_id, index, flag_schema)?);
    }

    let definition = FlagDefinition::new(flag_id.clone(), default_value, rules, entry.active, entry.salt)
        .map_err(|e| ParseError::InvalidSnapshot {
            reason: e.to_string(),
        })?;
    Ok(Some((flag_id, definition)))
}

fn decode_metadata(wire: MetadataWire) -> SnapshotMetadata {
    SnapshotMetadata {
        version: wire.version,
        generated_at_epoch_millis: wire.generated_at_epoch_millis,
    }
}

fn decode_typed_value(
    value: FlagValue,
    flag_id: &FlagId,
    field: &str,
    flag_schema: &crate::schema::FlagSchema,
) -> Result<FlagValue, ParseError> {
    if let (FlagValue::Struct(ref sv), Some(shape)) = (&value, &flag_schema.struct_shape) {
        shape.validate(&struct_value_to_json(sv), flag_id, field)?;
    }
    Ok(value)
}

fn struct_value_to_json(sv: &StructValue) -> serde_json::Value {
    serde_json::Value::Object(Map::from_iter(sv.iter().map(|(k, v)| (k.clone(), v.clone()))))
}

fn decode_rule(
    wire: RuleEntryWire,
    flag_id: &FlagId,
    index: usize,
    flag_schema: &crate::schema::FlagSchema,
) -> Result<Rule, ParseError> {
    let value = decode_typed_value(wire.value, flag_id, &format!("rules[{index}].value"), flag_schema)?;
    if value.kind() != flag_schema.value_kind() {
        return Err(ParseError::TypeMismatch {
            flag_id: flag_id.render(),
            expected: flag_schema.value_kind().to_string(),
            got: value.kind().to_string(),
        });
    }

    let ramp_up = RampUp::new(wire.ramp_up).map_err(|_| ParseError::InvalidRampUp { value: wire.ramp_up })?;

    let mut allowlist = BTreeSet::new();
    for raw in wire.allowlist {
        let id = StableId::from_hex(&raw).map_err(|e| ParseError::InvalidStableId {
            reason: e.to_string(),
        })?;
        allowlist.insert(id);
    }

    let mut criteria = Vec::new();
    if let Some(platforms) = wire.platforms {
        criteria.push(Criterion::Platforms(platforms.into_iter().collect()));
    }
    if let Some(locales) = wire.locales {
        criteria.push(Criterion::Locales(locales.into_iter().collect()));
    }
    if let Some(range) = wire.version_range {
        let min = parse_optional_version(range.min)?;
        let max = parse_optional_version(range.max)?;
        criteria.push(Criterion::VersionRange { min, max });
    }
    for axis in wire.axes {
        criteria.push(Criterion::Axis(axis.axis_id, axis.values.into_iter().collect()));
    }

    if let Some(note) = &wire.note {
        if let Some(extra) = flag_schema.extra_criteria_by_note.get(note) {
            criteria.extend(extra.iter().cloned());
        }
    }

    Ok(Rule::new(value, criteria, ramp_up, allowlist, wire.note))
}

fn parse_optional_version(raw: Option<String>) -> Result<Option<Version>, ParseError> {
    match raw {
        None => Ok(None),
        Some(s) => Version::parse(&s)
            .map(Some)
            .map_err(|e| ParseError::InvalidVersion {
                raw: s,
                reason: e.to_string(),
            }),
    }
}
