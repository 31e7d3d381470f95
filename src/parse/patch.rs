use crate::error::ParseError;
use crate::identity::FlagId;
use crate::parse::decode::decode_entry;
use crate::parse::options::DecodeOptions;
use crate::parse::wire::PatchWire;
use crate::schema::CompiledSchema;
use crate::snapshot::Snapshot;

/// Applies an incremental patch to `current`, producing a new snapshot.
/// `upsertFlags` entries are decoded and inserted first, then `removeKeys`
/// are applied; a key present in both wins as a removal, since a flag that
/// is both upserted and removed in the same patch is read as "remove,
/// superseding whatever upsert also named it."
pub fn apply_patch(
    current: &Snapshot,
    patch_json: &str,
    schema: &CompiledSchema,
    options: &DecodeOptions,
) -> Result<Snapshot, ParseError> {
    let wire: PatchWire = serde_json::from_str(patch_json)?;
    let mut next = current.clone();

    for entry in wire.upsert_flags {
        let Some((_, definition)) = decode_entry(entry, schema, options)? else {
            continue;
        };
        next = next.with_flag(definition);
    }

    for raw_key in wire.remove_keys {
        let flag_id = FlagId::parse(&raw_key).map_err(|e| ParseError::InvalidSnapshot {
            reason: format!("malformed flag key {:?}: {e}", raw_key),
        })?;
        next = next.without_flag(&flag_id);
    }

    Ok(next)
}
