use std::collections::BTreeMap;

use crate::flag::FlagDefinition;
use crate::identity::FlagId;

/// Generation metadata carried alongside a snapshot's flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMetadata {
    pub version: Option<String>,
    pub generated_at_epoch_millis: i64,
}

/// An immutable, deeply-owned configuration state. Once published, a
/// snapshot is never mutated; any new state is a fresh snapshot built via
/// `Snapshot::with_flag`/`without_flag` or decoded wholesale by the parse
/// boundary.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    flags: BTreeMap<FlagId, FlagDefinition>,
}

impl Snapshot {
    pub fn new(metadata: SnapshotMetadata, flags: BTreeMap<FlagId, FlagDefinition>) -> Self {
        Snapshot { metadata, flags }
    }

    pub fn empty(generated_at_epoch_millis: i64) -> Self {
        Snapshot {
            metadata: SnapshotMetadata {
                version: None,
                generated_at_epoch_millis,
            },
            flags: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &FlagId) -> Option<&FlagDefinition> {
        self.flags.get(id)
    }

    pub fn flags(&self) -> &BTreeMap<FlagId, FlagDefinition> {
        &self.flags
    }

    pub fn flag_count(&self) -> usize {
        self.flags.len()
    }

    /// Returns a new snapshot equal to `self` with `definition` inserted or
    /// replacing the prior entry for its id. Snapshots are immutable: this
    /// never mutates `self`.
    pub fn with_flag(&self, definition: FlagDefinition) -> Snapshot {
        let mut flags = self.flags.clone();
        flags.insert(definition.id.clone(), definition);
        Snapshot {
            metadata: self.metadata.clone(),
            flags,
        }
    }

    pub fn without_flag(&self, id: &FlagId) -> Snapshot {
        let mut flags = self.flags.clone();
        flags.remove(id);
        Snapshot {
            metadata: self.metadata.clone(),
            flags,
        }
    }
}
