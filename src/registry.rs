use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::flag::FlagDefinition;
use crate::hooks::{ConfigLoadEvent, ConfigRollbackEvent, Hooks};
use crate::identity::FlagId;
use crate::snapshot::Snapshot;
use crate::value::FlagValue;

/// Tunables fixed at container construction and immutable thereafter.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How many prior snapshots `rollback` can reach back through. A
    /// `load` past this depth silently drops the oldest entry (FIFO).
    pub history_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig { history_capacity: 16 }
    }
}

struct RegistryState {
    current: ArcSwap<Snapshot>,
    history: Mutex<Vec<Arc<Snapshot>>>,
    write_lock: Mutex<()>,
    overrides: Mutex<HashMap<FlagId, FlagValue>>,
    all_disabled: std::sync::atomic::AtomicBool,
    generation: std::sync::atomic::AtomicU64,
}

/// The atomic, hot-reloadable store of one container's configuration.
/// Readers call `current()` and pay only an `ArcSwap` load, never a lock;
/// every mutating operation (`load`, `rollback`, `update_definition`) is
/// serialized through a single writer mutex so they never interleave with
/// each other: publication is linearizable.
pub struct Registry {
    container_id: String,
    config: RegistryConfig,
    state: RegistryState,
    hooks: Mutex<Hooks>,
}

impl Registry {
    pub fn new(container_id: impl Into<String>, initial: Snapshot, config: RegistryConfig) -> Self {
        Registry {
            container_id: container_id.into(),
            config,
            state: RegistryState {
                current: ArcSwap::from_pointee(initial),
                history: Mutex::new(Vec::new()),
                write_lock: Mutex::new(()),
                overrides: Mutex::new(HashMap::new()),
                all_disabled: std::sync::atomic::AtomicBool::new(false),
                generation: std::sync::atomic::AtomicU64::new(0),
            },
            hooks: Mutex::new(Hooks::default()),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Wait-free: a single atomic pointer load.
    pub fn current(&self) -> Arc<Snapshot> {
        self.state.current.load_full()
    }

    pub fn set_hooks(&self, hooks: Hooks) {
        *self.hooks.lock() = hooks;
    }

    /// Publishes `snapshot` as current, pushing the prior snapshot onto a
    /// bounded history ring (oldest dropped first once `history_capacity`
    /// is exceeded). Linearizes with every other writer via `write_lock`.
    pub fn load(&self, snapshot: Snapshot) {
        let start = Instant::now();
        let _guard = self.state.write_lock.lock();
        let flag_count = snapshot.flag_count();
        let previous = self.state.current.swap(Arc::new(snapshot));

        let mut history = self.state.history.lock();
        history.push(previous);
        if history.len() > self.config.history_capacity {
            history.remove(0);
        }

        let generation = self
            .state
            .generation
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;

        self.hooks.lock().metrics.record_config_load(ConfigLoadEvent {
            container_id: self.container_id.clone(),
            flag_count,
            generation,
            duration: start.elapsed(),
        });
    }

    /// Restores the snapshot from `steps` publications ago (1 = the one
    /// immediately prior to current). Returns `false` without effect if
    /// history doesn't reach back that far; never returns an error, as
    /// specified.
    pub fn rollback(&self, steps: usize) -> bool {
        let _guard = self.state.write_lock.lock();
        let succeeded = {
            let mut history = self.state.history.lock();
            if steps == 0 || steps > history.len() {
                false
            } else {
                let index = history.len() - steps;
                let target = history[index].clone();
                history.truncate(index);
                self.state.current.store(target);
                true
            }
        };

        self.hooks.lock().metrics.record_config_rollback(ConfigRollbackEvent {
            container_id: self.container_id.clone(),
            steps,
            succeeded,
        });
        succeeded
    }

    /// Replaces a single flag's definition in place, without disturbing
    /// history (this is a targeted edit, not a full republication).
    pub fn update_definition(&self, definition: FlagDefinition) {
        let _guard = self.state.write_lock.lock();
        let current = self.state.current.load();
        let updated = current.with_flag(definition);
        self.state.current.store(Arc::new(updated));
    }

    /// Global kill switch: while set, every flag in the container resolves
    /// via `Decision::ContainerDisabled` regardless of its own `active`
    /// flag or rules.
    pub fn disable_all(&self) {
        self.state.all_disabled.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn enable_all(&self) {
        self.state.all_disabled.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_all_disabled(&self) -> bool {
        self.state.all_disabled.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Forces every evaluation of `flag_id` to `value` until cleared,
    /// bypassing rules and ramp-up entirely (`Decision::Override`).
    pub fn set_override(&self, flag_id: FlagId, value: FlagValue) {
        self.state.overrides.lock().insert(flag_id, value);
    }

    pub fn clear_override(&self, flag_id: &FlagId) {
        self.state.overrides.lock().remove(flag_id);
    }

    pub(crate) fn override_for(&self, flag_id: &FlagId) -> Option<FlagValue> {
        self.state.overrides.lock().get(flag_id).cloned()
    }

    pub(crate) fn hooks(&self) -> Hooks {
        self.hooks.lock().clone()
    }
}
