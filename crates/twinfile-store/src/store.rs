use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{SlotId, StoreError, StoreResult};
use crate::select::{newest_modified, oldest_modified, select_read_source, select_write_target};
use crate::slot::{Slot, SlotStatus, SlotWriter};

/// Snapshot of both slots plus the aggregate timestamps.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStatus {
    pub a: SlotStatus,
    pub b: SlotStatus,
    pub newest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
}

/// One logical text value kept in two alternating files.
///
/// Every write replaces the older (or missing) copy and leaves the other one
/// untouched; every read returns the newer copy. Both slots are re-probed on
/// each operation, so the store holds no cached filesystem state.
///
/// There is no internal locking. Share one instance across threads through
/// [`SharedStore`](crate::SharedStore) or equivalent external synchronization.
#[derive(Clone, Debug)]
pub struct DualSlotStore {
    config: StoreConfig,
    a: Slot,
    b: Slot,
}

impl DualSlotStore {
    /// Store at `<base>1.<extension>` / `<base>2.<extension>` with default settings.
    pub fn new(base_path: impl Into<PathBuf>, extension: impl Into<String>) -> StoreResult<Self> {
        Self::from_config(StoreConfig::new(base_path, extension))
    }

    pub fn from_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let (path_a, path_b) = config.slot_paths();
        Ok(Self {
            a: Slot::new(SlotId::A, path_a),
            b: Slot::new(SlotId::B, path_b),
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        match id {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    fn probe(&self) -> (SlotStatus, SlotStatus) {
        (self.a.probe(), self.b.probe())
    }

    /// Probe both slots.
    pub fn status(&self) -> StoreStatus {
        let (a, b) = self.probe();
        StoreStatus {
            newest: newest_modified(&a, &b),
            oldest: oldest_modified(&a, &b),
            a,
            b,
        }
    }

    /// Slot the next write would go to.
    pub fn write_target(&self) -> StoreResult<SlotId> {
        let (a, b) = self.probe();
        select_write_target(&a, &b)
    }

    /// Slot the next read would come from.
    pub fn read_source(&self) -> StoreResult<SlotId> {
        let (a, b) = self.probe();
        select_read_source(&a, &b)
    }

    /// Replace the older copy with `content`.
    pub fn write(&self, content: &str) -> StoreResult<SlotId> {
        self.write_with(|w| w.write_all(content.as_bytes()))
    }

    /// Replace the older copy with whatever `producer` writes.
    ///
    /// The handle given to `producer` is closed on every exit path. If the
    /// producer fails, writes bytes that are not UTF-8, or the final flush or
    /// sync fails, the half-written target is removed again so that the
    /// untouched slot stays the read source, and that error is returned.
    pub fn write_with<F>(&self, producer: F) -> StoreResult<SlotId>
    where
        F: FnOnce(&mut SlotWriter) -> io::Result<()>,
    {
        let (a, b) = self.probe();
        let target = select_write_target(&a, &b)?;
        let slot = self.slot(target);
        let existed = match target {
            SlotId::A => a.exists,
            SlotId::B => b.exists,
        };
        debug!(slot = %target, path = %slot.path().display(), existed, "write target selected");

        if existed {
            slot.delete()?;
        }

        let mut writer = slot.open_for_write(self.config.sync_mode)?;
        let committed = match producer(&mut writer) {
            Ok(()) => writer.finish(),
            Err(e) => {
                drop(writer);
                Err(e.into())
            }
        };
        if let Err(e) = committed {
            discard_partial(slot, &e);
            return Err(e);
        }

        let after = slot.probe();
        debug!(slot = %target, modified = ?after.modified, "write complete");
        Ok(target)
    }

    /// Contents of the newest copy.
    pub fn read(&self) -> StoreResult<String> {
        self.read_with_source().map(|(_, content)| content)
    }

    /// Contents of the newest copy and the slot they came from.
    pub fn read_with_source(&self) -> StoreResult<(SlotId, String)> {
        let (a, b) = self.probe();
        let source = select_read_source(&a, &b)?;
        let content = self.slot(source).read_to_string()?;
        debug!(slot = %source, len = content.len(), "read complete");
        Ok((source, content))
    }

    /// Latest modification time across both slots, ignoring missing ones.
    pub fn newest_modified_time(&self) -> Option<DateTime<Utc>> {
        let (a, b) = self.probe();
        newest_modified(&a, &b)
    }

    /// Earliest modification time across both slots, ignoring missing ones.
    pub fn oldest_modified_time(&self) -> Option<DateTime<Utc>> {
        let (a, b) = self.probe();
        oldest_modified(&a, &b)
    }

    /// Remove both files. Absent files are not an error.
    ///
    /// Both removals are attempted; the first failure is returned.
    pub fn delete(&self) -> StoreResult<()> {
        let a = self.a.delete();
        let b = self.b.delete();
        a.and(b).map(|_| ())
    }
}

/// Remove a target whose write did not complete.
///
/// A failed removal is only logged; the write's own error is what the caller
/// gets back.
fn discard_partial(slot: &Slot, cause: &StoreError) {
    warn!(slot = %slot.id(), error = %cause, "write failed; discarding partial copy");
    if let Err(e) = slot.delete() {
        warn!(path = %slot.path().display(), error = %e, "could not remove partial copy");
    }
}
