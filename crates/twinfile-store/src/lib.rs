//! Crash-tolerant storage of one text value in two alternating files.
//!
//! A logical file `<base>.<ext>` is kept as two physical files,
//! `<base>1.<ext>` and `<base>2.<ext>`. Writes always replace the older copy,
//! so an interrupted or corrupted write never destroys the only committed
//! value: the other file still holds the previous one.
//!
//! # Modules
//!
//! - [`slot`] -- one physical file: probing, scoped write handle, deletion
//! - [`select`] -- pure write-target / read-source decision over two snapshots
//! - [`store`] -- [`DualSlotStore`], the read/write/delete operations
//! - [`shared`] -- [`SharedStore`], a mutex-guarded handle for multi-threaded use
//! - [`config`] -- [`StoreConfig`] and [`SyncMode`], loadable from TOML
//! - [`error`] -- [`StoreError`] and the slot/access identifiers it reports
//!
//! # Design Rules
//!
//! 1. At least one slot holds a complete committed value at all times,
//!    except for the target slot during a write, when the other one does.
//! 2. A missing slot is always the write target. When both files exist
//!    but either lacks a modification time, reads and writes both refuse.
//! 3. Equal modification times send writes to slot A.
//! 4. Probe failures never raise; only a blocked operation does.
//! 5. Nothing is retried and nothing is locked across processes.

pub mod config;
pub mod error;
pub mod select;
pub mod shared;
pub mod slot;
pub mod store;

pub use config::{StoreConfig, SyncMode};
pub use error::{Access, SlotId, StoreError, StoreResult};
pub use select::{select_read_source, select_write_target};
pub use shared::SharedStore;
pub use slot::{ProbeFailure, Slot, SlotStatus, SlotWriter};
pub use store::{DualSlotStore, StoreStatus};
