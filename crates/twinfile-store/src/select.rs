//! Slot selection over two probe snapshots.
//!
//! Both functions take the statuses of slot A and slot B, in that order, and
//! never touch the filesystem.

use chrono::{DateTime, Utc};

use crate::error::{Access, SlotId, StoreError, StoreResult};
use crate::slot::SlotStatus;

/// Pick the slot that receives the next write: the missing or older copy.
///
/// Equal timestamps resolve to slot A.
pub fn select_write_target(a: &SlotStatus, b: &SlotStatus) -> StoreResult<SlotId> {
    match (a.exists, b.exists) {
        (false, _) => Ok(SlotId::A),
        (true, false) => Ok(SlotId::B),
        (true, true) => {
            check_access(a, b, Access::Write)?;
            let (ma, mb) = ordered_times(a, b)?;
            Ok(if ma <= mb { SlotId::A } else { SlotId::B })
        }
    }
}

/// Pick the slot that answers a read: the newest existing, readable copy.
///
/// Equal timestamps resolve to slot B.
pub fn select_read_source(a: &SlotStatus, b: &SlotStatus) -> StoreResult<SlotId> {
    match (a.exists, b.exists) {
        (false, false) => Err(StoreError::NoFile),
        (true, false) => {
            a.assert_readable()?;
            Ok(SlotId::A)
        }
        (false, true) => {
            b.assert_readable()?;
            Ok(SlotId::B)
        }
        (true, true) => {
            check_access(a, b, Access::Read)?;
            let (ma, mb) = ordered_times(a, b)?;
            Ok(if ma > mb { SlotId::A } else { SlotId::B })
        }
    }
}

/// Latest timestamp among the slots that have one.
pub fn newest_modified(a: &SlotStatus, b: &SlotStatus) -> Option<DateTime<Utc>> {
    match (a.modified, b.modified) {
        (Some(ma), Some(mb)) => Some(ma.max(mb)),
        (ma, mb) => ma.or(mb),
    }
}

/// Earliest timestamp among the slots that have one.
pub fn oldest_modified(a: &SlotStatus, b: &SlotStatus) -> Option<DateTime<Utc>> {
    match (a.modified, b.modified) {
        (Some(ma), Some(mb)) => Some(ma.min(mb)),
        (ma, mb) => ma.or(mb),
    }
}

fn check_access(a: &SlotStatus, b: &SlotStatus, access: Access) -> StoreResult<()> {
    match (a.allows(access), b.allows(access)) {
        (true, true) => Ok(()),
        (false, false) => Err(StoreError::BothLocked { access }),
        (false, true) => Err(StoreError::SingleLocked {
            slot: SlotId::A,
            access,
        }),
        (true, false) => Err(StoreError::SingleLocked {
            slot: SlotId::B,
            access,
        }),
    }
}

fn ordered_times(a: &SlotStatus, b: &SlotStatus) -> StoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    match (a.modified, b.modified) {
        (Some(ma), Some(mb)) => Ok((ma, mb)),
        _ => Err(StoreError::UnknownModifiedTime),
    }
}
