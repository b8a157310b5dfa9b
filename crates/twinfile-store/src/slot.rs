use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{Access, SlotId, StoreError, StoreResult};

/// Why a probe could not fully observe an existing file.
///
/// Any of these leaves the slot unreadable, unwritable, and without a
/// timestamp; the variant only says which failure it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ProbeFailure {
    /// Metadata could not be read for lack of permission.
    PermissionDenied,
    /// The file disappeared between the existence check and the metadata read.
    Vanished,
    /// The path exists but is not a regular file (or a link to one).
    NotAFile,
    /// Any other I/O failure.
    Io(#[serde(serialize_with = "serialize_kind")] io::ErrorKind),
}

fn serialize_kind<S: serde::Serializer>(kind: &io::ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

impl From<&io::Error> for ProbeFailure {
    fn from(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::Vanished,
            kind => Self::Io(kind),
        }
    }
}

/// Immutable snapshot of one slot's filesystem state, taken by [`Slot::probe`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub id: SlotId,
    pub path: PathBuf,
    pub exists: bool,
    pub readable: bool,
    pub writable: bool,
    /// Last-modified time in UTC. `None` when the file is missing or its
    /// metadata could not be read.
    pub modified: Option<DateTime<Utc>>,
    pub failure: Option<ProbeFailure>,
}

impl SlotStatus {
    /// Status of a slot whose file does not exist.
    pub fn missing(id: SlotId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            exists: false,
            readable: false,
            writable: false,
            modified: None,
            failure: None,
        }
    }

    fn unobservable(id: SlotId, path: PathBuf, failure: ProbeFailure) -> Self {
        Self {
            exists: true,
            failure: Some(failure),
            ..Self::missing(id, path)
        }
    }

    pub fn allows(&self, access: Access) -> bool {
        match access {
            Access::Read => self.readable,
            Access::Write => self.writable,
        }
    }

    pub fn assert_writable(&self) -> StoreResult<()> {
        self.assert_access(Access::Write)
    }

    pub fn assert_readable(&self) -> StoreResult<()> {
        self.assert_access(Access::Read)
    }

    fn assert_access(&self, access: Access) -> StoreResult<()> {
        if self.allows(access) {
            Ok(())
        } else {
            Err(StoreError::Access {
                path: self.path.clone(),
                access,
            })
        }
    }
}

/// One of the two physical files behind a store.
///
/// A `Slot` owns nothing but its path; the file is only created, replaced,
/// or removed by the store's operations.
#[derive(Clone, Debug)]
pub struct Slot {
    id: SlotId,
    path: PathBuf,
}

impl Slot {
    pub fn new(id: SlotId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Observe the file's existence, access, and modification time.
    ///
    /// Never fails: metadata errors on an existing file are folded into an
    /// unreadable, unwritable status with no timestamp.
    pub fn probe(&self) -> SlotStatus {
        match fs::symlink_metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return SlotStatus::missing(self.id, self.path.clone());
            }
            Err(e) => return self.probe_failed(ProbeFailure::from(&e), &e),
        }

        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) => return self.probe_failed(ProbeFailure::from(&e), &e),
        };
        if !metadata.is_file() {
            warn!(path = %self.path.display(), "slot path is not a regular file");
            return SlotStatus::unobservable(self.id, self.path.clone(), ProbeFailure::NotAFile);
        }
        let modified = match metadata.modified() {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(e) => return self.probe_failed(ProbeFailure::from(&e), &e),
        };

        SlotStatus {
            id: self.id,
            path: self.path.clone(),
            exists: true,
            readable: File::open(&self.path).is_ok(),
            writable: OpenOptions::new().write(true).open(&self.path).is_ok(),
            modified: Some(modified),
            failure: None,
        }
    }

    fn probe_failed(&self, failure: ProbeFailure, e: &io::Error) -> SlotStatus {
        warn!(path = %self.path.display(), error = %e, ?failure, "slot probe failed");
        SlotStatus::unobservable(self.id, self.path.clone(), failure)
    }

    /// Open a fresh write handle, creating or truncating the file.
    pub fn open_for_write(&self, sync_mode: SyncMode) -> StoreResult<SlotWriter> {
        let file = File::create(&self.path)?;
        Ok(SlotWriter {
            path: self.path.clone(),
            inner: Some(BufWriter::new(file)),
            sync_mode,
            utf8: Utf8Check::default(),
        })
    }

    /// Read the whole file as UTF-8 text.
    pub fn read_to_string(&self) -> StoreResult<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Remove the file. Returns `false` if it was already absent.
    pub fn delete(&self) -> StoreResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "slot deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Tracks whether the bytes written so far form valid UTF-8.
///
/// Holds back at most the 3 bytes of a character split across writes.
#[derive(Default)]
struct Utf8Check {
    pending: Vec<u8>,
}

impl Utf8Check {
    fn feed(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.pending.extend_from_slice(bytes);
        let checked = std::str::from_utf8(&self.pending).map(|_| ());
        match checked {
            Ok(()) => self.pending.clear(),
            Err(e) if e.error_len().is_none() => {
                self.pending.drain(..e.valid_up_to());
            }
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
        Ok(())
    }

    fn finish(&self) -> io::Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "content ends inside a UTF-8 character",
            ))
        }
    }
}

/// Scoped write handle for one slot.
///
/// Only UTF-8 text is accepted: a write that breaks the encoding fails with
/// `InvalidData`, and so does [`finish`](Self::finish) if the content stops
/// mid-character. `finish` flushes (and syncs, per [`SyncMode`]) and reports
/// errors. On any other exit path, including a failing producer or a panic,
/// `Drop` flushes best-effort and closes the file.
pub struct SlotWriter {
    path: PathBuf,
    inner: Option<BufWriter<File>>,
    sync_mode: SyncMode,
    utf8: Utf8Check,
}

impl SlotWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, optionally `fsync`, and close the handle.
    pub fn finish(mut self) -> StoreResult<()> {
        self.utf8.finish()?;
        if let Some(mut writer) = self.inner.take() {
            writer.flush()?;
            if matches!(self.sync_mode, SyncMode::EveryWrite) {
                writer.get_ref().sync_all()?;
            }
        }
        Ok(())
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("slot writer already finished"))
    }
}

impl Write for SlotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer()?.write(buf)?;
        self.utf8.feed(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.inner.take() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), error = %e, "flush on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_in(dir: &Path, name: &str) -> Slot {
        Slot::new(SlotId::A, dir.join(name))
    }

    #[test]
    fn probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let status = slot_in(dir.path(), "data1.txt").probe();
        assert!(!status.exists);
        assert!(!status.readable);
        assert!(!status.writable);
        assert!(status.modified.is_none());
        assert!(status.failure.is_none());
    }

    #[test]
    fn probe_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        fs::write(slot.path(), "x").unwrap();

        let status = slot.probe();
        assert!(status.exists);
        assert!(status.readable);
        assert!(status.writable);
        assert!(status.modified.is_some());
        assert!(status.failure.is_none());
    }

    #[test]
    fn probe_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        fs::create_dir(slot.path()).unwrap();

        let status = slot.probe();
        assert!(status.exists);
        assert!(!status.readable);
        assert!(!status.writable);
        assert!(status.modified.is_none());
        assert_eq!(status.failure, Some(ProbeFailure::NotAFile));
    }

    #[test]
    fn probe_does_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        fs::write(slot.path(), "keep").unwrap();
        let before = slot.probe().modified;
        let after = slot.probe().modified;
        assert_eq!(before, after);
        assert_eq!(fs::read_to_string(slot.path()).unwrap(), "keep");
    }

    #[test]
    fn assert_access_names_path() {
        let status = SlotStatus::missing(SlotId::B, "data2.txt");
        match status.assert_writable() {
            Err(StoreError::Access { path, access }) => {
                assert_eq!(path, PathBuf::from("data2.txt"));
                assert_eq!(access, Access::Write);
            }
            other => panic!("expected access error, got {other:?}"),
        }
        assert!(matches!(
            status.assert_readable(),
            Err(StoreError::Access { access: Access::Read, .. })
        ));
    }

    #[test]
    fn writer_finish_persists_content() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        let mut w = slot.open_for_write(SyncMode::EveryWrite).unwrap();
        w.write_all(b"hello").unwrap();
        w.finish().unwrap();
        assert_eq!(slot.read_to_string().unwrap(), "hello");
    }

    #[test]
    fn writer_drop_flushes_buffered_content() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        {
            let mut w = slot.open_for_write(SyncMode::OsDefault).unwrap();
            write!(w, "partial").unwrap();
        }
        assert_eq!(slot.read_to_string().unwrap(), "partial");
    }

    #[test]
    fn writer_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        let mut w = slot.open_for_write(SyncMode::OsDefault).unwrap();
        let err = w.write_all(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn writer_accepts_characters_split_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        let euro = "€".as_bytes();
        let mut w = slot.open_for_write(SyncMode::OsDefault).unwrap();
        w.write_all(&euro[..1]).unwrap();
        w.write_all(&euro[1..]).unwrap();
        w.finish().unwrap();
        assert_eq!(slot.read_to_string().unwrap(), "€");
    }

    #[test]
    fn finish_rejects_truncated_character() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        let mut w = slot.open_for_write(SyncMode::OsDefault).unwrap();
        w.write_all(&"€".as_bytes()[..2]).unwrap();
        assert!(matches!(w.finish(), Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let slot = slot_in(dir.path(), "data1.txt");
        fs::write(slot.path(), "x").unwrap();
        assert!(slot.delete().unwrap());
        assert!(!slot.delete().unwrap());
        assert!(!slot.path().exists());
    }

    #[test]
    fn probe_failure_from_io_error() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(ProbeFailure::from(&denied), ProbeFailure::PermissionDenied);
        let gone = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(ProbeFailure::from(&gone), ProbeFailure::Vanished);
        let other = io::Error::from(io::ErrorKind::Interrupted);
        assert_eq!(
            ProbeFailure::from(&other),
            ProbeFailure::Io(io::ErrorKind::Interrupted)
        );
    }
}
