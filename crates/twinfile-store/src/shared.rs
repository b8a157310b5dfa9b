use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{SlotId, StoreResult};
use crate::slot::SlotWriter;
use crate::store::{DualSlotStore, StoreStatus};

/// A [`DualSlotStore`] behind a mutex, cloneable across threads.
///
/// Serializes operations within this process only. Other processes can
/// still race the probe-then-act sequence.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<DualSlotStore>>,
}

impl SharedStore {
    pub fn new(store: DualSlotStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DualSlotStore> {
        self.inner.lock().expect("store mutex poisoned")
    }

    pub fn write(&self, content: &str) -> StoreResult<SlotId> {
        self.lock().write(content)
    }

    pub fn write_with<F>(&self, producer: F) -> StoreResult<SlotId>
    where
        F: FnOnce(&mut SlotWriter) -> io::Result<()>,
    {
        self.lock().write_with(producer)
    }

    pub fn read(&self) -> StoreResult<String> {
        self.lock().read()
    }

    pub fn status(&self) -> StoreStatus {
        self.lock().status()
    }

    pub fn newest_modified_time(&self) -> Option<DateTime<Utc>> {
        self.lock().newest_modified_time()
    }

    pub fn oldest_modified_time(&self) -> Option<DateTime<Utc>> {
        self.lock().oldest_modified_time()
    }

    pub fn delete(&self) -> StoreResult<()> {
        self.lock().delete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_writers_leave_a_readable_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::new(DualSlotStore::new(dir.path().join("data"), "txt").unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    for j in 0..5 {
                        store.write(&format!("writer{i}-{j}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let value = store.read().unwrap();
        assert!(value.starts_with("writer"));
        let status = store.status();
        assert!(status.a.exists && status.b.exists);
    }

    #[test]
    fn clones_share_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::new(DualSlotStore::new(dir.path().join("data"), "txt").unwrap());
        let other = store.clone();
        store.write("shared").unwrap();
        assert_eq!(other.read().unwrap(), "shared");
        other.delete().unwrap();
        assert!(store.newest_modified_time().is_none());
    }
}
