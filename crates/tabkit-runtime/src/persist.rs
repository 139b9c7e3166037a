//! Debounced background persistence.
//!
//! [`PersistWorker`] owns a dedicated thread and a single pending payload per
//! blob key. Every scheduled write replaces the pending payload for its key
//! and restarts the quiet-period timer; the store is only touched once no new
//! write has arrived for the debounce interval.
//!
//! # Coalescing Rules
//!
//! - **Write** messages are coalesced per key: only the latest payload is
//!   stored.
//! - **Flush** writes everything pending immediately and acknowledges.
//! - **Shutdown** (also sent on drop) performs a final flush and ends the
//!   thread; the caller joins it.
//!
//! Store failures are logged and the cycle is skipped. The next scheduled
//! write is the retry.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::store::BlobStore;

/// Messages sent from the shell to the persistence thread.
#[derive(Debug)]
enum PersistMsg {
    Write { key: String, payload: String },
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Handle to the persistence thread.
pub struct PersistWorker {
    sender: mpsc::Sender<PersistMsg>,
    handle: Option<JoinHandle<()>>,
    debounce: Duration,
}

impl std::fmt::Debug for PersistWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistWorker")
            .field("debounce", &self.debounce)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl PersistWorker {
    /// Spawn the worker thread.
    pub fn start(store: Arc<dyn BlobStore>, debounce: Duration) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<PersistMsg>();
        let handle = thread::Builder::new()
            .name("tabkit-persist".into())
            .spawn(move || persist_loop(store.as_ref(), &rx, debounce))?;
        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "persistence worker started");
        Ok(Self {
            sender: tx,
            handle: Some(handle),
            debounce,
        })
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Queue `payload` for `key`, superseding any pending payload for it.
    pub fn schedule(&self, key: &str, payload: String) {
        let msg = PersistMsg::Write {
            key: key.to_string(),
            payload,
        };
        if self.sender.send(msg).is_err() {
            tracing::warn!(key, "persistence worker is gone; write dropped");
        }
    }

    /// Write everything pending now and wait for the store calls to finish.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.sender.send(PersistMsg::Flush(ack_tx)).is_err() {
            tracing::warn!("persistence worker is gone; flush skipped");
            return;
        }
        let _ = ack_rx.recv();
    }

    /// Final flush, then stop and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.sender.send(PersistMsg::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("persistence worker panicked");
        }
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn persist_loop(store: &dyn BlobStore, rx: &mpsc::Receiver<PersistMsg>, debounce: Duration) {
    let mut pending: BTreeMap<String, String> = BTreeMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let received = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
        };

        match received {
            Ok(PersistMsg::Write { key, payload }) => {
                let _ = pending.insert(key, payload);
                deadline = Some(Instant::now() + debounce);
            }
            Ok(PersistMsg::Flush(ack)) => {
                write_pending(store, &mut pending);
                deadline = None;
                let _ = ack.send(());
            }
            Ok(PersistMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                write_pending(store, &mut pending);
                tracing::debug!("persistence worker stopped");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {
                write_pending(store, &mut pending);
                deadline = None;
            }
        }
    }
}

fn write_pending(store: &dyn BlobStore, pending: &mut BTreeMap<String, String>) {
    for (key, payload) in std::mem::take(pending) {
        match store.save(&key, &payload) {
            Ok(()) => tracing::debug!(key = %key, bytes = payload.len(), store = store.name(), "blob persisted"),
            Err(err) => tracing::warn!(key = %key, error = %err, "blob write failed; will retry on next change"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    fn worker(store: &MemoryBlobStore, debounce_ms: u64) -> PersistWorker {
        PersistWorker::start(Arc::new(store.clone()), Duration::from_millis(debounce_ms))
            .expect("spawn worker")
    }

    #[test]
    fn rapid_writes_coalesce_into_one_save() {
        let store = MemoryBlobStore::new();
        let worker = worker(&store, 10_000);
        for n in 0..20 {
            worker.schedule("tabManager", format!("{{\"n\":{n}}}"));
        }
        worker.flush();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.get("tabManager").as_deref(), Some("{\"n\":19}"));
    }

    #[test]
    fn separate_keys_each_get_written() {
        let store = MemoryBlobStore::new();
        let worker = worker(&store, 10_000);
        worker.schedule("tabManager", "a".into());
        worker.schedule("panelLayout", "b".into());
        worker.flush();
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn quiet_period_triggers_write() {
        let store = MemoryBlobStore::new();
        let worker = worker(&store, 20);
        worker.schedule("tabManager", "x".into());
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.save_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(store.get("tabManager").as_deref(), Some("x"));
        drop(worker);
    }

    #[test]
    fn shutdown_flushes_pending_write() {
        let store = MemoryBlobStore::new();
        let worker = worker(&store, 60_000);
        worker.schedule("tabManager", "final".into());
        worker.shutdown();
        assert_eq!(store.get("tabManager").as_deref(), Some("final"));
    }

    #[test]
    fn flush_with_nothing_pending_is_noop() {
        let store = MemoryBlobStore::new();
        let worker = worker(&store, 50);
        worker.flush();
        assert_eq!(store.save_count(), 0);
    }
}
