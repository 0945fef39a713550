//! In-memory and file-backed session stores.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rooh_core::{CredentialUpdate, DEFAULT_NONCE_TTL_SECS, SessionCredentials, StoredSession};
use tracing::{debug, warn};

use super::SessionStore;

/// Session store kept in process memory.
#[derive(Debug)]
pub struct MemorySessionStore {
    record: Mutex<StoredSession>,
    ttl: chrono::Duration,
}

impl MemorySessionStore {
    /// Empty store with the default 10 minute nonce lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(chrono::Duration::seconds(DEFAULT_NONCE_TTL_SECS))
    }

    #[must_use]
    pub fn with_ttl(ttl: chrono::Duration) -> Self {
        Self::from_record(StoredSession::default(), ttl)
    }

    /// Store seeded with an existing record.
    #[must_use]
    pub const fn from_record(record: StoredSession, ttl: chrono::Duration) -> Self {
        Self {
            record: Mutex::new(record),
            ttl,
        }
    }

    /// Copy of the raw record, including a stale nonce.
    #[must_use]
    pub fn snapshot(&self) -> StoredSession {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoredSession> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> SessionCredentials {
        self.lock().credentials(Utc::now(), self.ttl)
    }

    fn save(&self, update: CredentialUpdate) {
        if update.is_empty() {
            return;
        }
        self.lock().merge(update, Utc::now());
    }

    fn clear(&self) {
        *self.lock() = StoredSession::default();
    }
}

/// Session store persisted as a JSON file.
///
/// The file survives restarts the way browser storage survives reloads.
/// Reads are served from memory; every change is written through. Writers
/// are serialized so the file always ends with the latest in-memory record.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    memory: MemorySessionStore,
    io: Mutex<()>,
}

impl FileSessionStore {
    /// Open the store, loading any record already at `path`.
    ///
    /// A missing or unreadable file starts an empty session.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, ttl: chrono::Duration) -> Self {
        let path = path.into();
        let record = read_record(&path).unwrap_or_default();
        Self {
            memory: MemorySessionStore::from_record(record, ttl),
            path,
            io: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_lock(&self) -> MutexGuard<'_, ()> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold the io lock.
    fn persist(&self) {
        let record = self.memory.snapshot();
        if let Err(e) = write_record(&self.path, &record) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist cart session");
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> SessionCredentials {
        self.memory.load()
    }

    fn save(&self, update: CredentialUpdate) {
        if update.is_empty() {
            return;
        }
        let _io = self.io_lock();
        self.memory.save(update);
        self.persist();
    }

    fn clear(&self) {
        let _io = self.io_lock();
        self.memory.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Cart session file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove cart session file");
            }
        }
    }
}

fn read_record(path: &Path) -> Option<StoredSession> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cart session file");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt cart session file");
            None
        }
    }
}

/// Write via a sibling temp file so a crash never leaves a half-written record.
fn write_record(path: &Path, record: &StoredSession) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "rooh-session-{name}-{}-{}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn test_memory_store_merges() {
        let store = MemorySessionStore::new();
        store.save(CredentialUpdate::from_raw(Some("t1"), Some("n1")));
        store.save(CredentialUpdate::from_raw(None, Some("n2")));

        let creds = store.load();
        assert_eq!(creds.cart_token.unwrap().as_str(), "t1");
        assert_eq!(creds.nonce.unwrap().as_str(), "n2");
    }

    #[test]
    fn test_memory_store_expired_nonce_keeps_token() {
        let store = MemorySessionStore::with_ttl(chrono::Duration::zero());
        store.save(CredentialUpdate::from_raw(Some("t1"), Some("n1")));

        let creds = store.load();
        assert!(creds.nonce.is_none());
        assert_eq!(creds.cart_token.unwrap().as_str(), "t1");
        assert!(store.snapshot().nonce.is_some());
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemorySessionStore::new();
        store.save(CredentialUpdate::from_raw(Some("t1"), Some("n1")));
        store.clear();
        assert_eq!(store.load(), SessionCredentials::default());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path("reopen");
        let ttl = chrono::Duration::minutes(10);

        let store = FileSessionStore::open(&path, ttl);
        store.save(CredentialUpdate::from_raw(Some("t1"), Some("n1")));
        drop(store);

        let reopened = FileSessionStore::open(&path, ttl);
        let creds = reopened.load();
        assert_eq!(creds.cart_token.unwrap().as_str(), "t1");
        assert_eq!(creds.nonce.unwrap().as_str(), "n1");

        reopened.clear();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileSessionStore::open(&path, chrono::Duration::minutes(10));
        assert_eq!(store.load(), SessionCredentials::default());

        store.save(CredentialUpdate::from_raw(Some("t1"), None));
        let persisted: StoredSession =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.cart_token.unwrap().as_str(), "t1");

        store.clear();
    }

    #[test]
    fn test_file_store_empty_update_does_not_write() {
        let path = temp_path("empty");
        let store = FileSessionStore::open(&path, chrono::Duration::minutes(10));
        store.save(CredentialUpdate::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_concurrent_saves_keep_latest_record() {
        let path = temp_path("concurrent");
        let ttl = chrono::Duration::minutes(10);
        let store = FileSessionStore::open(&path, ttl);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for j in 0..20 {
                        let token = format!("t{i}-{j}");
                        store.save(CredentialUpdate::from_raw(Some(&token), Some("n")));
                    }
                });
            }
        });

        let in_memory = store.load().cart_token.unwrap();
        let on_disk = FileSessionStore::open(&path, ttl).load().cart_token.unwrap();
        assert_eq!(on_disk, in_memory);
        assert!(!path.with_extension("json.tmp").exists());

        store.clear();
    }
}
