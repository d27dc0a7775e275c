/// In-process store implementations
///
/// Same contracts as the Postgres and Redis adapters. Used by tests and by
/// single-process deployments that do not need sessions to survive restarts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::store::credentials::{CredentialStore, Principal};
use crate::store::session::SessionStore;

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unexpected(format!("{} lock poisoned", name)))
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    principals: Mutex<HashMap<String, Principal>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, email: &str) -> Result<Option<Principal>, StorageError> {
        Ok(lock(&self.principals, "credential store")?.get(email).cloned())
    }

    async fn exists(&self, email: &str) -> Result<bool, StorageError> {
        Ok(lock(&self.principals, "credential store")?.contains_key(email))
    }

    async fn create(&self, principal: &Principal) -> Result<(), StorageError> {
        let mut principals = lock(&self.principals, "credential store")?;
        if principals.contains_key(&principal.email) {
            return Err(StorageError::UniqueViolation(format!(
                "email {} already registered",
                principal.email
            )));
        }
        principals.insert(principal.email.clone(), principal.clone());
        Ok(())
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Expiring key-value map
///
/// Expired entries read as absent. Every write also drops whatever has
/// expired, so keys that are never read again do not accumulate.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live (unexpired) keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time left before `key` expires, `None` if it is absent or expired
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now)
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("session store offline".to_string()));
        }
        lock(&self.entries, "session store")
    }

    fn live_value(entries: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.guard()?;
        Ok(Self::live_value(&mut entries, key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let mut entries = self.guard()?;
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.guard()?.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let mut entries = self.guard()?;
        Ok(Self::live_value(&mut entries, key).is_some())
    }
}
