use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Returned by [`IdempotentStore::create`] when the key is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyExists {
    pub key: String,
}

impl std::fmt::Display for AlreadyExists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "relation \"{}\" already exists", self.key)
    }
}

impl std::error::Error for AlreadyExists {}

/// In-memory create-if-absent registry, standing in for DDL such as
/// `CREATE TABLE ... PARTITION OF ...` racing on the same name.
#[derive(Debug, Clone, Default)]
pub struct IdempotentStore {
    // key -> participant that created it
    owners: Arc<Mutex<HashMap<String, usize>>>,
    attempts: Arc<Mutex<usize>>,
}

impl IdempotentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `key` on behalf of `participant`, failing if it already exists.
    pub fn create(&self, key: impl Into<String>, participant: usize) -> Result<(), AlreadyExists> {
        let key = key.into();
        *self.attempts.lock() += 1;

        let mut owners = self.owners.lock();
        if owners.contains_key(&key) {
            return Err(AlreadyExists { key });
        }
        owners.insert(key, participant);
        Ok(())
    }

    pub fn owner(&self, key: &str) -> Option<usize> {
        self.owners.lock().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.lock().is_empty()
    }

    /// Total `create` calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}
