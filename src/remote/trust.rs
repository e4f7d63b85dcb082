//! Trust-on-first-use store for worker identity keys

use super::WorkerError;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Known worker keys, keyed by worker URL.
///
/// Passed explicitly to the clients that need it so each run (or test) can
/// choose whether to share one.
#[derive(Debug, Default)]
pub struct TrustStore {
    keys: Mutex<HashMap<String, String>>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a trusted key
    pub fn trust(&self, worker_url: impl Into<String>, key: impl Into<String>) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.insert(worker_url.into(), key.into());
        }
    }

    pub fn trusted_key(&self, worker_url: &str) -> Option<String> {
        self.keys.lock().ok()?.get(worker_url).cloned()
    }

    /// Accept a key seen for the first time; reject a key that differs from the
    /// one already trusted
    pub fn verify(&self, worker: &str, worker_url: &str, presented: &str) -> Result<(), WorkerError> {
        let mut keys = self.keys.lock().map_err(|_| WorkerError::Protocol {
            worker: worker.to_string(),
            message: "trust store poisoned".to_string(),
        })?;

        match keys.get(worker_url) {
            Some(trusted) if trusted == presented => Ok(()),
            Some(trusted) => Err(WorkerError::Untrusted {
                worker: worker.to_string(),
                presented: presented.to_string(),
                trusted: trusted.clone(),
            }),
            None => {
                info!("Trusting key {} for worker '{}'", presented, worker);
                keys.insert(worker_url.to_string(), presented.to_string());
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.lock().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_key_is_trusted() {
        let store = TrustStore::new();
        store.verify("w1", "http://w1", "abc").unwrap();
        assert_eq!(store.trusted_key("http://w1").as_deref(), Some("abc"));
        store.verify("w1", "http://w1", "abc").unwrap();
    }

    #[test]
    fn test_changed_key_is_rejected() {
        let store = TrustStore::new();
        store.trust("http://w1", "abc");
        let err = store.verify("w1", "http://w1", "xyz").unwrap_err();
        assert!(matches!(err, WorkerError::Untrusted { .. }));
        assert_eq!(store.trusted_key("http://w1").as_deref(), Some("abc"));
    }

    #[test]
    fn test_stores_are_independent() {
        let first = TrustStore::new();
        let second = TrustStore::new();
        first.verify("w1", "http://w1", "abc").unwrap();
        assert!(second.is_empty());
        second.verify("w1", "http://w1", "xyz").unwrap();
    }
}
