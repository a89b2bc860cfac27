//! Opaque API credential slot

use std::sync::{Arc, PoisonError, RwLock};

/// Shared holder for the single API key.
///
/// Empty until configured from the environment or supplied through the
/// HTTP surface. No model request is made while it is empty.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new(initial: Option<String>) -> Self {
        let store = Self::default();
        if let Some(key) = initial {
            store.set(key);
        }
        store
    }

    /// Store a key. Blank keys clear the slot.
    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let value = if key.trim().is_empty() {
            None
        } else {
            Some(key.trim().to_string())
        };
        // A plain value cannot be left half-written by a panicking writer
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("is_set", &self.is_set())
            .finish()
    }
}
