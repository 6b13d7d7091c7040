//! Secure session storage capability.
//!
//! The store holds exactly two logical entries: the bearer token under
//! [`AUTH_TOKEN_KEY`] and the serialized identity under [`USER_DATA_KEY`].
//! There is no multi-key transaction; the two writes are independent, so
//! reload logic must treat a missing key as "no session" (see
//! [`crate::session`]).
//!
//! Backends are selected at composition time: OS keychain on desktop,
//! encrypted file where no keychain exists, in-memory for tests and
//! ephemeral sessions.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Storage key for the opaque bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Storage key for the serialized [`portal_core::Identity`].
pub const USER_DATA_KEY: &str = "user_data";

/// Failure in a secure-storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secure storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    fn backend(err: impl core::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability trait
// ─────────────────────────────────────────────────────────────────────────────

/// Confidential key/value persistence for the session entries.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - make `set` last-write-wins (replacing an existing value is not an error)
/// - return `Ok(None)` from `get` for an absent key, never an error
/// - make `delete` idempotent (deleting an absent key succeeds)
/// - provide platform-appropriate confidentiality for stored values
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove the entry under `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> SecureStore for Arc<S>
where
    S: SecureStore + ?Sized,
{
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Mutex-guarded map. No durability and no confidentiality beyond process
/// memory; used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl SecureStore for InMemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OS keychain backend
// ─────────────────────────────────────────────────────────────────────────────

/// Entries live in the platform keychain under one service name, keyed by
/// the logical entry name. The `keyring` API is blocking, so every call is
/// moved onto the blocking pool.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &key).map_err(StoreError::backend)?;
            op(entry).map_err(StoreError::backend)
        })
        .await
        .map_err(StoreError::backend)?
    }
}

#[async_trait]
impl SecureStore for KeyringStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.with_entry(key, move |entry| entry.set_password(&value))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self
            .with_entry(key, |entry| match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(err) => Err(err),
            })
            .await?;
        Ok(result)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.with_entry(key, |entry| match entry.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err),
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encrypted file backend
// ─────────────────────────────────────────────────────────────────────────────

const NONCE_LEN: usize = 12;

#[derive(Zeroize, ZeroizeOnDrop)]
struct StoreKey([u8; 32]);

/// One JSON map encrypted with ChaCha20-Poly1305. Every write re-encrypts
/// the whole map under a fresh random nonce; the nonce is prepended to the
/// ciphertext on disk. The key is zeroized on drop.
pub struct EncryptedFileStore {
    path: PathBuf,
    key: StoreKey,
    // serializes read-modify-write cycles against the file
    write_guard: tokio::sync::Mutex<()>,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, key: [u8; 32]) -> Self {
        Self {
            path: path.into(),
            key: StoreKey(key),
            write_guard: tokio::sync::Mutex::new(()),
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key.0))
    }

    async fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(StoreError::backend(err)),
        };

        if bytes.len() < NONCE_LEN {
            return Err(StoreError::Backend("truncated store file".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Backend("store file decryption failed".to_string()))?;

        serde_json::from_slice(&plaintext).map_err(StoreError::backend)
    }

    async fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(map).map_err(StoreError::backend)?;
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| StoreError::Backend("store file encryption failed".to_string()))?;

        let mut contents = nonce.to_vec();
        contents.extend_from_slice(&ciphertext);

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(StoreError::backend)
    }
}

#[async_trait]
impl SecureStore for EncryptedFileStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map().await?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map).await
    }
}
