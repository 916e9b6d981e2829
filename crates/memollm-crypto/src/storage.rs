//! Encrypted API key vault keyed by (user id, provider type).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memollm_core::ProviderType;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CryptoError, CryptoResult};
use crate::key_crypto::KeyCrypto;
use crate::keys::{generate_key_id, mask_api_key, validate_api_key_format};

/// User id for instance-wide keys.
pub const INSTANCE_USER_ID: i32 = 0;

/// Stored key record. Holds the ciphertext only, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApiKey {
    /// 8-hex-char id derived from the plaintext key.
    pub id: String,
    pub provider_type: ProviderType,
    pub encrypted_key: String,
    pub masked_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// 0 for instance-level keys.
    pub user_id: i32,
}

/// Vault contract. A durable implementation must keep these semantics.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    /// Store a new key and return its record. Fails with `KeyAlreadyExists`
    /// if the pair is taken.
    async fn store_key(
        &self,
        user_id: i32,
        provider: ProviderType,
        api_key: &str,
    ) -> CryptoResult<StoredApiKey>;

    /// Decrypted key for the pair.
    async fn get_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<String>;

    /// Stored record for display.
    async fn get_stored_key(
        &self,
        user_id: i32,
        provider: ProviderType,
    ) -> CryptoResult<StoredApiKey>;

    /// Replace an existing key and return the updated record. Fails with
    /// `KeyNotFound` if absent.
    async fn update_key(
        &self,
        user_id: i32,
        provider: ProviderType,
        api_key: &str,
    ) -> CryptoResult<StoredApiKey>;

    async fn delete_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<()>;

    /// All records owned by a user, ordered by provider type.
    async fn list_keys(&self, user_id: i32) -> CryptoResult<Vec<StoredApiKey>>;

    async fn has_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<bool>;

    /// Stamp `last_used_at` with the current time.
    async fn mark_key_used(&self, user_id: i32, provider: ProviderType) -> CryptoResult<()>;
}

type VaultKey = (i32, ProviderType);

/// Process-local vault. Contents are lost on restart.
pub struct InMemoryKeyStorage {
    crypto: KeyCrypto,
    keys: RwLock<HashMap<VaultKey, StoredApiKey>>,
}

impl InMemoryKeyStorage {
    pub fn new(crypto: KeyCrypto) -> Self {
        Self {
            crypto,
            keys: RwLock::new(HashMap::new()),
        }
    }

    fn seal(&self, provider: ProviderType, api_key: &str) -> CryptoResult<(String, String, String)> {
        validate_api_key_format(provider, api_key)?;
        let encrypted = self.crypto.encrypt(api_key)?;
        Ok((generate_key_id(api_key), encrypted, mask_api_key(api_key)))
    }

    fn poisoned() -> CryptoError {
        CryptoError::Internal("key vault lock poisoned".to_string())
    }
}

#[async_trait]
impl KeyStorage for InMemoryKeyStorage {
    async fn store_key(
        &self,
        user_id: i32,
        provider: ProviderType,
        api_key: &str,
    ) -> CryptoResult<StoredApiKey> {
        let (id, encrypted_key, masked_key) = self.seal(provider, api_key)?;

        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        if keys.contains_key(&(user_id, provider)) {
            return Err(CryptoError::KeyAlreadyExists { user_id, provider });
        }

        let now = Utc::now();
        let stored = StoredApiKey {
            id,
            provider_type: provider,
            encrypted_key,
            masked_key,
            created_at: now,
            updated_at: now,
            last_used_at: None,
            user_id,
        };
        keys.insert((user_id, provider), stored.clone());

        info!(
            subsystem = "vault",
            op = "store_key",
            user_id,
            provider = %provider,
            masked_key = %stored.masked_key,
            "API key stored"
        );
        Ok(stored)
    }

    async fn get_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<String> {
        let encrypted = {
            let keys = self.keys.read().map_err(|_| Self::poisoned())?;
            keys.get(&(user_id, provider))
                .map(|k| k.encrypted_key.clone())
                .ok_or(CryptoError::KeyNotFound { user_id, provider })?
        };
        self.crypto.decrypt(&encrypted)
    }

    async fn get_stored_key(
        &self,
        user_id: i32,
        provider: ProviderType,
    ) -> CryptoResult<StoredApiKey> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        keys.get(&(user_id, provider))
            .cloned()
            .ok_or(CryptoError::KeyNotFound { user_id, provider })
    }

    async fn update_key(
        &self,
        user_id: i32,
        provider: ProviderType,
        api_key: &str,
    ) -> CryptoResult<StoredApiKey> {
        let (id, encrypted_key, masked_key) = self.seal(provider, api_key)?;

        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        let stored = keys
            .get_mut(&(user_id, provider))
            .ok_or(CryptoError::KeyNotFound { user_id, provider })?;
        stored.id = id;
        stored.encrypted_key = encrypted_key;
        stored.masked_key = masked_key;
        stored.updated_at = Utc::now();

        info!(
            subsystem = "vault",
            op = "update_key",
            user_id,
            provider = %provider,
            masked_key = %stored.masked_key,
            "API key updated"
        );
        Ok(stored.clone())
    }

    async fn delete_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<()> {
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        if keys.remove(&(user_id, provider)).is_none() {
            return Err(CryptoError::KeyNotFound { user_id, provider });
        }

        info!(
            subsystem = "vault",
            op = "delete_key",
            user_id,
            provider = %provider,
            "API key deleted"
        );
        Ok(())
    }

    async fn list_keys(&self, user_id: i32) -> CryptoResult<Vec<StoredApiKey>> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        let mut owned: Vec<StoredApiKey> = keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|k| k.provider_type);
        Ok(owned)
    }

    async fn has_key(&self, user_id: i32, provider: ProviderType) -> CryptoResult<bool> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        Ok(keys.contains_key(&(user_id, provider)))
    }

    async fn mark_key_used(&self, user_id: i32, provider: ProviderType) -> CryptoResult<()> {
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        let stored = keys
            .get_mut(&(user_id, provider))
            .ok_or(CryptoError::KeyNotFound { user_id, provider })?;
        stored.last_used_at = Some(Utc::now());
        Ok(())
    }
}
