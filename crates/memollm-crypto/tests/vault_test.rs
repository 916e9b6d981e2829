//! Vault behavior through the `KeyStorage` trait object.

use std::sync::Arc;

use memollm_core::ProviderType;
use memollm_crypto::{mask_api_key, CryptoError, InMemoryKeyStorage, KeyCrypto, KeyStorage};

fn shared_vault() -> Arc<dyn KeyStorage> {
    Arc::new(InMemoryKeyStorage::new(
        KeyCrypto::new("integration-master-secret").unwrap(),
    ))
}

#[tokio::test]
async fn concurrent_users_store_independently() {
    let vault = shared_vault();

    let mut handles = Vec::new();
    for user_id in 1..=16 {
        let vault = vault.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("sk-user{:02}-abcdefghijklmnop", user_id);
            vault
                .store_key(user_id, ProviderType::OpenAI, &key)
                .await
                .unwrap();
            key
        }));
    }

    for (idx, handle) in handles.into_iter().enumerate() {
        let key = handle.await.unwrap();
        let user_id = idx as i32 + 1;
        assert_eq!(
            vault.get_key(user_id, ProviderType::OpenAI).await.unwrap(),
            key
        );
    }
}

#[tokio::test]
async fn different_master_secret_cannot_read_records() {
    let writer = InMemoryKeyStorage::new(KeyCrypto::new("first-master-secret!").unwrap());
    let record = writer
        .store_key(0, ProviderType::Anthropic, "sk-ant-api03-secret")
        .await
        .unwrap();
    assert_eq!(record.masked_key, mask_api_key("sk-ant-api03-secret"));
    assert!(record.masked_key.ends_with("cret"));

    let other = KeyCrypto::new("second-master-secret").unwrap();
    assert!(matches!(
        other.decrypt(&record.encrypted_key),
        Err(CryptoError::Decryption(_))
    ));
}

#[tokio::test]
async fn identical_keys_share_an_id_across_users() {
    let vault = shared_vault();
    vault
        .store_key(1, ProviderType::Ollama, "shared-token")
        .await
        .unwrap();
    vault
        .store_key(2, ProviderType::Ollama, "shared-token")
        .await
        .unwrap();

    let a = vault.get_stored_key(1, ProviderType::Ollama).await.unwrap();
    let b = vault.get_stored_key(2, ProviderType::Ollama).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_ne!(a.encrypted_key, b.encrypted_key);
}

#[test]
fn stored_record_serializes_without_plaintext() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let vault = shared_vault();
        vault
            .store_key(3, ProviderType::Gemini, "AIzaSyA-1234567890abcd")
            .await
            .unwrap();
        let record = vault.get_stored_key(3, ProviderType::Gemini).await.unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("AIzaSyA-1234567890abcd"));
        assert!(json.contains("\"provider_type\":\"gemini\""));
    });
}
