//! # memollm-crypto
//!
//! Encrypted storage for bring-your-own-key provider credentials.
//!
//! ## Primitives
//!
//! - **Key derivation**: SHA-256 of the master secret (minimum 16 characters)
//! - **Symmetric cipher**: AES-256-GCM (AEAD), fresh random 96-bit nonce per call
//! - **Envelope**: `base64(nonce ‖ ciphertext ‖ tag)`
//!
//! ## Example
//!
//! ```rust
//! use memollm_crypto::KeyCrypto;
//!
//! let crypto = KeyCrypto::new("a-master-secret-of-16+").unwrap();
//! let sealed = crypto.encrypt("sk-live-key").unwrap();
//! assert_eq!(crypto.decrypt(&sealed).unwrap(), "sk-live-key");
//! ```

pub mod error;
pub mod key_crypto;
pub mod keys;
pub mod storage;

pub use error::{CryptoError, CryptoResult};
pub use key_crypto::{KeyCrypto, MasterKey, MASTER_KEY_ENV, MIN_MASTER_KEY_LENGTH};
pub use keys::{generate_key_id, mask_api_key, validate_api_key_format};
pub use storage::{InMemoryKeyStorage, KeyStorage, StoredApiKey, INSTANCE_USER_ID};
