//! Secret sealing.
//!
//! Values are encrypted with AES-256-GCM. The 32-byte data key is random and
//! lives in the platform credential store (Keychain, Credential Manager,
//! Secret Service). Only when no such store exists is the key derived by
//! Argon2id from `LMCHAT_PASSPHRASE`. Nothing but the sealed bytes reaches
//! the store file.

use crate::core::error::StoreError;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyring::Entry;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, info};

/// Environment variable holding a passphrase, used where no keyring exists.
pub const PASSPHRASE_ENV: &str = "LMCHAT_PASSPHRASE";

const KEYRING_SERVICE: &str = "lmchat";
const KEYRING_ACCOUNT: &str = "store-key";

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const SALT_PREFIX: &str = "lmchat-secure-store:";

/// Reversible protection for secret values.
pub trait SecretSealer: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError>;
    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError>;
}

/// Picks the strongest sealer this machine supports.
///
/// Order: system keyring, then `LMCHAT_PASSPHRASE`. With neither, secrets
/// cannot be sealed and every secret operation reports why.
pub fn for_current_user() -> Box<dyn SecretSealer> {
    let keyring = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)
        .map_err(|e| StoreError::Keyring(e.to_string()))
        .and_then(|entry| AesGcmSealer::from_keyring(&entry));

    match keyring {
        Ok(sealer) => return Box::new(sealer),
        Err(e) => debug!(error = %e, "system keyring unavailable"),
    }

    match std::env::var(PASSPHRASE_ENV) {
        Ok(passphrase) if !passphrase.is_empty() => {
            match AesGcmSealer::from_passphrase(&passphrase, &current_user(), Params::default()) {
                Ok(sealer) => Box::new(sealer),
                Err(e) => Box::new(UnavailableSealer::new(e.to_string())),
            }
        }
        _ => Box::new(UnavailableSealer::new(format!(
            "no system keyring available; set {} to store secrets",
            PASSPHRASE_ENV
        ))),
    }
}

/// AES-256-GCM sealer. Sealed layout is `nonce (12 bytes) || ciphertext+tag`.
pub struct AesGcmSealer {
    cipher: Aes256Gcm,
}

impl AesGcmSealer {
    pub fn from_key(key: &[u8]) -> Result<Self, StoreError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| StoreError::KeyDerivation(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Uses the data key held by `entry`, generating and storing one on first use.
    pub fn from_keyring(entry: &Entry) -> Result<Self, StoreError> {
        let key = match entry.get_password() {
            Ok(encoded) => STANDARD
                .decode(encoded.trim())
                .map_err(|e| StoreError::Keyring(format!("stored data key is malformed: {}", e)))?,
            Err(keyring::Error::NoEntry) => {
                let mut key = vec![0u8; KEY_SIZE];
                OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&STANDARD.encode(&key))
                    .map_err(|e| StoreError::Keyring(e.to_string()))?;
                info!("generated a new store key in the system keyring");
                key
            }
            Err(e) => return Err(StoreError::Keyring(e.to_string())),
        };

        if key.len() != KEY_SIZE {
            return Err(StoreError::Keyring(format!(
                "stored data key has {} bytes, expected {}",
                key.len(),
                KEY_SIZE
            )));
        }
        Self::from_key(&key)
    }

    pub fn from_passphrase(passphrase: &str, user: &str, params: Params) -> Result<Self, StoreError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = format!("{}{}", SALT_PREFIX, user);

        let mut key = [0u8; KEY_SIZE];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| StoreError::KeyDerivation(e.to_string()))?;

        Self::from_key(&key)
    }
}

impl SecretSealer for AesGcmSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        if sealed.len() <= NONCE_SIZE {
            return Err(StoreError::Decryption("sealed value too short".to_string()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Decryption("authentication failed".to_string()))
    }
}

/// Stand-in when no key source exists. Plain values keep working.
pub struct UnavailableSealer {
    reason: String,
}

impl UnavailableSealer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SecretSealer for UnavailableSealer {
    fn seal(&self, _plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Keyring(self.reason.clone()))
    }

    fn unseal(&self, _sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Keyring(self.reason.clone()))
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

#[cfg(test)]
pub(crate) fn test_sealer(passphrase: &str) -> AesGcmSealer {
    let params = Params::new(8, 1, 1, Some(KEY_SIZE)).unwrap();
    AesGcmSealer::from_passphrase(passphrase, "tester", params).unwrap()
}
