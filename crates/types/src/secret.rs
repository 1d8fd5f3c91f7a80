use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Derives per-order swap secrets from a single root key (the digest key).
///
/// Derivation is a pure function of (digest key, nonce): the same nonce
/// always yields the same secret, so secrets are never stored — they are
/// recomputed on demand when an order needs redeeming.
#[derive(Clone)]
pub struct SecretManager {
    digest_key: [u8; 32],
}

/// A derived (secret, hash) pair for one order.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedSecret {
    pub secret: [u8; 32],
    pub secret_hash: [u8; 32],
}

impl SecretManager {
    pub fn new(digest_key: [u8; 32]) -> Self {
        Self { digest_key }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SecretError> {
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|_| SecretError::InvalidDigestKey)?;
        let digest_key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SecretError::InvalidDigestKey)?;
        Ok(Self::new(digest_key))
    }

    /// Derive the secret and its SHA-256 hash for an order nonce.
    pub fn derive(&self, nonce: u64) -> DerivedSecret {
        let mut mac = HmacSha256::new_from_slice(&self.digest_key)
            .expect("hmac accepts any key length");
        mac.update(format!("gardenswap:secret:{nonce}").as_bytes());
        let secret: [u8; 32] = mac.finalize().into_bytes().into();
        let secret_hash: [u8; 32] = Sha256::digest(secret).into();
        DerivedSecret {
            secret,
            secret_hash,
        }
    }
}

impl DerivedSecret {
    pub fn secret_hash_hex(&self) -> String {
        hex::encode(self.secret_hash)
    }
}

// Secrets must not leak through debug logging.
impl std::fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManager").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for DerivedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedSecret")
            .field("secret", &"<redacted>")
            .field("secret_hash", &hex::encode(self.secret_hash))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("digest key must be 32 bytes of hex")]
    InvalidDigestKey,
}
