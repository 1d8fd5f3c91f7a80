use async_trait::async_trait;
use bitcoin::key::{Keypair, Secp256k1};
use bitcoin::secp256k1::{All, Message, SecretKey};
use bitcoin::taproot::TapTweakHash;
use bitcoin::{TapNodeHash, XOnlyPublicKey};

use crate::error::HtlcError;
use crate::Result;

/// Schnorr signing capability.
///
/// The engine never sees key material: it hands out 32-byte digests and
/// receives 64-byte BIP340 signatures. `sign_schnorr` signs with the raw
/// key (script-path spends); `sign_schnorr_tweaked` applies the BIP341
/// output tweak first (key-path spends of the signer's own wallet outputs).
#[async_trait]
pub trait SchnorrSigner: Send + Sync {
    async fn sign_schnorr(&self, digest: [u8; 32]) -> Result<[u8; 64]>;

    async fn sign_schnorr_tweaked(
        &self,
        digest: [u8; 32],
        merkle_root: Option<TapNodeHash>,
    ) -> Result<[u8; 64]>;

    fn x_only_public_key(&self) -> XOnlyPublicKey;
}

/// In-process signer backed by a secp256k1 keypair.
pub struct MemorySigner {
    secp: Secp256k1<All>,
    keypair: Keypair,
}

impl MemorySigner {
    pub fn new(secret_key: [u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&secret_key)
            .map_err(|_| HtlcError::validation("secret key is not a valid scalar"))?;
        let keypair = Keypair::from_secret_key(&secp, &sk);
        Ok(Self { secp, keypair })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|_| HtlcError::validation("secret key is not hex"))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HtlcError::validation("secret key must be 32 bytes"))?;
        Self::new(key)
    }
}

#[async_trait]
impl SchnorrSigner for MemorySigner {
    async fn sign_schnorr(&self, digest: [u8; 32]) -> Result<[u8; 64]> {
        let msg = Message::from_digest(digest);
        let sig = self.secp.sign_schnorr_no_aux_rand(&msg, &self.keypair);
        Ok(sig.serialize())
    }

    async fn sign_schnorr_tweaked(
        &self,
        digest: [u8; 32],
        merkle_root: Option<TapNodeHash>,
    ) -> Result<[u8; 64]> {
        let (x_only, _) = XOnlyPublicKey::from_keypair(&self.keypair);
        let tweak = TapTweakHash::from_key_and_tweak(x_only, merkle_root).to_scalar();
        let tweaked = self
            .keypair
            .add_xonly_tweak(&self.secp, &tweak)
            .map_err(|e| HtlcError::Sighash(format!("key tweak failed: {e}")))?;
        let msg = Message::from_digest(digest);
        let sig = self.secp.sign_schnorr_no_aux_rand(&msg, &tweaked);
        Ok(sig.serialize())
    }

    fn x_only_public_key(&self) -> XOnlyPublicKey {
        XOnlyPublicKey::from_keypair(&self.keypair).0
    }
}

impl std::fmt::Debug for MemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySigner")
            .field("public_key", &self.x_only_public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::key::TapTweak;

    fn signer() -> MemorySigner {
        MemorySigner::new([0x11; 32]).unwrap()
    }

    #[tokio::test]
    async fn plain_signature_verifies_against_raw_key() {
        let s = signer();
        let digest = [0x42; 32];
        let sig = s.sign_schnorr(digest).await.unwrap();

        let secp = Secp256k1::new();
        let sig = bitcoin::secp256k1::schnorr::Signature::from_slice(&sig).unwrap();
        let msg = Message::from_digest(digest);
        secp.verify_schnorr(&sig, &msg, &s.x_only_public_key())
            .expect("signature must verify");
    }

    #[tokio::test]
    async fn tweaked_signature_verifies_against_output_key() {
        let s = signer();
        let digest = [0x43; 32];
        let sig = s.sign_schnorr_tweaked(digest, None).await.unwrap();

        let secp = Secp256k1::new();
        let (output_key, _) = s.x_only_public_key().tap_tweak(&secp, None);
        let sig = bitcoin::secp256k1::schnorr::Signature::from_slice(&sig).unwrap();
        let msg = Message::from_digest(digest);
        secp.verify_schnorr(&sig, &msg, &output_key.to_inner())
            .expect("tweaked signature must verify against output key");
    }

    #[test]
    fn rejects_invalid_keys() {
        assert!(MemorySigner::new([0; 32]).is_err());
        assert!(MemorySigner::from_hex("abcd").is_err());
    }

    #[tokio::test]
    async fn random_keys_produce_distinct_signers() {
        use rand::RngCore;
        let mut key_a = [0u8; 32];
        let mut key_b = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_a);
        rand::thread_rng().fill_bytes(&mut key_b);

        let a = MemorySigner::new(key_a).unwrap();
        let b = MemorySigner::new(key_b).unwrap();
        assert_ne!(a.x_only_public_key(), b.x_only_public_key());

        let digest = [0x55; 32];
        assert_ne!(
            a.sign_schnorr(digest).await.unwrap(),
            b.sign_schnorr(digest).await.unwrap()
        );
    }

    #[test]
    fn debug_hides_key_material() {
        let rendered = format!("{:?}", signer());
        assert!(rendered.contains("public_key"));
        assert!(!rendered.contains("1111111111"));
    }
}
