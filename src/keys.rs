//! Signing keys
//!
//! Key bytes live in a `SecretBox` and are zeroized on drop. They are only
//! exposed for the duration of a single signing call and never formatted.

use crate::error::{RelayError, RelayResult, Stage};
use crate::types::{keccak256, strip_hex_prefix, Address};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// ECDSA signature with normalized recovery parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// 0 or 1
    pub y_parity: u8,
    #[serde(with = "word_hex")]
    pub r: [u8; 32],
    #[serde(with = "word_hex")]
    pub s: [u8; 32],
}

impl Signature {
    /// 64-byte compact form (r || s)
    pub fn compact(&self) -> [u8; 64] {
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&self.r);
        sig[32..].copy_from_slice(&self.s);
        sig
    }

    pub fn is_empty(&self) -> bool {
        self.r == [0u8; 32] && self.s == [0u8; 32]
    }
}

/// secp256k1 private key
pub struct PrivateKey {
    secret: SecretBox<[u8; 32]>,
}

impl PrivateKey {
    /// Create from raw bytes. `stage` is the pipeline stage reported on failure.
    pub fn from_bytes(bytes: &[u8], stage: Stage) -> RelayResult<Self> {
        if bytes.len() != 32 {
            return Err(RelayError::signing(
                stage,
                format!("expected 32 key bytes, got {}", bytes.len()),
            ));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(RelayError::signing(stage, "private key is all zeros"));
        }
        SecretKey::from_slice(bytes).map_err(|e| RelayError::signing(stage, e.to_string()))?;

        let mut key = Box::new([0u8; 32]);
        key.copy_from_slice(bytes);
        Ok(Self { secret: SecretBox::new(key) })
    }

    /// Parse a hex key (`0x` optional)
    pub fn from_hex(hex_key: &str, stage: Stage) -> RelayResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(strip_hex_prefix(hex_key.trim()))
                .map_err(|_| RelayError::signing(stage, "private key is not valid hex"))?,
        );
        Self::from_bytes(&bytes, stage)
    }

    fn secret_key(&self, stage: Stage) -> RelayResult<SecretKey> {
        SecretKey::from_slice(self.secret.expose_secret())
            .map_err(|e| RelayError::signing(stage, e.to_string()))
    }

    /// Account address controlled by this key
    pub fn address(&self) -> RelayResult<Address> {
        let secp = Secp256k1::signing_only();
        let secret_key = self.secret_key(Stage::Configuration)?;
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(address_from_public_key(&public_key))
    }

    /// Deterministic (RFC 6979) low-s signature over a 32-byte digest
    pub fn sign_digest(&self, digest: &[u8; 32], stage: Stage) -> RelayResult<Signature> {
        let secp = Secp256k1::signing_only();
        let secret_key = self.secret_key(stage)?;
        let message = Message::from_digest(*digest);

        let (recovery_id, sig_bytes) = secp
            .sign_ecdsa_recoverable(&message, &secret_key)
            .serialize_compact();

        let y_parity = recovery_id.to_i32();
        if !(0..=1).contains(&y_parity) {
            return Err(RelayError::signing(stage, format!("unexpected recovery id {}", y_parity)));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        Ok(Signature { y_parity: y_parity as u8, r, s })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// Recover the address that produced `signature` over `digest`
pub fn recover_signer(digest: &[u8; 32], signature: &Signature, stage: Stage) -> RelayResult<Address> {
    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*digest);

    let recovery_id = RecoveryId::from_i32(signature.y_parity as i32)
        .map_err(|e| RelayError::signing(stage, format!("bad y_parity: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&signature.compact(), recovery_id)
        .map_err(|e| RelayError::signing(stage, format!("bad signature: {}", e)))?;
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| RelayError::signing(stage, format!("recovery failed: {}", e)))?;

    Ok(address_from_public_key(&public_key))
}

fn address_from_public_key(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

pub(crate) mod word_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(word: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(word)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(crate::types::strip_hex_prefix(&s)).map_err(serde::de::Error::custom)?;
        let mut word = [0u8; 32];
        if bytes.len() > 32 {
            return Err(serde::de::Error::custom("word wider than 32 bytes"));
        }
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(word)
    }
}
