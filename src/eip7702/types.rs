//! EIP-7702 Type Definitions
//!
//! Core value types for set-code transactions. Every stage produces a new
//! value from its input; nothing here is mutated after construction.

use crate::keys::{word_hex, Signature};
use crate::types::{hex_bytes, keccak256, Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// EIP-7702 transaction type identifier
pub const EIP7702_TX_TYPE: u8 = 0x04;

/// Magic byte prefixed to the authorization digest preimage
pub const AUTHORIZATION_MAGIC: u8 = 0x05;

/// Fields in the signed transaction list (10 body fields + y_parity, r, s)
pub const SIGNED_FIELD_COUNT: usize = 13;

/// Well-known chain ids
pub mod chains {
    pub const LOCALHOST: u64 = 31337;
    pub const SEPOLIA: u64 = 11155111;
}

/// A signed EIP-7702 authorization tuple
///
/// The signer's account delegates its code to `address` at `nonce` on
/// `chain_id`. Stale once the signer's account nonce moves past `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Authorization {
    /// Chain ID (0 is valid on any chain)
    pub chain_id: u64,

    /// Delegate contract address
    pub address: Address,

    /// Nonce of the authorizing account
    pub nonce: u64,

    /// Signature y_parity (0 or 1)
    pub y_parity: u8,

    #[serde(with = "word_hex")]
    pub r: [u8; 32],

    #[serde(with = "word_hex")]
    pub s: [u8; 32],
}

impl Authorization {
    pub fn signature(&self) -> Signature {
        Signature { y_parity: self.y_parity, r: self.r, s: self.s }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature().is_empty()
    }
}

/// Access list entry (address + storage keys)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessListEntry {
    pub address: Address,

    #[serde(default, with = "storage_keys_hex")]
    pub storage_keys: Vec<[u8; 32]>,
}

/// Caller-supplied transaction fields, before the authorization list is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxFields {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    /// Call target. For delegation this is the authorizer's own account.
    pub to: Address,
    pub value: U256,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub access_list: Vec<AccessListEntry>,
}

/// Validated type-4 transaction body
///
/// Only `eip7702::transaction::build` constructs this, so every instance
/// has passed field validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransaction {
    pub(crate) fields: TxFields,
    pub(crate) authorization_list: Vec<Authorization>,
}

impl UnsignedTransaction {
    pub fn fields(&self) -> &TxFields {
        &self.fields
    }

    pub fn authorization_list(&self) -> &[Authorization] {
        &self.authorization_list
    }

    pub fn chain_id(&self) -> u64 {
        self.fields.chain_id
    }

    pub fn nonce(&self) -> u64 {
        self.fields.nonce
    }
}

/// Transaction body plus the payer's signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub tx: UnsignedTransaction,
    pub signature: Signature,
}

/// Network wire form: `0x04 || rlp(signed fields)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction(pub(crate) Vec<u8>);

impl RawTransaction {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Hash the network assigns to this transaction
    pub fn hash(&self) -> TxHash {
        TxHash(keccak256(&self.0))
    }
}

/// Who signs and pays for the outer transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Authorizer signs both the tuple and the transaction
    SelfSponsored,
    /// A separate sponsor signs and pays for the transaction
    Sponsored,
}

/// Nonces to use for the tuple and the outer transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncePlan {
    pub authorization_nonce: u64,
    pub transaction_nonce: u64,
}

impl PaymentMode {
    /// Pick nonces from the accounts' current (pending) nonces.
    ///
    /// The sender's nonce is incremented before the authorization list is
    /// processed, so a self-sponsored tuple must carry `current + 1`.
    /// `sponsor_nonce` is ignored in self-sponsored mode.
    pub fn nonces(&self, authorizer_nonce: u64, sponsor_nonce: u64) -> Option<NoncePlan> {
        match self {
            PaymentMode::SelfSponsored => Some(NoncePlan {
                authorization_nonce: authorizer_nonce.checked_add(1)?,
                transaction_nonce: authorizer_nonce,
            }),
            PaymentMode::Sponsored => Some(NoncePlan {
                authorization_nonce: authorizer_nonce,
                transaction_nonce: sponsor_nonce,
            }),
        }
    }
}

mod storage_keys_hex {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(keys: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error> {
        keys.iter()
            .map(|k| format!("0x{}", hex::encode(k)))
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| {
                let bytes = hex::decode(crate::types::strip_hex_prefix(s)).map_err(serde::de::Error::custom)?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| serde::de::Error::custom("storage key must be 32 bytes"))
            })
            .collect()
    }
}
