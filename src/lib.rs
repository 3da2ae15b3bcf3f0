//! EIP-7702 Relay
//!
//! Builds, signs and submits EIP-7702 set-code transactions: an EOA signs
//! an authorization tuple delegating its code to a contract, and either the
//! EOA itself or a sponsor signs and pays for the type-4 transaction that
//! carries it.
//!
//! # Architecture
//!
//! - **eip7702**: canonical RLP, authorization signing, transaction building and assembly
//! - **keys**: secp256k1 key handling (zeroized, never logged)
//! - **delegate**: ABI payloads for the delegate's `execute`/`executeBatch`
//! - **tx**: node client, broadcast and receipt polling
//! - **nonce**: per-key serialization of "fetch nonce, sign, submit"
//! - **relayer**: the end-to-end flow for self-sponsored and sponsored delegation
//!
//! # Example
//!
//! ```rust,ignore
//! use eip7702_relay::eip7702::{sign_authorization, chains};
//!
//! let auth = sign_authorization(&key, chains::SEPOLIA, delegate, nonce)?;
//! ```

pub mod error;
pub mod types;
pub mod keys;
pub mod eip7702;
pub mod delegate;
pub mod tx;
pub mod nonce;
pub mod config;
pub mod relayer;
pub mod utils;

pub use error::{ErrorCode, RelayError, RelayResult, Stage};
pub use types::{keccak256, Address, TxHash, U256};
pub use keys::{PrivateKey, Signature};
pub use config::RelayConfig;
pub use relayer::{DelegationRequest, Payer, PreparedTransaction, RelayOutcome, Relayer, Signers};
