//! EIP-7702 Set-Code Transactions
//!
//! Implements transaction type (0x04) for EOA code delegation.
//! Reference: https://eips.ethereum.org/EIPS/eip-7702
//!
//! Flow: an authorizer signs a tuple delegating its account to a contract,
//! the tuple is embedded in a type-4 transaction, and the payer (the
//! authorizer itself or a sponsor) signs and pays for that transaction.

pub mod types;
pub mod rlp;
pub mod authorization;
pub mod transaction;
pub mod signer;
pub mod designator;

#[cfg(test)]
mod tests;

pub use types::*;
pub use authorization::{
    authorization_signing_hash, recover_authorization_signer, sign_authorization, verify_authorization,
};
pub use transaction::build;
pub use signer::{
    assemble_and_sign, decode_raw_transaction, decode_raw_transaction_hex, recover_transaction_signer,
    sign_transaction, transaction_signing_hash,
};
pub use designator::{parse_account_code, AccountCode};
