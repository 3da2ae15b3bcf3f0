//! Transaction Module
//!
//! Broadcast and confirmation of assembled transactions. `NodeClient` is
//! the seam to the blockchain node; `JsonRpcNode` is the production
//! implementation.

mod broadcaster;
mod tracker;

#[cfg(test)]
pub(crate) mod mock;


pub use broadcaster::*;
pub use tracker::*;

use crate::eip7702::RawTransaction;
use crate::error::RelayResult;
use crate::types::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Fee parameters for a type-4 transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl FeeEstimate {
    /// `max_fee = 2 * base_fee + tip`, leaving room for one full base fee doubling
    pub fn from_base_fee(base_fee: u128, tip: u128) -> Option<Self> {
        let max_fee_per_gas = base_fee.checked_mul(2)?.checked_add(tip)?;
        Some(Self { max_fee_per_gas, max_priority_fee_per_gas: tip })
    }
}

/// Inclusion receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// `false` when the transaction was included but its call reverted
    pub success: bool,
}

/// The node operations the relay depends on
///
/// `send_raw_transaction` reports a node-side refusal as
/// `RelayError::NodeRejection`; `submit` fills in the nonce and digest.
pub trait NodeClient {
    fn chain_id(&self) -> RelayResult<u64>;

    /// Pending nonce of `address`
    fn get_nonce(&self, address: &Address) -> RelayResult<u64>;

    fn get_fee_estimate(&self) -> RelayResult<FeeEstimate>;

    fn send_raw_transaction(&self, raw: &RawTransaction) -> RelayResult<TxHash>;

    /// `None` while the transaction is unknown or still pending
    fn get_transaction_receipt(&self, hash: &TxHash) -> RelayResult<Option<Receipt>>;

    fn get_code(&self, address: &Address) -> RelayResult<Vec<u8>>;
}

impl<T: NodeClient + ?Sized> NodeClient for &T {
    fn chain_id(&self) -> RelayResult<u64> {
        (**self).chain_id()
    }

    fn get_nonce(&self, address: &Address) -> RelayResult<u64> {
        (**self).get_nonce(address)
    }

    fn get_fee_estimate(&self) -> RelayResult<FeeEstimate> {
        (**self).get_fee_estimate()
    }

    fn send_raw_transaction(&self, raw: &RawTransaction) -> RelayResult<TxHash> {
        (**self).send_raw_transaction(raw)
    }

    fn get_transaction_receipt(&self, hash: &TxHash) -> RelayResult<Option<Receipt>> {
        (**self).get_transaction_receipt(hash)
    }

    fn get_code(&self, address: &Address) -> RelayResult<Vec<u8>> {
        (**self).get_code(address)
    }
}
