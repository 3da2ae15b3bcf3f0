//! Delegate contract call payloads
//!
//! ABI encoding for the delegate's `execute(address,uint256,bytes)` and
//! `executeBatch((address,uint256,bytes)[])` entry points. The payload is the
//! `data` field of the outer transaction, sent to the authorizer's own
//! account so it runs under the delegated code.

use crate::error::{RelayError, RelayResult, Stage};
use crate::types::{hex_bytes, Address, U256};
use serde::{Deserialize, Serialize};

/// `execute(address,uint256,bytes)`
pub const EXECUTE_SELECTOR: [u8; 4] = [0xb6, 0x1d, 0x27, 0xf6];

/// `executeBatch((address,uint256,bytes)[])`
pub const EXECUTE_BATCH_SELECTOR: [u8; 4] = [0x34, 0xfc, 0xd5, 0xbe];

/// `transfer(address,uint256)`
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

const WORD: usize = 32;

/// A single sub-call executed by the delegate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Call {
    pub target: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Call {
    pub fn new(target: Address, value: U256, data: Vec<u8>) -> Self {
        Self { target, value, data }
    }

    fn validate(&self) -> RelayResult<()> {
        self.target.ensure_non_zero(Stage::Assembly, "call.target")
    }
}

/// Ordered sequence of sub-calls, executed atomically by the delegate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchCall(pub Vec<Call>);

impl BatchCall {
    pub fn push(&mut self, call: Call) {
        self.0.push(call);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which delegate entry point a transaction invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateCall {
    Single(Call),
    Batch(BatchCall),
}

impl DelegateCall {
    /// Encoded call data for the outer transaction
    pub fn calldata(&self) -> RelayResult<Vec<u8>> {
        match self {
            DelegateCall::Single(call) => encode_execute(call),
            DelegateCall::Batch(batch) => encode_execute_batch(batch),
        }
    }
}

/// `execute(target, value, data)`
pub fn encode_execute(call: &Call) -> RelayResult<Vec<u8>> {
    call.validate()?;

    let mut out = EXECUTE_SELECTOR.to_vec();
    out.extend_from_slice(&encode_call_tuple(call));
    Ok(out)
}

/// `executeBatch(calls)`
pub fn encode_execute_batch(batch: &BatchCall) -> RelayResult<Vec<u8>> {
    if batch.is_empty() {
        return Err(RelayError::invalid_transaction("calls", "batch contains no calls"));
    }
    for call in &batch.0 {
        call.validate()?;
    }

    let encoded: Vec<Vec<u8>> = batch.0.iter().map(encode_call_tuple).collect();

    let mut out = EXECUTE_BATCH_SELECTOR.to_vec();
    // Single dynamic argument: offset to the array
    out.extend_from_slice(&uint_word(WORD as u64));
    out.extend_from_slice(&uint_word(encoded.len() as u64));

    // Element offsets are relative to the first offset slot
    let mut offset = encoded.len() * WORD;
    for tuple in &encoded {
        out.extend_from_slice(&uint_word(offset as u64));
        offset += tuple.len();
    }
    for tuple in encoded {
        out.extend_from_slice(&tuple);
    }
    Ok(out)
}

/// `transfer(to, amount)` call data for an ERC-20 token
pub fn erc20_transfer(to: &Address, amount: &U256) -> Vec<u8> {
    let mut out = ERC20_TRANSFER_SELECTOR.to_vec();
    out.extend_from_slice(&address_word(to));
    out.extend_from_slice(&amount.to_be_bytes());
    out
}

/// `(address, uint256, bytes)`: head of three words, then the bytes tail
fn encode_call_tuple(call: &Call) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 * WORD + call.data.len());
    out.extend_from_slice(&address_word(&call.target));
    out.extend_from_slice(&call.value.to_be_bytes());
    out.extend_from_slice(&uint_word(3 * WORD as u64));
    out.extend_from_slice(&encode_dynamic_bytes(&call.data));
    out
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&uint_word(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(WORD + padded_len, 0);
    out
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn uint_word(value: u64) -> [u8; 32] {
    U256::from_u64(value).to_be_bytes()
}
