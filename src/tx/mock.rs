//! In-memory `NodeClient` for tests

use super::{FeeEstimate, NodeClient, Receipt};
use crate::eip7702::designator::designator_for;
use crate::eip7702::{
    decode_raw_transaction, recover_authorization_signer, recover_transaction_signer, Authorization, RawTransaction,
};
use crate::error::{RelayError, RelayResult, Stage};
use crate::types::{Address, TxHash};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Vec<u8>>,
    sent: Vec<RawTransaction>,
    /// (authority, tuple) for every tuple that took effect
    applied: Vec<(Address, Authorization)>,
    reject_next: Option<String>,
    fail_nonce_lookups: bool,
    /// receipt plus the number of polls that still report pending
    receipts: HashMap<TxHash, (Receipt, usize)>,
    receipt_polls: usize,
    fee_requests: usize,
}

/// Scripted node: accepts transactions, bumps the sender's nonce, applies
/// the authorization list and (unless disabled) produces a successful receipt.
///
/// Tuples are applied after the sender's nonce is bumped. A tuple whose chain
/// id or nonce does not match, or whose signature does not recover, is
/// skipped without failing the transaction.
pub struct MockNode {
    chain_id: u64,
    fees: FeeEstimate,
    auto_confirm: bool,
    state: Mutex<State>,
}

impl MockNode {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            fees: FeeEstimate { max_fee_per_gas: 20_000_000_000, max_priority_fee_per_gas: 2_000_000_000 },
            auto_confirm: true,
            state: Mutex::new(State::default()),
        }
    }

    pub fn without_auto_confirm(mut self) -> Self {
        self.auto_confirm = false;
        self
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, nonce);
    }

    pub fn set_code(&self, address: Address, code: Vec<u8>) {
        self.state.lock().unwrap().code.insert(address, code);
    }

    pub fn set_receipt(&self, hash: TxHash, receipt: Receipt, pending_polls: usize) {
        self.state.lock().unwrap().receipts.insert(hash, (receipt, pending_polls));
    }

    pub fn reject_next(&self, message: &str) {
        self.state.lock().unwrap().reject_next = Some(message.to_string());
    }

    /// Make every `get_nonce` fail with a transport error
    pub fn fail_nonce_lookups(&self) {
        self.state.lock().unwrap().fail_nonce_lookups = true;
    }

    pub fn applied_authorizations(&self) -> Vec<(Address, Authorization)> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn sent(&self) -> Vec<RawTransaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn receipt_polls(&self) -> usize {
        self.state.lock().unwrap().receipt_polls
    }

    pub fn fee_requests(&self) -> usize {
        self.state.lock().unwrap().fee_requests
    }
}

impl NodeClient for MockNode {
    fn chain_id(&self) -> RelayResult<u64> {
        Ok(self.chain_id)
    }

    fn get_nonce(&self, address: &Address) -> RelayResult<u64> {
        let state = self.state.lock().unwrap();
        if state.fail_nonce_lookups {
            return Err(RelayError::network(Stage::Assembly, "connection failed"));
        }
        Ok(state.nonces.get(address).copied().unwrap_or(0))
    }

    fn get_fee_estimate(&self) -> RelayResult<FeeEstimate> {
        self.state.lock().unwrap().fee_requests += 1;
        Ok(self.fees)
    }

    fn send_raw_transaction(&self, raw: &RawTransaction) -> RelayResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.reject_next.take() {
            return Err(RelayError::NodeRejection { message, code: Some(-32000), nonce: 0, digest: [0u8; 32] });
        }

        let signed = decode_raw_transaction(raw.as_bytes())?;
        let sender = recover_transaction_signer(&signed)?;
        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if signed.tx.nonce() != expected {
            return Err(RelayError::NodeRejection {
                message: format!("nonce {} does not match account nonce {}", signed.tx.nonce(), expected),
                code: Some(-32000),
                nonce: 0,
                digest: [0u8; 32],
            });
        }
        state.nonces.insert(sender, expected + 1);

        for auth in signed.tx.authorization_list() {
            if auth.chain_id != 0 && auth.chain_id != self.chain_id {
                continue;
            }
            let authority = match recover_authorization_signer(auth) {
                Ok(authority) => authority,
                Err(_) => continue,
            };
            let current = state.nonces.get(&authority).copied().unwrap_or(0);
            if auth.nonce != current {
                continue;
            }
            state.nonces.insert(authority, current + 1);
            state.code.insert(authority, designator_for(&auth.address).to_vec());
            state.applied.push((authority, auth.clone()));
        }

        let hash = raw.hash();
        state.sent.push(raw.clone());
        if self.auto_confirm {
            let block_number = 1000 + state.sent.len() as u64;
            state
                .receipts
                .insert(hash, (Receipt { tx_hash: hash, block_number, gas_used: 60_000, success: true }, 0));
        }
        Ok(hash)
    }

    fn get_transaction_receipt(&self, hash: &TxHash) -> RelayResult<Option<Receipt>> {
        let mut state = self.state.lock().unwrap();
        state.receipt_polls += 1;
        match state.receipts.get_mut(hash) {
            Some((_, pending)) if *pending > 0 => {
                *pending -= 1;
                Ok(None)
            }
            Some((receipt, _)) => Ok(Some(receipt.clone())),
            None => Ok(None),
        }
    }

    fn get_code(&self, address: &Address) -> RelayResult<Vec<u8>> {
        Ok(self.state.lock().unwrap().code.get(address).cloned().unwrap_or_default())
    }
}
