//! Delegation Relayer
//!
//! One parameterized flow for every delegation variant: the request says
//! what to call through the delegate, the signers say who authorizes and
//! who pays. Nonce lookup, signing and submission for a key run under that
//! key's lock; receipt polling runs outside it.

use crate::config::{GasSettings, RelayConfig};
use crate::delegate::DelegateCall;
use crate::eip7702::{
    build, parse_account_code, sign_authorization, sign_transaction, AccountCode, Authorization, PaymentMode,
    RawTransaction, SignedTransaction, TxFields,
};
use crate::error::{RelayError, RelayResult, Stage};
use crate::keys::PrivateKey;
use crate::nonce::SignerLocks;
use crate::tx::{await_receipt, submit, FeeEstimate, NodeClient, Receipt, TxState, TxTracker};
use crate::types::{Address, TxHash, U256};
use crate::{log_debug, log_info, log_warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Types
// =============================================================================

/// What to delegate and execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    pub chain_id: u64,
    pub delegate: Address,
    pub call: DelegateCall,
    pub gas: GasSettings,
}

impl DelegationRequest {
    pub fn from_config(config: &RelayConfig, call: DelegateCall) -> Self {
        Self { chain_id: config.chain_id, delegate: config.delegate, call, gas: config.gas.clone() }
    }
}

/// Who pays for the outer transaction
#[derive(Debug, Clone, Copy)]
pub enum Payer<'a> {
    SelfSponsored,
    Sponsor(&'a PrivateKey),
}

impl Payer<'_> {
    pub fn mode(&self) -> PaymentMode {
        match self {
            Payer::SelfSponsored => PaymentMode::SelfSponsored,
            Payer::Sponsor(_) => PaymentMode::Sponsored,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Signers<'a> {
    pub authorizer: &'a PrivateKey,
    pub payer: Payer<'a>,
}

impl<'a> Signers<'a> {
    pub fn self_sponsored(authorizer: &'a PrivateKey) -> Self {
        Self { authorizer, payer: Payer::SelfSponsored }
    }

    pub fn sponsored(authorizer: &'a PrivateKey, sponsor: &'a PrivateKey) -> Self {
        Self { authorizer, payer: Payer::Sponsor(sponsor) }
    }

    fn payer_key(&self) -> &'a PrivateKey {
        match self.payer {
            Payer::SelfSponsored => self.authorizer,
            Payer::Sponsor(key) => key,
        }
    }
}

/// Signed, ready-to-broadcast delegation
#[derive(Debug, Clone, Serialize)]
pub struct PreparedTransaction {
    pub mode: PaymentMode,
    pub authorizer: Address,
    pub payer: Address,
    pub authorization: Authorization,
    pub signed: SignedTransaction,
}

impl PreparedTransaction {
    pub fn raw(&self) -> RawTransaction {
        self.signed.raw()
    }

    pub fn hash(&self) -> TxHash {
        self.raw().hash()
    }
}

/// Result of a confirmed delegation
#[derive(Debug, Clone, Serialize)]
pub struct RelayOutcome {
    pub mode: PaymentMode,
    pub authorizer: Address,
    pub payer: Address,
    pub authorization_nonce: u64,
    pub transaction_nonce: u64,
    pub tx_hash: TxHash,
    pub receipt: Receipt,
    pub states: Vec<TxState>,
}

// =============================================================================
// Relayer
// =============================================================================

pub struct Relayer<N: NodeClient> {
    node: N,
    locks: Arc<SignerLocks>,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl<N: NodeClient> Relayer<N> {
    pub fn new(node: N, config: &RelayConfig) -> Self {
        Self {
            node,
            locks: Arc::new(SignerLocks::new()),
            poll_interval: config.poll_interval(),
            receipt_timeout: config.receipt_timeout(),
        }
    }

    /// Share per-key locks with other relayers in the same process
    pub fn with_locks(mut self, locks: Arc<SignerLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    /// Look up nonces and fees, sign the authorization and the transaction.
    ///
    /// Callers that submit the result themselves must hold the signers'
    /// locks across prepare and submit; `send` does this.
    pub fn prepare(&self, request: &DelegationRequest, signers: &Signers<'_>) -> RelayResult<PreparedTransaction> {
        self.prepare_tracked(request, signers, &mut TxTracker::new())
    }

    fn prepare_tracked(
        &self,
        request: &DelegationRequest,
        signers: &Signers<'_>,
        tracker: &mut TxTracker,
    ) -> RelayResult<PreparedTransaction> {
        let node_chain = self.node.chain_id()?;
        if node_chain != request.chain_id {
            return Err(RelayError::config(
                "chain_id",
                format!("node is on chain {}, request targets {}", node_chain, request.chain_id),
            ));
        }

        let mode = signers.payer.mode();
        let authorizer = signers.authorizer.address()?;
        let payer = signers.payer_key().address()?;
        if mode == PaymentMode::Sponsored && payer == authorizer {
            return Err(RelayError::config("sponsor", "sponsor key controls the authorizer account"));
        }

        let authorizer_nonce = self
            .node
            .get_nonce(&authorizer)
            .map_err(|e| e.at_stage(Stage::Authorization))?;
        let payer_nonce = match mode {
            PaymentMode::SelfSponsored => authorizer_nonce,
            PaymentMode::Sponsored => self.node.get_nonce(&payer).map_err(|e| e.at_stage(Stage::Assembly))?,
        };
        let plan = mode
            .nonces(authorizer_nonce, payer_nonce)
            .ok_or_else(|| RelayError::encoding(Stage::Authorization, "nonce", "authorizer nonce overflows"))?;

        log_debug!(
            "relayer",
            "nonce plan",
            authorizer = authorizer,
            authorization_nonce = plan.authorization_nonce,
            transaction_nonce = plan.transaction_nonce
        );

        let authorization =
            sign_authorization(signers.authorizer, request.chain_id, request.delegate, plan.authorization_nonce)?;
        tracker.advance(TxState::AuthorizationSigned)?;

        let fees = self.fees(&request.gas)?;
        let fields = TxFields {
            chain_id: request.chain_id,
            nonce: plan.transaction_nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit: request.gas.gas_limit,
            // The call runs in the authorizer's account under the delegated code
            to: authorizer,
            value: U256::ZERO,
            data: request.call.calldata()?,
            access_list: Vec::new(),
        };
        let unsigned = build(fields, vec![authorization.clone()])?;
        tracker.advance(TxState::Assembled)?;

        let signed = sign_transaction(&unsigned, signers.payer_key())?;
        tracker.advance(TxState::Signed)?;

        log_info!(
            "relayer",
            "delegation prepared",
            authorizer = authorizer,
            payer = payer,
            tx_hash = signed.raw().hash()
        );

        Ok(PreparedTransaction { mode, authorizer, payer, authorization, signed })
    }

    fn fees(&self, gas: &GasSettings) -> RelayResult<FeeEstimate> {
        match (gas.max_fee_per_gas, gas.max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => {
                Ok(FeeEstimate { max_fee_per_gas, max_priority_fee_per_gas })
            }
            _ => self.node.get_fee_estimate(),
        }
    }

    /// Prepare and submit under the signers' locks, then wait for the receipt
    pub fn send(&self, request: &DelegationRequest, signers: &Signers<'_>) -> RelayResult<RelayOutcome> {
        let mut tracker = TxTracker::new();

        let addresses = [signers.authorizer.address()?, signers.payer_key().address()?];
        let (prepared, tx_hash) = self.locks.with_locks(&addresses, || {
            let prepared = self.prepare_tracked(request, signers, &mut tracker)?;
            let tx_hash = submit(&self.node, &prepared.signed).map_err(|e| {
                tracker.fail(&e);
                e
            })?;
            tracker.advance(TxState::Submitted)?;
            Ok::<_, RelayError>((prepared, tx_hash))
        })?;

        tracker.advance(TxState::Pending)?;
        let receipt = match await_receipt(&self.node, &tx_hash, self.poll_interval, self.receipt_timeout) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracker.fail(&e);
                log_warn!("relayer", "delegation not confirmed", tx_hash = tx_hash, state = tracker.state());
                return Err(e);
            }
        };
        tracker.advance(TxState::Confirmed)?;

        Ok(RelayOutcome {
            mode: prepared.mode,
            authorizer: prepared.authorizer,
            payer: prepared.payer,
            authorization_nonce: prepared.authorization.nonce,
            transaction_nonce: prepared.signed.tx.nonce(),
            tx_hash,
            receipt,
            states: tracker.history().to_vec(),
        })
    }

    /// Classify the on-chain code of `address`
    pub fn check_code(&self, address: &Address) -> RelayResult<AccountCode> {
        Ok(parse_account_code(&self.node.get_code(address)?))
    }
}
