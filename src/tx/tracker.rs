//! Transaction Tracker
//!
//! Receipt polling and the per-transaction lifecycle.

use super::{NodeClient, Receipt};
use crate::error::{RelayError, RelayResult};
use crate::types::TxHash;
use crate::{log_debug, log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// Receipt polling
// =============================================================================

/// Block until `hash` has a receipt or `timeout` elapses.
///
/// A missing receipt is treated as pending whether the transaction is still
/// in the mempool or was dropped. Transport errors while polling are logged
/// and polling continues until the deadline.
pub fn await_receipt<N: NodeClient>(
    node: &N,
    hash: &TxHash,
    poll_interval: Duration,
    timeout: Duration,
) -> RelayResult<Receipt> {
    let started = Instant::now();

    loop {
        match node.get_transaction_receipt(hash) {
            Ok(Some(receipt)) if receipt.success => {
                log_info!(
                    "tracker",
                    "transaction confirmed",
                    tx_hash = hash,
                    block = receipt.block_number,
                    gas_used = receipt.gas_used
                );
                return Ok(receipt);
            }
            Ok(Some(receipt)) => {
                return Err(RelayError::ExecutionReverted {
                    tx_hash: hash.to_hex(),
                    block_number: receipt.block_number,
                    gas_used: receipt.gas_used,
                });
            }
            Ok(None) => log_debug!("tracker", "receipt pending", tx_hash = hash),
            Err(e) => log_warn!("tracker", "receipt poll failed", tx_hash = hash, error = e),
        }

        let waited = started.elapsed();
        if waited >= timeout {
            return Err(RelayError::Timeout { tx_hash: hash.to_hex(), waited });
        }
        thread::sleep(poll_interval.min(timeout - waited));
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Lifecycle of one relayed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Built,
    AuthorizationSigned,
    Assembled,
    Signed,
    Submitted,
    Pending,
    Confirmed,
    Reverted,
    RejectedByNode,
    TimedOut,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxState::Confirmed | TxState::Reverted | TxState::RejectedByNode | TxState::TimedOut
        )
    }

    pub fn can_advance_to(&self, next: TxState) -> bool {
        use TxState::*;
        matches!(
            (self, next),
            (Built, AuthorizationSigned)
                | (AuthorizationSigned, Assembled)
                | (Assembled, Signed)
                | (Signed, Submitted)
                | (Signed, RejectedByNode)
                | (Submitted, Pending)
                | (Submitted, RejectedByNode)
                | (Pending, Confirmed)
                | (Pending, Reverted)
                | (Pending, TimedOut)
        )
    }

    /// Terminal state implied by a broadcast or confirmation failure
    pub fn from_error(err: &RelayError) -> Option<TxState> {
        match err {
            RelayError::NodeRejection { .. } => Some(TxState::RejectedByNode),
            RelayError::ExecutionReverted { .. } => Some(TxState::Reverted),
            RelayError::Timeout { .. } => Some(TxState::TimedOut),
            _ => None,
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Built => "built",
            TxState::AuthorizationSigned => "authorization_signed",
            TxState::Assembled => "assembled",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Pending => "pending",
            TxState::Confirmed => "confirmed",
            TxState::Reverted => "reverted",
            TxState::RejectedByNode => "rejected_by_node",
            TxState::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// Records the path a transaction took through its lifecycle
#[derive(Debug, Clone, Serialize)]
pub struct TxTracker {
    history: Vec<TxState>,
}

impl Default for TxTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TxTracker {
    pub fn new() -> Self {
        Self { history: vec![TxState::Built] }
    }

    pub fn state(&self) -> TxState {
        // history always holds at least `Built`
        self.history.last().copied().unwrap_or(TxState::Built)
    }

    pub fn history(&self) -> &[TxState] {
        &self.history
    }

    pub fn advance(&mut self, next: TxState) -> RelayResult<()> {
        let current = self.state();
        if !current.can_advance_to(next) {
            return Err(RelayError::invalid_transaction(
                "state",
                format!("cannot move from {} to {}", current, next),
            ));
        }
        self.history.push(next);
        Ok(())
    }

    /// Move to the terminal state implied by `err`, if any
    pub fn fail(&mut self, err: &RelayError) {
        if let Some(next) = TxState::from_error(err) {
            if self.state().can_advance_to(next) {
                self.history.push(next);
            }
        }
    }
}
