//! Unified error types for the relay
//!
//! Every failure reports the stage that produced it and, where one exists,
//! the field that caused it. Encoding, address and signing errors are caller
//! bugs and are never retried; node rejections and timeouts carry enough
//! context (nonce, digest, hash) for the caller to rebuild and resubmit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configuration,
    Authorization,
    Assembly,
    Broadcast,
    Confirmation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Authorization => "authorization",
            Stage::Assembly => "assembly",
            Stage::Broadcast => "broadcast",
            Stage::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

/// Stable error codes for machine consumption (CLI JSON output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    EncodingError,
    DecodingError,
    InvalidAddress,
    InvalidTransaction,
    SigningError,
    NodeRejection,
    ExecutionReverted,
    Timeout,
    NetworkError,
    ConfigError,
}

/// Main error type for all relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("[{stage}] encoding error in `{field}`: {reason}")]
    Encoding {
        stage: Stage,
        field: &'static str,
        reason: String,
    },

    #[error("[{stage}] cannot decode `{field}`: {reason}")]
    Decoding {
        stage: Stage,
        field: &'static str,
        reason: String,
    },

    #[error("[{stage}] invalid address in `{field}`: {reason}")]
    InvalidAddress {
        stage: Stage,
        field: &'static str,
        reason: String,
    },

    #[error("[assembly] invalid transaction field `{field}`: {reason}")]
    InvalidTransaction { field: &'static str, reason: String },

    #[error("[{stage}] signing error: {reason}")]
    Signing { stage: Stage, reason: String },

    #[error("[broadcast] node rejected transaction (nonce {nonce}, digest 0x{}): {message}", hex::encode(.digest))]
    NodeRejection {
        message: String,
        code: Option<i64>,
        nonce: u64,
        digest: [u8; 32],
    },

    #[error("[confirmation] transaction {tx_hash} reverted in block {block_number}")]
    ExecutionReverted {
        tx_hash: String,
        block_number: u64,
        gas_used: u64,
    },

    #[error("[confirmation] no receipt for {tx_hash} after {waited:?}")]
    Timeout { tx_hash: String, waited: Duration },

    #[error("[{stage}] network error: {reason}")]
    Network { stage: Stage, reason: String },

    #[error("[configuration] invalid `{field}`: {reason}")]
    Config { field: &'static str, reason: String },
}

impl RelayError {
    pub fn encoding(stage: Stage, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Encoding { stage, field, reason: reason.into() }
    }

    pub fn decoding(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Decoding { stage: Stage::Assembly, field, reason: reason.into() }
    }

    pub fn invalid_address(stage: Stage, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidAddress { stage, field, reason: reason.into() }
    }

    pub fn invalid_transaction(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidTransaction { field, reason: reason.into() }
    }

    pub fn signing(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Signing { stage, reason: reason.into() }
    }

    pub fn network(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Network { stage, reason: reason.into() }
    }

    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config { field, reason: reason.into() }
    }

    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            Self::Encoding { stage, .. }
            | Self::Decoding { stage, .. }
            | Self::InvalidAddress { stage, .. }
            | Self::Signing { stage, .. }
            | Self::Network { stage, .. } => *stage,
            Self::InvalidTransaction { .. } => Stage::Assembly,
            Self::NodeRejection { .. } => Stage::Broadcast,
            Self::ExecutionReverted { .. } | Self::Timeout { .. } => Stage::Confirmation,
            Self::Config { .. } => Stage::Configuration,
        }
    }

    /// Field that caused the error, when one is known
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Encoding { field, .. }
            | Self::Decoding { field, .. }
            | Self::InvalidAddress { field, .. }
            | Self::InvalidTransaction { field, .. }
            | Self::Config { field, .. } => Some(field),
            Self::NodeRejection { .. } => Some("nonce"),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Encoding { .. } => ErrorCode::EncodingError,
            Self::Decoding { .. } => ErrorCode::DecodingError,
            Self::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            Self::InvalidTransaction { .. } => ErrorCode::InvalidTransaction,
            Self::Signing { .. } => ErrorCode::SigningError,
            Self::NodeRejection { .. } => ErrorCode::NodeRejection,
            Self::ExecutionReverted { .. } => ErrorCode::ExecutionReverted,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Network { .. } => ErrorCode::NetworkError,
            Self::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Re-tag a transport failure with the stage that issued the request.
    /// Other variants already name their own stage and are returned as-is.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Network { reason, .. } => Self::Network { stage, reason },
            other => other,
        }
    }

    /// Whether the caller may rebuild with fresh nonce/fee data and resubmit.
    /// Nothing is retried automatically.
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self,
            Self::NodeRejection { .. } | Self::Timeout { .. } | Self::Network { .. }
        )
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

// Conversions from common error types

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::config("json", e.to_string())
    }
}

impl From<hex::FromHexError> for RelayError {
    fn from(e: hex::FromHexError) -> Self {
        RelayError::decoding("hex", e.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::config("file", e.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::network(Stage::Broadcast, "request timed out")
        } else if e.is_connect() {
            RelayError::network(Stage::Broadcast, "connection failed")
        } else {
            RelayError::network(Stage::Broadcast, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage_and_field() {
        let err = RelayError::invalid_address(Stage::Authorization, "address", "zero address");
        let text = err.to_string();
        assert!(text.contains("[authorization]"));
        assert!(text.contains("`address`"));
        assert_eq!(err.field(), Some("address"));
        assert_eq!(err.code(), ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_node_rejection_carries_context() {
        let err = RelayError::NodeRejection {
            message: "nonce too low".to_string(),
            code: Some(-32000),
            nonce: 7,
            digest: [0xAB; 32],
        };
        assert_eq!(err.stage(), Stage::Broadcast);
        assert!(err.is_resubmittable());
        let text = err.to_string();
        assert!(text.contains("nonce 7"));
        assert!(text.contains("abababab"));
    }

    #[test]
    fn test_caller_bugs_are_not_resubmittable() {
        assert!(!RelayError::signing(Stage::Assembly, "bad key").is_resubmittable());
        assert!(!RelayError::encoding(Stage::Assembly, "r", "too wide").is_resubmittable());
        assert!(!RelayError::invalid_transaction("gas_limit", "zero").is_resubmittable());
    }

    #[test]
    fn test_at_stage_only_retags_network_errors() {
        let err = RelayError::network(Stage::Assembly, "connection failed").at_stage(Stage::Authorization);
        assert_eq!(err.stage(), Stage::Authorization);
        assert!(err.to_string().starts_with("[authorization] network error"));

        let err = RelayError::invalid_transaction("gas_limit", "zero").at_stage(Stage::Authorization);
        assert_eq!(err.stage(), Stage::Assembly);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::NodeRejection).unwrap();
        assert_eq!(json, "\"node_rejection\"");
        let stage = serde_json::to_string(&Stage::Confirmation).unwrap();
        assert_eq!(stage, "\"confirmation\"");
    }
}
