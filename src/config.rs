//! Relay Configuration
//!
//! An explicit value loaded from a JSON file and passed into the relayer.
//! Private keys are never part of it.

use crate::error::{RelayError, RelayResult, Stage};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::time::Duration;
use url::{Host, Url};

pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Gas parameters for relayed transactions
///
/// Fee overrides are all-or-nothing; without them the node's estimate is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GasSettings {
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub max_fee_per_gas: Option<u128>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<u128>,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self { gas_limit: DEFAULT_GAS_LIMIT, max_fee_per_gas: None, max_priority_fee_per_gas: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Delegate contract that authorizations point at
    pub delegate: Address,
    #[serde(default)]
    pub gas: GasSettings,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_receipt_timeout_secs() -> u64 {
    DEFAULT_RECEIPT_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl RelayConfig {
    /// Config with default gas and timing settings
    pub fn new(rpc_url: impl Into<String>, chain_id: u64, delegate: Address) -> RelayResult<Self> {
        let config = Self {
            rpc_url: rpc_url.into(),
            chain_id,
            delegate,
            gas: GasSettings::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> RelayResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| RelayError::config("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> RelayResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RelayError::config("config", format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> RelayResult<()> {
        validate_rpc_url(&self.rpc_url)?;

        if self.chain_id == 0 {
            return Err(RelayError::config("chain_id", "must be non-zero"));
        }
        self.delegate.ensure_non_zero(Stage::Configuration, "delegate")?;

        if self.gas.gas_limit == 0 {
            return Err(RelayError::config("gas.gas_limit", "must be greater than zero"));
        }
        match (self.gas.max_fee_per_gas, self.gas.max_priority_fee_per_gas) {
            (Some(max), Some(tip)) if max < tip => {
                return Err(RelayError::config(
                    "gas.max_fee_per_gas",
                    format!("{} is below max_priority_fee_per_gas {}", max, tip),
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(RelayError::config(
                    "gas",
                    "set both max_fee_per_gas and max_priority_fee_per_gas, or neither",
                ));
            }
            _ => {}
        }

        if self.poll_interval_ms == 0 {
            return Err(RelayError::config("poll_interval_ms", "must be greater than zero"));
        }
        if self.receipt_timeout_secs == 0 {
            return Err(RelayError::config("receipt_timeout_secs", "must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(RelayError::config("request_timeout_secs", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// http(s) only; plain http is allowed for loopback nodes
fn validate_rpc_url(rpc_url: &str) -> RelayResult<()> {
    let parsed = Url::parse(rpc_url).map_err(|e| RelayError::config("rpc_url", format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        "http" => Err(RelayError::config("rpc_url", "https required for remote endpoints")),
        other => Err(RelayError::config("rpc_url", format!("unsupported scheme `{}`", other))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip == Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(ip)) => ip == Ipv6Addr::LOCALHOST,
        None => false,
    }
}
