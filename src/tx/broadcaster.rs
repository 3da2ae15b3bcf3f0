//! Transaction Broadcaster
//!
//! JSON-RPC 2.0 node client over blocking `reqwest`, and the single
//! best-effort `submit` call. Nothing here retries or bumps fees.

use super::{FeeEstimate, NodeClient, Receipt};
use crate::config::RelayConfig;
use crate::eip7702::{RawTransaction, SignedTransaction};
use crate::error::{RelayError, RelayResult, Stage};
use crate::types::{strip_hex_prefix, Address, TxHash};
use crate::{log_debug, log_info, log_warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// Submission
// =============================================================================

/// Broadcast a signed transaction once.
///
/// A node rejection comes back with the transaction's nonce and signing
/// digest attached so the caller can rebuild with fresh data.
pub fn submit<N: NodeClient>(node: &N, signed: &SignedTransaction) -> RelayResult<TxHash> {
    let raw = signed.raw();
    let expected = raw.hash();
    let nonce = signed.tx.nonce();

    log_info!("broadcaster", "submitting transaction", tx_hash = expected, nonce = nonce);

    let hash = node
        .send_raw_transaction(&raw)
        .map_err(|e| attach_context(e, nonce, signed.signing_hash()))?;

    if hash != expected {
        log_warn!(
            "broadcaster",
            "node returned unexpected hash",
            tx_hash = hash,
            expected_hash = expected
        );
    }
    Ok(hash)
}

fn attach_context(err: RelayError, nonce: u64, digest: [u8; 32]) -> RelayError {
    match err {
        RelayError::NodeRejection { message, code, .. } => {
            RelayError::NodeRejection { message, code, nonce, digest }
        }
        other => other,
    }
}

// =============================================================================
// JSON-RPC client
// =============================================================================

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Blocking JSON-RPC node client
pub struct JsonRpcNode {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcNode {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eip7702-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::config("rpc_url", format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, url: url.into(), next_id: AtomicU64::new(1) })
    }

    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        Self::new(config.rpc_url.as_str(), config.request_timeout())
    }

    fn request(&self, method: &str, params: Value, stage: Stage) -> RelayResult<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log_debug!("rpc", "request", method = method, id = id);

        let response = self
            .client
            .post(&self.url)
            .json(&RpcRequest { jsonrpc: "2.0", method, params, id })
            .send()
            .map_err(|e| RelayError::from(e).at_stage(stage))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::network(stage, format!("{} returned HTTP {}", method, status)));
        }

        response
            .json::<RpcResponse>()
            .map_err(|e| RelayError::network(stage, format!("malformed {} response: {}", method, e)))
    }

    fn call(&self, method: &str, params: Value, stage: Stage) -> RelayResult<Value> {
        let response = self.request(method, params, stage)?;
        if let Some(error) = response.error {
            return Err(RelayError::network(
                stage,
                format!("{} failed ({}): {}", method, error.code, error.message),
            ));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

impl NodeClient for JsonRpcNode {
    fn chain_id(&self) -> RelayResult<u64> {
        let result = self.call("eth_chainId", json!([]), Stage::Configuration)?;
        quantity_u64(&result, "chain_id", Stage::Configuration)
    }

    fn get_nonce(&self, address: &Address) -> RelayResult<u64> {
        let result = self.call(
            "eth_getTransactionCount",
            json!([address.to_string(), "pending"]),
            Stage::Assembly,
        )?;
        quantity_u64(&result, "nonce", Stage::Assembly)
    }

    fn get_fee_estimate(&self) -> RelayResult<FeeEstimate> {
        let tip = self.call("eth_maxPriorityFeePerGas", json!([]), Stage::Assembly)?;
        let tip = quantity_u128(&tip, "max_priority_fee_per_gas", Stage::Assembly)?;

        let block = self.call("eth_getBlockByNumber", json!(["latest", false]), Stage::Assembly)?;
        let base_fee = block
            .get("baseFeePerGas")
            .ok_or_else(|| RelayError::network(Stage::Assembly, "latest block has no baseFeePerGas"))?;
        let base_fee = quantity_u128(base_fee, "base_fee_per_gas", Stage::Assembly)?;

        FeeEstimate::from_base_fee(base_fee, tip)
            .ok_or_else(|| RelayError::encoding(Stage::Assembly, "max_fee_per_gas", "fee estimate overflows"))
    }

    fn send_raw_transaction(&self, raw: &RawTransaction) -> RelayResult<TxHash> {
        let response = self.request("eth_sendRawTransaction", json!([raw.to_hex()]), Stage::Broadcast)?;

        if let Some(error) = response.error {
            return Err(RelayError::NodeRejection {
                message: error.message,
                code: Some(error.code),
                nonce: 0,
                digest: [0u8; 32],
            });
        }

        let result = response
            .result
            .ok_or_else(|| RelayError::network(Stage::Broadcast, "no transaction hash in response"))?;
        let text = result
            .as_str()
            .ok_or_else(|| RelayError::network(Stage::Broadcast, "transaction hash is not a string"))?;
        text.parse()
    }

    fn get_transaction_receipt(&self, hash: &TxHash) -> RelayResult<Option<Receipt>> {
        let result = self.call("eth_getTransactionReceipt", json!([hash.to_hex()]), Stage::Confirmation)?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }

    fn get_code(&self, address: &Address) -> RelayResult<Vec<u8>> {
        let result = self.call("eth_getCode", json!([address.to_string(), "latest"]), Stage::Configuration)?;
        let text = result
            .as_str()
            .ok_or_else(|| RelayError::network(Stage::Configuration, "code is not a string"))?;
        hex::decode(strip_hex_prefix(text)).map_err(|e| RelayError::decoding("code", e.to_string()))
    }
}

// =============================================================================
// Response parsing
// =============================================================================

fn quantity_u128(value: &Value, field: &'static str, stage: Stage) -> RelayResult<u128> {
    let text = value
        .as_str()
        .ok_or_else(|| RelayError::network(stage, format!("`{}` is not a hex quantity", field)))?;
    let digits = strip_hex_prefix(text);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RelayError::network(stage, format!("invalid `{}` {}: {}", field, text, e)))
}

fn quantity_u64(value: &Value, field: &'static str, stage: Stage) -> RelayResult<u64> {
    let wide = quantity_u128(value, field, stage)?;
    u64::try_from(wide).map_err(|_| RelayError::network(stage, format!("`{}` exceeds 64 bits", field)))
}

fn parse_receipt(value: &Value) -> RelayResult<Receipt> {
    let stage = Stage::Confirmation;
    let field = |name: &'static str| {
        value
            .get(name)
            .ok_or_else(|| RelayError::network(stage, format!("receipt has no `{}`", name)))
    };

    let tx_hash = field("transactionHash")?
        .as_str()
        .ok_or_else(|| RelayError::network(stage, "receipt hash is not a string"))?
        .parse()?;

    Ok(Receipt {
        tx_hash,
        block_number: quantity_u64(field("blockNumber")?, "block_number", stage)?,
        gas_used: quantity_u64(field("gasUsed")?, "gas_used", stage)?,
        success: quantity_u64(field("status")?, "status", stage)? == 1,
    })
}
