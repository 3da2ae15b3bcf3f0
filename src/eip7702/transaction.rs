//! EIP-7702 Transaction Building and Encoding
//!
//! Validates caller fields, attaches the authorization list and produces the
//! ordered field list
//! `[chain_id, nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit,
//!   to, value, data, access_list, authorization_list]`.

use super::authorization::{authorization_from_item, authorization_item};
use super::rlp::{encode_list, RlpItem};
use super::types::{AccessListEntry, Authorization, TxFields, UnsignedTransaction};
use crate::error::{RelayError, RelayResult, Stage};

/// Validate fields and attach a non-empty authorization list
pub fn build(fields: TxFields, authorization_list: Vec<Authorization>) -> RelayResult<UnsignedTransaction> {
    validate_fields(&fields)?;

    if authorization_list.is_empty() {
        return Err(RelayError::invalid_transaction(
            "authorization_list",
            "delegation requires at least one authorization",
        ));
    }

    for auth in &authorization_list {
        if auth.chain_id != 0 && auth.chain_id != fields.chain_id {
            return Err(RelayError::invalid_transaction(
                "authorization_list",
                format!(
                    "authorization for chain {} in a chain {} transaction",
                    auth.chain_id, fields.chain_id
                ),
            ));
        }
        if !auth.is_signed() {
            return Err(RelayError::invalid_transaction("authorization_list", "unsigned authorization"));
        }
        if auth.y_parity > 1 {
            return Err(RelayError::invalid_transaction(
                "authorization_list",
                format!("y_parity {} is not 0 or 1", auth.y_parity),
            ));
        }
        auth.address.ensure_non_zero(Stage::Assembly, "authorization_list.address")?;
    }

    Ok(UnsignedTransaction { fields, authorization_list })
}

fn validate_fields(fields: &TxFields) -> RelayResult<()> {
    if fields.gas_limit == 0 {
        return Err(RelayError::invalid_transaction("gas_limit", "must be greater than zero"));
    }
    if fields.max_fee_per_gas < fields.max_priority_fee_per_gas {
        return Err(RelayError::invalid_transaction(
            "max_fee_per_gas",
            format!(
                "{} is below max_priority_fee_per_gas {}",
                fields.max_fee_per_gas, fields.max_priority_fee_per_gas
            ),
        ));
    }
    fields.to.ensure_non_zero(Stage::Assembly, "to")?;
    Ok(())
}

/// Parse fields from JSON, rejecting unknown or missing keys
pub fn fields_from_json(json: &str) -> RelayResult<TxFields> {
    serde_json::from_str(json).map_err(|e| RelayError::invalid_transaction("fields", e.to_string()))
}

fn access_list_item(access_list: &[AccessListEntry]) -> RlpItem {
    RlpItem::List(
        access_list
            .iter()
            .map(|entry| {
                RlpItem::List(vec![
                    RlpItem::address(&entry.address),
                    RlpItem::List(entry.storage_keys.iter().map(|k| RlpItem::bytes(k)).collect()),
                ])
            })
            .collect(),
    )
}

/// The ten body fields in wire order
pub(crate) fn unsigned_items(tx: &UnsignedTransaction) -> Vec<RlpItem> {
    let f = &tx.fields;
    vec![
        RlpItem::uint_u64(f.chain_id),
        RlpItem::uint_u64(f.nonce),
        RlpItem::uint_u128(f.max_priority_fee_per_gas),
        RlpItem::uint_u128(f.max_fee_per_gas),
        RlpItem::uint_u64(f.gas_limit),
        RlpItem::address(&f.to),
        RlpItem::uint_u256(&f.value),
        RlpItem::bytes(&f.data),
        access_list_item(&f.access_list),
        RlpItem::List(tx.authorization_list.iter().map(authorization_item).collect()),
    ]
}

/// `rlp(unsigned field list)`
pub fn rlp_encode_transaction_for_signing(tx: &UnsignedTransaction) -> Vec<u8> {
    encode_list(&unsigned_items(tx))
}

/// Rebuild a transaction body from decoded items (first ten fields)
pub(crate) fn unsigned_from_items(items: &[RlpItem]) -> RelayResult<UnsignedTransaction> {
    if items.len() < 10 {
        return Err(RelayError::decoding("transaction", format!("{} fields, expected 10", items.len())));
    }

    let access_list = items[8]
        .as_list("access_list")?
        .iter()
        .map(|entry| {
            let pair = entry.as_list("access_list")?;
            if pair.len() != 2 {
                return Err(RelayError::decoding("access_list", "entry must be [address, keys]"));
            }
            let storage_keys = pair[1]
                .as_list("access_list")?
                .iter()
                .map(|k| {
                    let bytes = k.as_bytes("storage_key")?;
                    <[u8; 32]>::try_from(bytes)
                        .map_err(|_| RelayError::decoding("storage_key", "must be 32 bytes"))
                })
                .collect::<RelayResult<Vec<_>>>()?;
            Ok(AccessListEntry { address: pair[0].as_address("access_list")?, storage_keys })
        })
        .collect::<RelayResult<Vec<_>>>()?;

    let authorization_list = items[9]
        .as_list("authorization_list")?
        .iter()
        .map(authorization_from_item)
        .collect::<RelayResult<Vec<_>>>()?;

    let fields = TxFields {
        chain_id: items[0].as_u64("chain_id")?,
        nonce: items[1].as_u64("nonce")?,
        max_priority_fee_per_gas: items[2].as_u128("max_priority_fee_per_gas")?,
        max_fee_per_gas: items[3].as_u128("max_fee_per_gas")?,
        gas_limit: items[4].as_u64("gas_limit")?,
        to: items[5].as_address("to")?,
        value: items[6].as_u256("value")?,
        data: items[7].as_bytes("data")?.to_vec(),
        access_list,
    };

    Ok(UnsignedTransaction { fields, authorization_list })
}
