//! EIP-7702 Transaction Signing
//!
//! Computes the transaction digest, applies the payer's signature and emits
//! the raw wire bytes. Decoding is provided for inspection of raw payloads.

use super::authorization::signature_word;
use super::rlp::{decode, encode_list, RlpItem};
use super::transaction::{rlp_encode_transaction_for_signing, unsigned_from_items, unsigned_items};
use super::types::{RawTransaction, SignedTransaction, UnsignedTransaction, EIP7702_TX_TYPE, SIGNED_FIELD_COUNT};
use crate::error::{RelayError, RelayResult, Stage};
use crate::keys::{recover_signer, PrivateKey, Signature};
use crate::types::{keccak256, Address};

/// `keccak256(0x04 || rlp(unsigned fields))`
pub fn transaction_signing_hash(tx: &UnsignedTransaction) -> [u8; 32] {
    let rlp = rlp_encode_transaction_for_signing(tx);

    let mut data = Vec::with_capacity(1 + rlp.len());
    data.push(EIP7702_TX_TYPE);
    data.extend_from_slice(&rlp);

    keccak256(&data)
}

/// Sign the transaction with the paying key
pub fn sign_transaction(tx: &UnsignedTransaction, payer: &PrivateKey) -> RelayResult<SignedTransaction> {
    let signing_hash = transaction_signing_hash(tx);
    let signature = payer.sign_digest(&signing_hash, Stage::Assembly)?;

    Ok(SignedTransaction { tx: tx.clone(), signature })
}

impl SignedTransaction {
    /// `0x04 || rlp(unsigned fields ++ [y_parity, r, s])`
    pub fn raw(&self) -> RawTransaction {
        let mut items = unsigned_items(&self.tx);
        items.push(RlpItem::uint_u64(self.signature.y_parity as u64));
        items.push(signature_word(&self.signature.r));
        items.push(signature_word(&self.signature.s));

        let rlp = encode_list(&items);
        let mut encoded = Vec::with_capacity(1 + rlp.len());
        encoded.push(EIP7702_TX_TYPE);
        encoded.extend_from_slice(&rlp);

        RawTransaction(encoded)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        transaction_signing_hash(&self.tx)
    }
}

/// Sign and serialize in one step
pub fn assemble_and_sign(tx: &UnsignedTransaction, payer: &PrivateKey) -> RelayResult<RawTransaction> {
    Ok(sign_transaction(tx, payer)?.raw())
}

/// Recover the account that signed (and pays for) a transaction
pub fn recover_transaction_signer(signed: &SignedTransaction) -> RelayResult<Address> {
    recover_signer(&signed.signing_hash(), &signed.signature, Stage::Assembly)
}

/// Decode raw wire bytes back into a signed transaction
pub fn decode_raw_transaction(raw: &[u8]) -> RelayResult<SignedTransaction> {
    let (&tx_type, body) = raw
        .split_first()
        .ok_or_else(|| RelayError::decoding("type", "empty transaction"))?;
    if tx_type != EIP7702_TX_TYPE {
        return Err(RelayError::decoding(
            "type",
            format!("expected type 0x{:02x}, got 0x{:02x}", EIP7702_TX_TYPE, tx_type),
        ));
    }

    let decoded = decode(body)?;
    let items = decoded.as_list("transaction")?;
    if items.len() != SIGNED_FIELD_COUNT {
        return Err(RelayError::decoding(
            "transaction",
            format!("{} fields, expected {}", items.len(), SIGNED_FIELD_COUNT),
        ));
    }

    let tx = unsigned_from_items(&items[..10])?;

    let y_parity = items[10].as_u64("y_parity")?;
    if y_parity > 1 {
        return Err(RelayError::decoding("y_parity", format!("{} is not 0 or 1", y_parity)));
    }
    let signature = Signature {
        y_parity: y_parity as u8,
        r: items[11].as_word("r")?,
        s: items[12].as_word("s")?,
    };

    Ok(SignedTransaction { tx, signature })
}

/// Parse a `0x`-prefixed raw transaction
pub fn decode_raw_transaction_hex(raw_hex: &str) -> RelayResult<SignedTransaction> {
    let bytes = hex::decode(crate::types::strip_hex_prefix(raw_hex.trim()))
        .map_err(|e| RelayError::decoding("raw", format!("invalid hex: {}", e)))?;
    decode_raw_transaction(&bytes)
}
