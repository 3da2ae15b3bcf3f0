//! EIP-7702 Authorization Handling
//!
//! Builds the authorization digest, signs tuples and recovers their signers.

use super::rlp::{encode_list, RlpItem};
use super::types::{Authorization, AUTHORIZATION_MAGIC};
use crate::error::{RelayError, RelayResult, Stage};
use crate::keys::{recover_signer, PrivateKey};
use crate::types::{keccak256, Address};

/// `rlp([chain_id, address, nonce])`
pub fn rlp_encode_authorization_for_signing(chain_id: u64, address: &Address, nonce: u64) -> Vec<u8> {
    encode_list(&[
        RlpItem::uint_u64(chain_id),
        RlpItem::address(address),
        RlpItem::uint_u64(nonce),
    ])
}

/// `keccak256(0x05 || rlp([chain_id, address, nonce]))`
pub fn authorization_signing_hash(chain_id: u64, address: &Address, nonce: u64) -> [u8; 32] {
    let rlp = rlp_encode_authorization_for_signing(chain_id, address, nonce);

    let mut data = Vec::with_capacity(1 + rlp.len());
    data.push(AUTHORIZATION_MAGIC);
    data.extend_from_slice(&rlp);

    keccak256(&data)
}

/// Sign an authorization delegating the signer's account to `delegate`
///
/// Deterministic: identical inputs always produce the identical tuple.
/// A zero delegate is rejected before any digest is computed.
pub fn sign_authorization(
    signer: &PrivateKey,
    chain_id: u64,
    delegate: Address,
    nonce: u64,
) -> RelayResult<Authorization> {
    delegate.ensure_non_zero(Stage::Authorization, "address")?;

    let hash = authorization_signing_hash(chain_id, &delegate, nonce);
    let signature = signer.sign_digest(&hash, Stage::Authorization)?;

    Ok(Authorization {
        chain_id,
        address: delegate,
        nonce,
        y_parity: signature.y_parity,
        r: signature.r,
        s: signature.s,
    })
}

/// Recover the account that signed an authorization
pub fn recover_authorization_signer(auth: &Authorization) -> RelayResult<Address> {
    if !auth.is_signed() {
        return Err(RelayError::signing(Stage::Authorization, "authorization is not signed"));
    }

    let hash = authorization_signing_hash(auth.chain_id, &auth.address, auth.nonce);
    recover_signer(&hash, &auth.signature(), Stage::Authorization)
}

/// Check an authorization was signed by `expected_signer`
pub fn verify_authorization(auth: &Authorization, expected_signer: &Address) -> RelayResult<bool> {
    let recovered = recover_authorization_signer(auth)?;
    Ok(recovered == *expected_signer)
}

/// Encode a signed tuple as `[chain_id, address, nonce, y_parity, r, s]`
pub(crate) fn authorization_item(auth: &Authorization) -> RlpItem {
    RlpItem::List(vec![
        RlpItem::uint_u64(auth.chain_id),
        RlpItem::address(&auth.address),
        RlpItem::uint_u64(auth.nonce),
        RlpItem::uint_u64(auth.y_parity as u64),
        signature_word(&auth.r),
        signature_word(&auth.s),
    ])
}

/// r and s go on the wire as canonical uint256 values
pub(crate) fn signature_word(word: &[u8; 32]) -> RlpItem {
    let start = word.iter().position(|&b| b != 0).unwrap_or(32);
    RlpItem::Bytes(word[start..].to_vec())
}

/// Inverse of [`authorization_item`]
pub(crate) fn authorization_from_item(item: &RlpItem) -> RelayResult<Authorization> {
    let fields = item.as_list("authorization_list")?;
    if fields.len() != 6 {
        return Err(RelayError::decoding(
            "authorization_list",
            format!("tuple has {} fields, expected 6", fields.len()),
        ));
    }

    let y_parity = fields[3].as_u64("y_parity")?;
    if y_parity > 1 {
        return Err(RelayError::decoding("y_parity", format!("{} is not 0 or 1", y_parity)));
    }

    Ok(Authorization {
        chain_id: fields[0].as_u64("chain_id")?,
        address: fields[1].as_address("address")?,
        nonce: fields[2].as_u64("nonce")?,
        y_parity: y_parity as u8,
        r: fields[4].as_word("r")?,
        s: fields[5].as_word("s")?,
    })
}
