//! Canonical RLP encoding
//!
//! The single place where integers are turned into wire bytes. Any divergence
//! from canonical form changes a digest and invalidates every signature
//! downstream, so all integer trimming goes through here.

use crate::error::{RelayError, RelayResult, Stage};
use crate::types::{Address, U256};

/// A node in an RLP structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Canonical integer item
    pub fn uint_u64(value: u64) -> Self {
        RlpItem::Bytes(encode_uint_u64(value))
    }

    pub fn uint_u128(value: u128) -> Self {
        RlpItem::Bytes(encode_uint_u128(value))
    }

    pub fn uint_u256(value: &U256) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    pub fn address(address: &Address) -> Self {
        RlpItem::Bytes(address.0.to_vec())
    }

    pub fn bytes(data: &[u8]) -> Self {
        RlpItem::Bytes(data.to_vec())
    }

    /// Encode this item and everything below it
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            RlpItem::Bytes(data) => {
                if data.len() == 1 && data[0] < 0x80 {
                    out.push(data[0]);
                } else {
                    write_prefix(out, data.len(), 0x80);
                    out.extend_from_slice(data);
                }
            }
            RlpItem::List(items) => {
                let mut payload = Vec::new();
                for item in items {
                    item.encode_into(&mut payload);
                }
                write_prefix(out, payload.len(), 0xc0);
                out.extend_from_slice(&payload);
            }
        }
    }

    pub fn as_bytes(&self, field: &'static str) -> RelayResult<&[u8]> {
        match self {
            RlpItem::Bytes(data) => Ok(data),
            RlpItem::List(_) => Err(RelayError::decoding(field, "expected a string, found a list")),
        }
    }

    pub fn as_list(&self, field: &'static str) -> RelayResult<&[RlpItem]> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(RelayError::decoding(field, "expected a list, found a string")),
        }
    }

    fn as_canonical_uint(&self, field: &'static str, max_width: usize) -> RelayResult<&[u8]> {
        let data = self.as_bytes(field)?;
        if data.first() == Some(&0) {
            return Err(RelayError::decoding(field, "non-canonical integer (leading zero byte)"));
        }
        if data.len() > max_width {
            return Err(RelayError::decoding(
                field,
                format!("integer is {} bytes, limit is {}", data.len(), max_width),
            ));
        }
        Ok(data)
    }

    pub fn as_u64(&self, field: &'static str) -> RelayResult<u64> {
        let data = self.as_canonical_uint(field, 8)?;
        Ok(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub fn as_u128(&self, field: &'static str) -> RelayResult<u128> {
        let data = self.as_canonical_uint(field, 16)?;
        Ok(data.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    pub fn as_u256(&self, field: &'static str) -> RelayResult<U256> {
        let data = self.as_canonical_uint(field, 32)?;
        U256::from_be_slice(data).ok_or_else(|| RelayError::decoding(field, "wider than 256 bits"))
    }

    /// A canonical integer of at most 32 bytes, left-padded to 32
    pub fn as_word(&self, field: &'static str) -> RelayResult<[u8; 32]> {
        let data = self.as_canonical_uint(field, 32)?;
        let mut word = [0u8; 32];
        word[32 - data.len()..].copy_from_slice(data);
        Ok(word)
    }

    pub fn as_address(&self, field: &'static str) -> RelayResult<Address> {
        let data = self.as_bytes(field)?;
        Address::from_slice(data)
            .ok_or_else(|| RelayError::decoding(field, format!("expected 20 bytes, got {}", data.len())))
    }
}

/// Encode an ordered sequence as an RLP list
pub fn encode_list(items: &[RlpItem]) -> Vec<u8> {
    let mut payload = Vec::new();
    for item in items {
        item.encode_into(&mut payload);
    }
    let mut out = Vec::with_capacity(payload.len() + 9);
    write_prefix(&mut out, payload.len(), 0xc0);
    out.extend_from_slice(&payload);
    out
}

// =============================================================================
// Canonical integers
// =============================================================================

/// Minimal big-endian bytes of `value`; zero is the empty string
pub fn encode_uint_u64(value: u64) -> Vec<u8> {
    trim_leading_zeros(&value.to_be_bytes()).to_vec()
}

pub fn encode_uint_u128(value: u128) -> Vec<u8> {
    trim_leading_zeros(&value.to_be_bytes()).to_vec()
}

/// Canonical form of a big-endian integer that must fit in `max_width` bytes
pub fn encode_uint_be(bytes: &[u8], max_width: usize, stage: Stage, field: &'static str) -> RelayResult<Vec<u8>> {
    let trimmed = trim_leading_zeros(bytes);
    if trimmed.len() > max_width {
        return Err(RelayError::encoding(
            stage,
            field,
            format!("{} significant bytes do not fit in {}", trimmed.len(), max_width),
        ));
    }
    Ok(trimmed.to_vec())
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn write_prefix(out: &mut Vec<u8>, len: usize, offset: u8) {
    if len < 56 {
        out.push(offset + len as u8);
    } else {
        let len_bytes = encode_uint_u64(len as u64);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Strictly decode a single RLP item spanning all of `input`
pub fn decode(input: &[u8]) -> RelayResult<RlpItem> {
    let (item, consumed) = decode_item(input)?;
    if consumed != input.len() {
        return Err(RelayError::decoding(
            "rlp",
            format!("{} trailing bytes after item", input.len() - consumed),
        ));
    }
    Ok(item)
}

fn decode_item(input: &[u8]) -> RelayResult<(RlpItem, usize)> {
    let prefix = *input
        .first()
        .ok_or_else(|| RelayError::decoding("rlp", "unexpected end of input"))?;

    match prefix {
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![prefix]), 1)),
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            let data = take(input, 1, len)?;
            if len == 1 && data[0] < 0x80 {
                return Err(RelayError::decoding("rlp", "single byte below 0x80 must not be prefixed"));
            }
            Ok((RlpItem::Bytes(data.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - 0xb7) as usize;
            let len = read_long_length(input, len_of_len)?;
            let data = take(input, 1 + len_of_len, len)?;
            Ok((RlpItem::Bytes(data.to_vec()), 1 + len_of_len + len))
        }
        0xc0..=0xf7 => {
            let len = (prefix - 0xc0) as usize;
            let payload = take(input, 1, len)?;
            Ok((RlpItem::List(decode_payload(payload)?), 1 + len))
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            let len = read_long_length(input, len_of_len)?;
            let payload = take(input, 1 + len_of_len, len)?;
            Ok((RlpItem::List(decode_payload(payload)?), 1 + len_of_len + len))
        }
    }
}

fn decode_payload(mut payload: &[u8]) -> RelayResult<Vec<RlpItem>> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_item(payload)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

fn read_long_length(input: &[u8], len_of_len: usize) -> RelayResult<usize> {
    let len_bytes = take(input, 1, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(RelayError::decoding("rlp", "length prefix has leading zero"));
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(RelayError::decoding("rlp", "length prefix too wide"));
    }
    let len = len_bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len < 56 {
        return Err(RelayError::decoding("rlp", "long form used for short payload"));
    }
    Ok(len)
}

fn take(input: &[u8], offset: usize, len: usize) -> RelayResult<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| RelayError::decoding("rlp", "length overflow"))?;
    input
        .get(offset..end)
        .ok_or_else(|| RelayError::decoding("rlp", "payload shorter than declared length"))
}
