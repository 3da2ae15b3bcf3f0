//! Shared types for the relay
//!
//! Values that cross module boundaries (addresses, 256-bit amounts,
//! transaction hashes) are defined here for consistent parsing and
//! serialization.

use crate::error::{RelayError, RelayResult, Stage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Strip an optional `0x` prefix
pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

// =============================================================================
// Address
// =============================================================================

/// 20-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Fail with `InvalidAddress` if this is the zero address
    pub fn ensure_non_zero(&self, stage: Stage, field: &'static str) -> RelayResult<()> {
        if self.is_zero() {
            return Err(RelayError::invalid_address(stage, field, "zero address"));
        }
        Ok(())
    }

    /// EIP-55 checksummed representation
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut result = String::from("0x");
        for (i, ch) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

            if ch.is_ascii_alphabetic() && nibble >= 8 {
                result.push(ch.to_ascii_uppercase());
            } else {
                result.push(ch);
            }
        }

        result
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(strip_hex_prefix(s.trim())).map_err(|e| {
            RelayError::invalid_address(Stage::Configuration, "address", format!("invalid hex: {}", e))
        })?;

        Address::from_slice(&bytes).ok_or_else(|| {
            RelayError::invalid_address(
                Stage::Configuration,
                "address",
                format!("expected 20 bytes, got {}", bytes.len()),
            )
        })
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// U256
// =============================================================================

/// 256-bit unsigned integer, little-endian limbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0, 0, 0, 0]);
    pub const MAX: U256 = U256([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    pub fn from_u64(value: u64) -> Self {
        U256([value, 0, 0, 0])
    }

    pub fn from_u128(value: u128) -> Self {
        U256([value as u64, (value >> 64) as u64, 0, 0])
    }

    /// Create from big-endian bytes; `None` if wider than 32 significant bytes
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        let significant = &bytes[start..];
        if significant.len() > 32 {
            return None;
        }

        let mut padded = [0u8; 32];
        padded[32 - significant.len()..].copy_from_slice(significant);

        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let offset = (3 - i) * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&padded[offset..offset + 8]);
            *limb = u64::from_be_bytes(word);
        }
        Some(U256(limbs))
    }

    /// Big-endian, 32 bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            let offset = (3 - i) * 8;
            bytes[offset..offset + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        bytes
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Narrow to u128 if the value fits
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[2] != 0 || self.0[3] != 0 {
            return None;
        }
        Some((self.0[1] as u128) << 64 | self.0[0] as u128)
    }

    pub fn checked_add(&self, other: U256) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = 0u64;

        for i in 0..4 {
            let (sum1, c1) = self.0[i].overflowing_add(other.0[i]);
            let (sum2, c2) = sum1.overflowing_add(carry);
            result[i] = sum2;
            carry = (c1 as u64) + (c2 as u64);
        }

        if carry != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    pub fn checked_mul_u64(&self, other: u64) -> Option<U256> {
        let mut result = [0u64; 4];
        let mut carry = 0u128;

        for i in 0..4 {
            let prod = (self.0[i] as u128) * (other as u128) + carry;
            result[i] = prod as u64;
            carry = prod >> 64;
        }

        if carry != 0 {
            None
        } else {
            Some(U256(result))
        }
    }

    /// Divide by a small divisor, returning (quotient, remainder)
    fn div_rem_u64(&self, divisor: u64) -> (U256, u64) {
        let mut quotient = [0u64; 4];
        let mut rem = 0u128;
        for i in (0..4).rev() {
            let cur = (rem << 64) | self.0[i] as u128;
            quotient[i] = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        (U256(quotient), rem as u64)
    }

    /// Parse a decimal string
    pub fn from_dec_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let mut result = U256::ZERO;
        for c in s.chars() {
            let digit = c.to_digit(10)?;
            result = result
                .checked_mul_u64(10)?
                .checked_add(U256::from_u64(digit as u64))?;
        }
        Some(result)
    }

    /// Parse a `0x`-prefixed hex quantity (odd length allowed)
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() {
            return Some(U256::ZERO);
        }
        let padded = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(padded).ok()?;
        U256::from_be_slice(&bytes)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256::from_u64(value)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        U256::from_u128(value)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut digits = Vec::new();
        let mut cur = *self;
        while !cur.is_zero() {
            let (q, r) = cur.div_rem_u64(10);
            digits.push(b'0' + r as u8);
            cur = q;
        }
        digits.reverse();
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}

impl FromStr for U256 {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if s.starts_with("0x") || s.starts_with("0X") {
            U256::from_hex_str(s)
        } else {
            U256::from_dec_str(s)
        };
        parsed.ok_or_else(|| {
            RelayError::encoding(Stage::Configuration, "uint256", format!("not a uint256: {}", s))
        })
    }
}

// Amounts are serialized as decimal strings; numbers are accepted on input.
impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(U256::from_u64(n)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Transaction hash
// =============================================================================

/// 32-byte transaction hash as returned by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(strip_hex_prefix(s.trim()))
            .map_err(|e| RelayError::decoding("tx_hash", format!("invalid hex: {}", e)))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| RelayError::decoding("tx_hash", format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(TxHash(arr))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hex-encoded byte strings in JSON (`0x...`)
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(super::strip_hex_prefix(&s)).map_err(serde::de::Error::custom)
    }
}
