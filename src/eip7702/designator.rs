//! Delegation designator
//!
//! Once an authorization is applied, the authorizing account's code becomes
//! `0xef0100 || delegate_address` (23 bytes).

use crate::types::Address;
use serde::Serialize;

pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

pub const DESIGNATOR_LEN: usize = 23;

/// Classification of an account's on-chain code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountCode {
    /// No code: a plain externally-owned account
    Eoa,
    /// EOA whose code points at a delegate contract
    Delegated { delegate: Address },
    /// Ordinary contract code (or anything unrecognized)
    Contract { code_len: usize },
}

pub fn parse_account_code(code: &[u8]) -> AccountCode {
    if code.is_empty() {
        return AccountCode::Eoa;
    }
    if code.len() == DESIGNATOR_LEN && code[..3] == DELEGATION_PREFIX {
        if let Some(delegate) = Address::from_slice(&code[3..]) {
            return AccountCode::Delegated { delegate };
        }
    }
    AccountCode::Contract { code_len: code.len() }
}

pub fn designator_for(delegate: &Address) -> [u8; DESIGNATOR_LEN] {
    let mut code = [0u8; DESIGNATOR_LEN];
    code[..3].copy_from_slice(&DELEGATION_PREFIX);
    code[3..].copy_from_slice(delegate.as_bytes());
    code
}
