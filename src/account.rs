use crate::constants::EMPTY_CODE_HASH;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance, nonce and code hash of an account. The code itself and the
/// storage live next to it in [`Account`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountInfo {
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code_hash == EMPTY_CODE_HASH
    }
}

/// An account as the VM sees it: info plus inline code and storage.
///
/// Storage uses a `BTreeMap` so iteration over a state delta is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub info: AccountInfo,
    pub code: Bytes,
    pub storage: BTreeMap<U256, U256>,
}

impl Account {
    pub fn new(balance: U256, code: Bytes, nonce: u64, storage: BTreeMap<U256, U256>) -> Self {
        Self {
            info: AccountInfo {
                balance,
                nonce,
                code_hash: code_hash(&code),
            },
            code,
            storage,
        }
    }

    pub fn has_nonce(&self) -> bool {
        self.info.nonce != 0
    }

    pub fn has_code(&self) -> bool {
        self.info.code_hash != EMPTY_CODE_HASH
    }

    /// Collision predicate for contract creation: deploying over an address
    /// that already has code or a used nonce must fail.
    pub fn has_code_or_nonce(&self) -> bool {
        self.has_code() || self.has_nonce()
    }

    /// An account is empty iff its nonce is zero, its balance is zero and
    /// it has no code.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.info.code_hash = code_hash(&code);
        self.code = code;
    }
}

fn code_hash(code: &Bytes) -> H256 {
    if code.is_empty() {
        EMPTY_CODE_HASH
    } else {
        keccak(code)
    }
}

/// A log record emitted by LOG0..LOG4. Append only: once emitted within a
/// frame it is never mutated, and it is dropped wholesale if the frame
/// reverts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_code_hashes_to_known_constant() {
        let account = Account::default();
        assert_eq!(account.info.code_hash, EMPTY_CODE_HASH);
        assert_eq!(keccak([]), EMPTY_CODE_HASH);
    }

    #[test]
    fn emptiness_requires_all_three() {
        let mut account = Account::default();
        assert!(account.is_empty());

        account.info.nonce = 1;
        assert!(!account.is_empty());
        assert!(account.has_code_or_nonce());

        account.info.nonce = 0;
        account.info.balance = U256::one();
        assert!(!account.is_empty());
        assert!(!account.has_code_or_nonce());
    }

    #[test]
    fn set_code_updates_hash() {
        let mut account = Account::default();
        account.set_code(Bytes::from_static(&[0x60, 0x00]));
        assert!(account.has_code());
        assert_eq!(account.info.code_hash, keccak([0x60, 0x00]));
    }
}
