use crate::{account::Account, errors::DatabaseError};
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

pub mod gen_db;

/// Read-only source of world state the VM executes against. Implemented by
/// the host (trie-backed store, RPC snapshot, ...); all mutation happens in
/// the [`gen_db::GeneralizedDatabase`] cache layered on top.
pub trait Database: Send + Sync {
    /// Account at `address`; an empty default if it does not exist.
    fn get_account(&self, address: Address) -> Result<Account, DatabaseError>;
    /// Whether an account exists at all. Pre-EIP-161 gas rules distinguish
    /// nonexistent accounts from existing-but-empty ones.
    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError>;
    /// Storage slot value; zero for unset keys.
    fn get_storage(&self, address: Address, key: U256) -> Result<U256, DatabaseError>;
    /// Hash of a recent block, for the BLOCKHASH opcode.
    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError>;
}

/// Simple map-backed store for tests and standalone execution.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDb {
    accounts: FxHashMap<Address, Account>,
    block_hashes: FxHashMap<u64, H256>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Address, account: Account) -> Self {
        self.accounts.insert(address, account);
        self
    }

    pub fn add_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn add_block_hash(&mut self, block_number: u64, hash: H256) {
        self.block_hashes.insert(block_number, hash);
    }
}

impl Database for InMemoryDb {
    fn get_account(&self, address: Address) -> Result<Account, DatabaseError> {
        Ok(self.accounts.get(&address).cloned().unwrap_or_default())
    }

    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn get_storage(&self, address: Address, key: U256) -> Result<U256, DatabaseError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or_default())
    }

    fn get_block_hash(&self, block_number: u64) -> Result<H256, DatabaseError> {
        Ok(self
            .block_hashes
            .get(&block_number)
            .copied()
            .unwrap_or_default())
    }
}
