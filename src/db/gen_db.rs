use crate::{
    account::Account,
    call_frame::CallFrameBackup,
    db::Database,
    errors::VMError,
};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Accounts the VM has loaded or mutated during execution. After a
/// successful run this *is* the state delta the host applies.
pub type CacheDB = FxHashMap<Address, Account>;

/// Mutable world view: a write-back account cache over a read-only
/// [`Database`]. Frames journal their mutations in a [`CallFrameBackup`];
/// [`Self::undo_backup`] replays one to roll a failed frame back.
pub struct GeneralizedDatabase {
    pub store: Arc<dyn Database>,
    pub cache: CacheDB,
}

impl GeneralizedDatabase {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self {
            store,
            cache: CacheDB::default(),
        }
    }

    /// Account at `address`, pulling it into the cache on first access.
    pub fn get_account(&mut self, address: Address) -> Result<&Account, VMError> {
        if !self.cache.contains_key(&address) {
            let account = self.store.get_account(address)?;
            self.cache.insert(address, account);
        }
        // Just inserted above if it was missing.
        self.cache
            .get(&address)
            .ok_or_else(|| crate::errors::InternalError::Slicing.into())
    }

    /// Mutable account access. Callers are responsible for journaling the
    /// original via [`CallFrameBackup`] *before* mutating.
    pub fn get_account_mut(&mut self, address: Address) -> Result<&mut Account, VMError> {
        if !self.cache.contains_key(&address) {
            let account = self.store.get_account(address)?;
            self.cache.insert(address, account);
        }
        self.cache
            .get_mut(&address)
            .ok_or_else(|| crate::errors::InternalError::Slicing.into())
    }

    /// Account as currently visible, without touching the cache. `None`
    /// means it exists neither in the cache nor in the backing store.
    pub fn peek_account(&self, address: Address) -> Result<Option<Account>, VMError> {
        if let Some(account) = self.cache.get(&address) {
            return Ok(Some(account.clone()));
        }
        if self.store.account_exists(address)? {
            return Ok(Some(self.store.get_account(address)?));
        }
        Ok(None)
    }

    pub fn account_exists(&self, address: Address) -> Result<bool, VMError> {
        if self.cache.contains_key(&address) {
            return Ok(true);
        }
        Ok(self.store.account_exists(address)?)
    }

    pub fn get_balance(&mut self, address: Address) -> Result<U256, VMError> {
        Ok(self.get_account(address)?.info.balance)
    }

    pub fn get_nonce(&mut self, address: Address) -> Result<u64, VMError> {
        Ok(self.get_account(address)?.info.nonce)
    }

    pub fn get_code(&mut self, address: Address) -> Result<Bytes, VMError> {
        Ok(self.get_account(address)?.code.clone())
    }

    pub fn get_code_hash(&mut self, address: Address) -> Result<H256, VMError> {
        Ok(self.get_account(address)?.info.code_hash)
    }

    /// Current value of a storage slot: a cached write if there is one,
    /// otherwise the committed value from the store.
    pub fn get_storage_value(&mut self, address: Address, key: U256) -> Result<U256, VMError> {
        if let Some(account) = self.cache.get(&address) {
            if let Some(value) = account.storage.get(&key) {
                return Ok(*value);
            }
        }
        Ok(self.store.get_storage(address, key)?)
    }

    /// Roll the cache back to the originals a frame recorded.
    pub fn undo_backup(&mut self, backup: &CallFrameBackup) {
        for (address, original) in &backup.original_accounts {
            match original {
                Some(account) => {
                    self.cache.insert(*address, account.clone());
                }
                None => {
                    self.cache.remove(address);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryDb;

    #[test]
    fn undo_backup_restores_and_removes() {
        let store = InMemoryDb::new().with_account(
            Address::from_low_u64_be(1),
            Account::new(U256::from(100), Bytes::new(), 0, Default::default()),
        );
        let mut db = GeneralizedDatabase::new(Arc::new(store));

        let existing = Address::from_low_u64_be(1);
        let fresh = Address::from_low_u64_be(2);

        let mut backup = CallFrameBackup::default();
        backup.backup_account(existing, db.peek_account(existing).unwrap());
        backup.backup_account(fresh, db.peek_account(fresh).unwrap());

        db.get_account_mut(existing).unwrap().info.balance = U256::from(1);
        db.get_account_mut(fresh).unwrap().info.balance = U256::from(7);

        db.undo_backup(&backup);

        assert_eq!(db.get_balance(existing).unwrap(), U256::from(100));
        assert!(!db.cache.contains_key(&fresh));
    }

    #[test]
    fn storage_reads_fall_through_to_store() {
        let mut account = Account::default();
        account.storage.insert(U256::from(1), U256::from(42));
        let store = InMemoryDb::new().with_account(Address::from_low_u64_be(1), account);
        let mut db = GeneralizedDatabase::new(Arc::new(store));

        let address = Address::from_low_u64_be(1);
        // Cached account without the slot still reads through.
        db.get_account(address).unwrap();
        db.get_account_mut(address).unwrap().storage.clear();
        assert_eq!(
            db.get_storage_value(address, U256::from(1)).unwrap(),
            U256::from(42)
        );
    }
}
