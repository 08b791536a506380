//! A [Storage] implementation backed by a directory of JSON files.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    Account, AccountName, Error, MultiFilter, Storage, Transaction,
    import::is_known_importer,
    storage::{
        files::{
            GLOBAL_FILTERS_RECORD, account_filters_record, account_id_from_record, account_record,
            read_record, remove_record, transactions_record, write_record,
        },
        id::{new_id, validate_id},
    },
};

/// Stores records as files in one directory.
///
/// A single reader/writer lock guards the whole directory: reads run
/// concurrently with each other, every write runs alone. The lock does not
/// coordinate with other processes, only one process should use a directory.
#[derive(Debug)]
pub struct DirStorage {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl DirStorage {
    /// Use the existing directory `dir` for storage.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    /// Use `dir` for storage, creating it if it does not exist.
    ///
    /// # Errors
    /// Returns [Error::Io] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!("using data directory {dir:?}");

        Ok(Self::new(dir))
    }

    /// The directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, ()>, Error> {
        self.lock.read().map_err(|error| {
            tracing::error!("could not acquire storage lock: {error}");
            Error::StorageLock
        })
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, ()>, Error> {
        self.lock.write().map_err(|error| {
            tracing::error!("could not acquire storage lock: {error}");
            Error::StorageLock
        })
    }

    /// Check that `account_id` is well formed and refers to an existing account.
    ///
    /// The caller must hold the lock.
    fn check_account_id(&self, account_id: &str) -> Result<(), Error> {
        validate_id(account_id)?;

        if self.dir.join(account_record(account_id)).try_exists()? {
            Ok(())
        } else {
            Err(Error::AccountNotFound(account_id.to_owned()))
        }
    }

    fn read_transactions(&self, account_id: &str) -> Result<Vec<Transaction>, Error> {
        Ok(read_record(&self.dir, &transactions_record(account_id))?.unwrap_or_default())
    }

    fn write_transactions(
        &self,
        account_id: &str,
        mut transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, Error> {
        let mut assigned = 0;
        for transaction in transactions.iter_mut().filter(|t| t.is_new()) {
            transaction.id = new_id();
            assigned += 1;
        }

        write_record(&self.dir, &transactions_record(account_id), &transactions)?;
        tracing::debug!(
            "stored {} transactions for account {account_id}, {assigned} new",
            transactions.len()
        );

        Ok(transactions)
    }

    fn read_filters(&self, name: &str) -> Result<MultiFilter, Error> {
        Ok(read_record(&self.dir, name)?.unwrap_or_default())
    }
}

impl Storage for DirStorage {
    fn accounts(&self) -> Result<Vec<Account>, Error> {
        let _guard = self.read_lock()?;

        let mut accounts = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if account_id_from_record(file_name).is_none() {
                continue;
            }

            if let Some(account) = read_record::<Account>(&self.dir, file_name)? {
                accounts.push(account);
            }
        }

        Ok(accounts)
    }

    fn account(&self, account_id: &str) -> Result<Account, Error> {
        let _guard = self.read_lock()?;
        validate_id(account_id)?;

        read_record(&self.dir, &account_record(account_id))?
            .ok_or_else(|| Error::AccountNotFound(account_id.to_owned()))
    }

    fn add_account(&self, name: &str, importer_id: &str) -> Result<Account, Error> {
        let name = AccountName::new(name)?;
        if !is_known_importer(importer_id) {
            return Err(Error::UnknownImporter(importer_id.to_owned()));
        }

        let _guard = self.write_lock()?;

        let account = Account {
            id: new_id(),
            name,
            importer_id: importer_id.to_owned(),
        };
        write_record(&self.dir, &account_record(&account.id), &account)?;
        tracing::info!("created account {} ({})", account.id, account.name);

        Ok(account)
    }

    fn transactions(&self, account_id: &str) -> Result<Vec<Transaction>, Error> {
        let _guard = self.read_lock()?;
        self.check_account_id(account_id)?;

        self.read_transactions(account_id)
    }

    fn set_transactions(
        &self,
        account_id: &str,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, Error> {
        let _guard = self.write_lock()?;
        self.check_account_id(account_id)?;

        self.write_transactions(account_id, transactions)
    }

    fn update_transactions(
        &self,
        account_id: &str,
        update: &mut dyn FnMut(Vec<Transaction>) -> Result<Vec<Transaction>, Error>,
    ) -> Result<Vec<Transaction>, Error> {
        let _guard = self.write_lock()?;
        self.check_account_id(account_id)?;

        let current = self.read_transactions(account_id)?;
        let updated = update(current)?;

        self.write_transactions(account_id, updated)
    }

    fn account_filters(&self, account_id: &str) -> Result<MultiFilter, Error> {
        let _guard = self.read_lock()?;
        self.check_account_id(account_id)?;

        self.read_filters(&account_filters_record(account_id))
    }

    fn set_account_filters(&self, account_id: &str, filters: &MultiFilter) -> Result<(), Error> {
        filters.validate()?;

        let _guard = self.write_lock()?;
        self.check_account_id(account_id)?;

        write_record(&self.dir, &account_filters_record(account_id), filters)
    }

    fn delete_account(&self, account_id: &str) -> Result<(), Error> {
        let _guard = self.write_lock()?;
        self.check_account_id(account_id)?;

        fs::remove_file(self.dir.join(account_record(account_id)))?;

        // The account is already gone, leftover records are never read on their own.
        for name in [
            transactions_record(account_id),
            account_filters_record(account_id),
        ] {
            if let Err(error) = remove_record(&self.dir, &name) {
                tracing::warn!("could not remove {name} of deleted account {account_id}: {error}");
            }
        }

        tracing::info!("deleted account {account_id}");

        Ok(())
    }

    fn global_filters(&self) -> Result<MultiFilter, Error> {
        let _guard = self.read_lock()?;

        self.read_filters(GLOBAL_FILTERS_RECORD)
    }

    fn set_global_filters(&self, filters: &MultiFilter) -> Result<(), Error> {
        filters.validate()?;

        let _guard = self.write_lock()?;

        write_record(&self.dir, GLOBAL_FILTERS_RECORD, filters)
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use tempfile::TempDir;

    use super::DirStorage;

    /// A storage in a fresh temporary directory, deleted when the [TempDir] is dropped.
    pub(crate) fn get_test_storage() -> (TempDir, DirStorage) {
        let dir = tempfile::tempdir().expect("Could not create temporary directory");
        let storage = DirStorage::new(dir.path());

        (dir, storage)
    }
}





#[cfg(test)]
mod delete_account_tests {
    use std::fs;

    use time::macros::datetime;

    use crate::{Error, MultiFilter, Storage, Transaction};

    use super::test_utils::get_test_storage;

    #[test]
    fn removes_account_and_its_records() {
        let (dir, storage) = get_test_storage();
        let account = storage.add_account("Checking", "wellsfargocsv").unwrap();
        let other = storage.add_account("Savings", "wellsfargocsv").unwrap();
        storage
            .set_transactions(
                &account.id,
                vec![Transaction::new(
                    datetime!(2024-01-01 12:00 UTC),
                    1,
                    "A",
                    "a",
                )],
            )
            .unwrap();
        storage
            .set_account_filters(&account.id, &MultiFilter::default())
            .unwrap();

        storage.delete_account(&account.id).unwrap();

        assert_eq!(storage.accounts().unwrap(), vec![other.clone()]);
        assert!(matches!(
            storage.transactions(&account.id),
            Err(Error::AccountNotFound(_))
        ));
        let remaining: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(remaining, [format!("account_{}.json", other.id)]);
    }

    #[test]
    fn unknown_account_is_not_found_and_nothing_changes() {
        let (dir, storage) = get_test_storage();
        let account = storage.add_account("Checking", "wellsfargocsv").unwrap();

        let got = storage.delete_account("0000-missing");

        assert!(matches!(got, Err(Error::AccountNotFound(_))));
        assert_eq!(storage.accounts().unwrap(), vec![account]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn cascade_failures_do_not_block_deletion() {
        let (dir, storage) = get_test_storage();
        let account = storage.add_account("Checking", "wellsfargocsv").unwrap();
        // A non-empty directory cannot be removed as a file.
        let blocker = dir.path().join(format!("transactions_{}.json", account.id));
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        storage.delete_account(&account.id).unwrap();

        assert!(storage.accounts().unwrap().is_empty());
    }
}
