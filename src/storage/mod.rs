//! Durable storage for accounts, their transactions and filters.
//!
//! Every logical record is one JSON file in a flat directory:
//!
//! | Record                 | File name                     |
//! |------------------------|-------------------------------|
//! | [Account]              | `account_<id>.json`           |
//! | account transactions   | `transactions_<id>.json`      |
//! | account [MultiFilter]  | `accountfilters_<id>.json`    |
//! | global [MultiFilter]   | `global_filters.json`         |
//!
//! Writes go to a `.tmp` sibling first and are renamed over the live file,
//! so a reader only ever sees a complete old or a complete new record.

mod dir_storage;
mod files;
mod id;

use crate::{Account, Error, MultiFilter, Transaction};

pub use dir_storage::DirStorage;
pub use id::validate_id;

#[cfg(test)]
pub(crate) use dir_storage::test_utils;

/// Saves transactions under accounts, along with the filters used to view them.
pub trait Storage {
    /// List every account, in no particular order.
    fn accounts(&self) -> Result<Vec<Account>, Error>;

    /// Get the account with the ID `account_id`.
    ///
    /// # Errors
    /// Returns [Error::AccountNotFound] if there is no such account.
    fn account(&self, account_id: &str) -> Result<Account, Error>;

    /// Create a new account with an empty transaction list.
    ///
    /// Returns the new account to inform the caller of the account ID.
    ///
    /// # Errors
    /// Returns [Error::EmptyAccountName] or [Error::UnknownImporter] for bad input.
    fn add_account(&self, name: &str, importer_id: &str) -> Result<Account, Error>;

    /// Read the current transaction list for an account.
    ///
    /// An account that never had transactions stored has an empty list.
    fn transactions(&self, account_id: &str) -> Result<Vec<Transaction>, Error>;

    /// Replace the transaction list for an account.
    ///
    /// Transactions with an empty ID are new and get a fresh unique ID.
    /// Returns the stored list so the caller can see the assigned IDs.
    fn set_transactions(
        &self,
        account_id: &str,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, Error>;

    /// Replace the transaction list for an account with `update(current list)`.
    ///
    /// The read and the write happen under one exclusive lock, so concurrent
    /// updates cannot lose each other's changes. If `update` fails nothing is
    /// written. IDs are assigned as in [Storage::set_transactions].
    fn update_transactions(
        &self,
        account_id: &str,
        update: &mut dyn FnMut(Vec<Transaction>) -> Result<Vec<Transaction>, Error>,
    ) -> Result<Vec<Transaction>, Error>;

    /// Get the filters for an account, the default filter if none were set.
    fn account_filters(&self, account_id: &str) -> Result<MultiFilter, Error>;

    /// Replace the filters for an account.
    ///
    /// # Errors
    /// Returns [Error::InvalidPattern] without storing anything if a pattern
    /// does not compile.
    fn set_account_filters(&self, account_id: &str, filters: &MultiFilter) -> Result<(), Error>;

    /// Delete an account and, on a best-effort basis, its transactions and filters.
    ///
    /// # Errors
    /// Fails only if the account record itself cannot be removed.
    fn delete_account(&self, account_id: &str) -> Result<(), Error>;

    /// Get the filters applied across all accounts, the default filter if none were set.
    fn global_filters(&self) -> Result<MultiFilter, Error>;

    /// Replace the filters applied across all accounts.
    ///
    /// # Errors
    /// Returns [Error::InvalidPattern] without storing anything if a pattern
    /// does not compile.
    fn set_global_filters(&self, filters: &MultiFilter) -> Result<(), Error>;
}
