//! Tally keeps personal financial transactions grouped into accounts.
//!
//! This library provides:
//! - a directory-backed [Storage] engine with crash-safe writes and a
//!   reader/writer lock,
//! - a [Filter] pipeline for excluding, tagging and rewriting transactions in
//!   a view without touching the stored records,
//! - importers that parse bank statements and merge them into existing
//!   history without duplicates.

#![warn(missing_docs)]

mod account;
mod filter;
mod import;
mod storage;
mod timezone;
mod transaction;
mod view;

pub use account::{Account, AccountId, AccountName};
pub use filter::{
    CategoryFilter, Filter, FilterKind, IdFilter, MultiFilter, PatternFilter, ReplaceFilter,
    SignFilter, TransactionStream, apply_filter,
};
pub use import::{
    TransactionImporter, WellsFargoImporter, importer_for_id, importers, is_known_importer,
    merge_transactions,
};
pub use storage::{DirStorage, Storage, validate_id};
pub use timezone::{get_local_offset, system_local_offset};
pub use transaction::{Transaction, TransactionId};
pub use view::{account_view, combined_view, import_document};

/// The broad class of an [Error], used by callers to decide how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied bad input and can correct it. Nothing was changed.
    Validation,
    /// The requested account does not exist.
    NotFound,
    /// The filesystem or the storage lock failed.
    Io,
    /// An import document or a persisted record could not be decoded.
    Parse,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An empty string was used to create an account name.
    #[error("account name cannot be empty")]
    EmptyAccountName,

    /// The importer ID does not refer to a supported importer.
    #[error("no importer found for ID: {0}")]
    UnknownImporter(String),

    /// An externally supplied ID contains characters outside `[0-9A-Za-z-]`.
    ///
    /// IDs are used to build file names, so they are rejected before the
    /// filesystem is touched.
    #[error("invalid ID: {0:?}")]
    InvalidId(String),

    /// A filter pattern is not a valid regular expression.
    #[error("could not parse {filter} pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The kind of filter the pattern belongs to.
        filter: FilterKind,
        /// The offending pattern.
        pattern: String,
        /// The message from the regular expression parser.
        reason: String,
    },

    /// No account exists with the given ID.
    #[error("account ID not found: {0}")]
    AccountNotFound(AccountId),

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage lock was poisoned by a thread that panicked while holding it.
    #[error("could not acquire the storage lock")]
    StorageLock,

    /// A persisted record could not be decoded.
    ///
    /// This needs manual intervention, the record is left as it is on disk.
    #[error("could not decode {name}: {source}")]
    CorruptRecord {
        /// The file name of the record.
        name: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// An import document could not be parsed. Nothing from it was stored.
    #[error("could not parse the CSV file: {0}")]
    InvalidCsv(String),
}

impl Error {
    /// Classify the error, e.g. to map it onto a transport status code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyAccountName
            | Error::UnknownImporter(_)
            | Error::InvalidId(_)
            | Error::InvalidPattern { .. } => ErrorKind::Validation,
            Error::AccountNotFound(_) => ErrorKind::NotFound,
            Error::Io(_) | Error::StorageLock => ErrorKind::Io,
            Error::CorruptRecord { .. } | Error::InvalidCsv(_) => ErrorKind::Parse,
        }
    }
}
