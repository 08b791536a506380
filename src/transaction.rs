//! Defines the transaction record shared by storage, filters and importers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The storage-assigned identifier of a transaction.
///
/// An empty ID marks a record that has not been stored yet.
pub type TransactionId = String;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Importers create transactions without an ID or category. The storage layer
/// assigns the ID the first time the transaction is committed, and filters
/// may produce copies with a rewritten description or a category for a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    /// The ID of the transaction, empty until it is first stored.
    #[serde(rename = "ID", default)]
    pub id: TransactionId,

    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,

    /// The amount in minor currency units, e.g. cents.
    ///
    /// Positive values represent income/credits, negative values represent
    /// expenses/debits.
    pub amount: i64,

    /// A text description of what the transaction was for.
    pub description: String,

    /// The category set by a category filter, empty when untagged.
    #[serde(default)]
    pub category: String,

    /// The importer's key for the source row.
    ///
    /// Re-importing the same row must produce the same value, this is what
    /// prevents duplicates when statements overlap.
    #[serde(default)]
    pub extra: String,
}

impl Transaction {
    /// Create a new, unstored transaction without a category.
    pub fn new(time: OffsetDateTime, amount: i64, description: &str, extra: &str) -> Self {
        Self {
            id: TransactionId::new(),
            time,
            amount,
            description: description.to_owned(),
            category: String::new(),
            extra: extra.to_owned(),
        }
    }

    /// Whether the transaction still needs an ID from the storage layer.
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}
