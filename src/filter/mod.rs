//! Filters map a stream of transactions to a new stream for presentation.
//!
//! A filter never changes stored data. Each stage takes ownership of the
//! records flowing through it and yields zero or one (possibly edited) record
//! per input, in input order. [MultiFilter] composes the simple filters in a
//! fixed order:
//! 1. [PatternFilter]s drop transactions whose description matches,
//! 2. [CategoryFilter]s tag matching transactions, later ones win,
//! 3. [ReplaceFilter]s rewrite descriptions,
//! 4. an optional [SignFilter] keeps only credits or only debits,
//! 5. an optional [IdFilter] drops transactions by ID.
//!
//! Patterns are POSIX extended regular expressions matched leftmost-longest.

mod multi;
mod posix;
mod simple;

use std::fmt::Display;

use serde::{Deserialize, Deserializer};

use crate::{Error, Transaction};

use posix::PosixRegex;

pub use multi::MultiFilter;
pub use simple::{CategoryFilter, IdFilter, PatternFilter, ReplaceFilter, SignFilter};

/// A lazily evaluated sequence of transactions flowing through a filter.
pub type TransactionStream<'a> = Box<dyn Iterator<Item = Transaction> + 'a>;

/// A mapping from transactions to new transactions.
pub trait Filter {
    /// Wrap `transactions` in this filter's stage.
    ///
    /// Patterns are compiled once here, not once per transaction.
    ///
    /// # Errors
    /// Returns [Error::InvalidPattern] if a pattern does not compile.
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error>;
}

/// Run `transactions` through `filter` and collect the output.
///
/// # Errors
/// Returns [Error::InvalidPattern] if a pattern in `filter` does not compile.
pub fn apply_filter<F>(filter: &F, transactions: Vec<Transaction>) -> Result<Vec<Transaction>, Error>
where
    F: Filter + ?Sized,
{
    Ok(filter.filter(Box::new(transactions.into_iter()))?.collect())
}

/// The filters that carry a regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// See [PatternFilter].
    Pattern,
    /// See [CategoryFilter].
    Category,
    /// See [ReplaceFilter].
    Replace,
}

impl Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterKind::Pattern => "pattern filter",
            FilterKind::Category => "category filter",
            FilterKind::Replace => "replace filter",
        };

        write!(f, "{name}")
    }
}

fn compile_pattern(filter: FilterKind, pattern: &str) -> Result<PosixRegex, Error> {
    PosixRegex::new(pattern).map_err(|reason| Error::InvalidPattern {
        filter,
        pattern: pattern.to_owned(),
        reason,
    })
}

/// Lists written as `null` by older records decode as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
