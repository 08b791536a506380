//! The single-purpose filters that a [MultiFilter](super::MultiFilter) is built from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    filter::{Filter, FilterKind, TransactionStream, compile_pattern, null_as_empty},
};

/// Excludes every transaction whose description matches a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatternFilter {
    /// The regular expression to exclude.
    pub pattern: String,
}

impl Filter for PatternFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let regex = compile_pattern(FilterKind::Pattern, &self.pattern)?;

        Ok(Box::new(transactions.filter(move |transaction| {
            !regex.is_match(&transaction.description)
        })))
    }
}

/// Sets a fixed category on every transaction whose description matches a
/// regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryFilter {
    /// The regular expression to match descriptions against.
    pub pattern: String,
    /// The category to apply to matching transactions.
    pub category: String,
}

impl Filter for CategoryFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let regex = compile_pattern(FilterKind::Category, &self.pattern)?;

        Ok(Box::new(transactions.map(move |mut transaction| {
            if regex.is_match(&transaction.description) {
                transaction.category = self.category.clone();
            }

            transaction
        })))
    }
}

/// Rewrites descriptions by replacing every match of a regular expression.
///
/// Matches are leftmost-longest and the replacement may refer to capture
/// groups, e.g. `$1` or `${1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplaceFilter {
    /// The regular expression to search for.
    pub pattern: String,
    /// The text that replaces each match.
    pub replacement: String,
}

impl Filter for ReplaceFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let regex = compile_pattern(FilterKind::Replace, &self.pattern)?;

        Ok(Box::new(transactions.map(move |mut transaction| {
            if regex.is_match(&transaction.description) {
                transaction.description =
                    regex.replace_all(&transaction.description, &self.replacement);
            }

            transaction
        })))
    }
}

/// Keeps either only credits or only debits.
///
/// Zero amounts count as credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignFilter {
    /// Keep amounts `>= 0` when true, amounts `< 0` when false.
    pub positive: bool,
}

impl Filter for SignFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let positive = self.positive;

        Ok(Box::new(transactions.filter(move |transaction| {
            positive == (transaction.amount >= 0)
        })))
    }
}

/// Excludes a fixed set of transactions by ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdFilter {
    /// The IDs of the transactions to drop.
    #[serde(rename = "IDs", default, deserialize_with = "null_as_empty")]
    pub ids: Vec<String>,
}

impl Filter for IdFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let ids: HashSet<&'a str> = self.ids.iter().map(String::as_str).collect();

        Ok(Box::new(transactions.filter(move |transaction| {
            !ids.contains(transaction.id.as_str())
        })))
    }
}




#[cfg(test)]
mod sign_filter_tests {
    use crate::{SignFilter, apply_filter, filter::test_utils::transactions};

    #[test]
    fn negative_keeps_debits_in_order() {
        let filter = SignFilter { positive: false };
        let input = transactions(&[(-500, "rent"), (1200, "salary"), (-75, "power")]);

        let got = apply_filter(&filter, input.clone()).unwrap();

        assert_eq!(got, [input[0].clone(), input[2].clone()]);
    }

    #[test]
    fn positive_keeps_credits_and_zero() {
        let filter = SignFilter { positive: true };
        let input = transactions(&[(-500, "rent"), (1200, "salary"), (0, "adjustment")]);

        let got = apply_filter(&filter, input.clone()).unwrap();

        assert_eq!(got, [input[1].clone(), input[2].clone()]);
    }
}
