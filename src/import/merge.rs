use std::collections::HashSet;

use crate::Transaction;

/// Merge freshly `imported` transactions into the `existing` list of an account.
///
/// An imported transaction is appended only if no transaction seen so far
/// has the same `extra` key, which includes rows earlier in `imported`
/// itself. The result is stably sorted by time, so transactions with equal
/// timestamps keep their order: existing ones first, then imported ones in
/// document order.
///
/// Merging the same import twice gives the same result as merging it once.
pub fn merge_transactions(
    imported: Vec<Transaction>,
    existing: Vec<Transaction>,
) -> Vec<Transaction> {
    let mut seen: HashSet<String> = existing
        .iter()
        .map(|transaction| transaction.extra.clone())
        .collect();

    let mut merged = existing;
    let existing_count = merged.len();

    for transaction in imported {
        if seen.insert(transaction.extra.clone()) {
            merged.push(transaction);
        }
    }

    tracing::debug!(
        "merged {} new transactions into {existing_count}",
        merged.len() - existing_count
    );

    merged.sort_by_key(|transaction| transaction.time);

    merged
}
