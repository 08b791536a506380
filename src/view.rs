//! Operations that combine storage, importers and filters for a caller.

use std::io::Read;

use time::UtcOffset;

use crate::{
    Error, Storage, Transaction, apply_filter, importer_for_id, merge_transactions,
};

/// The transactions of one account as its own filters present them.
///
/// # Errors
/// Returns [Error::AccountNotFound] if there is no such account.
pub fn account_view<S>(storage: &S, account_id: &str) -> Result<Vec<Transaction>, Error>
where
    S: Storage + ?Sized,
{
    let transactions = storage.transactions(account_id)?;
    let filters = storage.account_filters(account_id)?;
    if filters.is_empty() {
        return Ok(transactions);
    }

    apply_filter(&filters, transactions)
}

/// The transactions of every account in one list.
///
/// Each account's transactions go through that account's filters, the
/// results are concatenated with accounts ordered by name then ID and stably
/// sorted by time, and finally the global filters are applied.
pub fn combined_view<S>(storage: &S) -> Result<Vec<Transaction>, Error>
where
    S: Storage + ?Sized,
{
    let mut accounts = storage.accounts()?;
    accounts.sort_by(|a, b| {
        a.name
            .as_ref()
            .cmp(b.name.as_ref())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut combined = Vec::new();
    for account in accounts {
        match account_view(storage, &account.id) {
            Ok(transactions) => combined.extend(transactions),
            // Deleted since the listing.
            Err(Error::AccountNotFound(_)) => {
                tracing::debug!("skipping deleted account {}", account.id);
            }
            Err(error) => return Err(error),
        }
    }

    combined.sort_by_key(|transaction| transaction.time);

    let global_filters = storage.global_filters()?;

    apply_filter(&global_filters, combined)
}

/// Import a statement into an account.
///
/// The statement is parsed with the account's importer, timestamping rows in
/// `local_offset`, and merged into the stored transactions. Rows that were
/// imported before are skipped. Returns the stored transactions, with IDs
/// assigned to the new ones.
///
/// # Errors
/// Returns [Error::InvalidCsv] if the document cannot be parsed, in which case
/// nothing is stored.
pub fn import_document<S>(
    storage: &S,
    account_id: &str,
    document: &mut dyn Read,
    local_offset: UtcOffset,
) -> Result<Vec<Transaction>, Error>
where
    S: Storage + ?Sized,
{
    let account = storage.account(account_id)?;
    let importer = importer_for_id(&account.importer_id, local_offset)?;

    let mut imported = importer.import(document)?;
    let imported_count = imported.len();

    let mut existing_count = 0;
    let stored = storage.update_transactions(account_id, &mut |existing| {
        existing_count = existing.len();
        Ok(merge_transactions(std::mem::take(&mut imported), existing))
    })?;

    tracing::info!(
        "imported {} of {imported_count} rows into account {account_id} with {}",
        stored.len() - existing_count,
        importer.name()
    );

    Ok(stored)
}


#[cfg(test)]
mod combined_view_tests {
    use time::macros::datetime;

    use crate::{
        CategoryFilter, IdFilter, MultiFilter, PatternFilter, Storage, Transaction,
        combined_view, storage::test_utils::get_test_storage,
    };

    #[test]
    fn merges_accounts_then_applies_global_filters() {
        let (_dir, storage) = get_test_storage();
        let checking = storage.add_account("Checking", "wellsfargocsv").unwrap();
        let savings = storage.add_account("Savings", "wellsfargocsv").unwrap();
        let noon = datetime!(2024-01-02 12:00 UTC);
        storage
            .set_transactions(
                &checking.id,
                vec![
                    Transaction::new(noon, -40, "GROCER", "c1"),
                    Transaction::new(datetime!(2024-01-03 12:00 UTC), -500, "TRANSFER", "c2"),
                ],
            )
            .unwrap();
        let savings_stored = storage
            .set_transactions(
                &savings.id,
                vec![
                    Transaction::new(datetime!(2024-01-01 12:00 UTC), 5, "INTEREST", "s1"),
                    Transaction::new(noon, 500, "TRANSFER", "s2"),
                ],
            )
            .unwrap();
        storage
            .set_account_filters(
                &checking.id,
                &MultiFilter {
                    pattern_filters: vec![PatternFilter {
                        pattern: "^TRANSFER$".to_owned(),
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        storage
            .set_global_filters(&MultiFilter {
                category_filters: vec![CategoryFilter {
                    pattern: "GROCER|INTEREST".to_owned(),
                    category: "Everyday".to_owned(),
                }],
                id_filter: Some(IdFilter {
                    ids: vec![savings_stored[1].id.clone()],
                }),
                ..Default::default()
            })
            .unwrap();

        let got = combined_view(&storage).unwrap();

        let summary: Vec<_> = got
            .iter()
            .map(|t| (t.description.as_str(), t.category.as_str()))
            .collect();
        assert_eq!(summary, [("INTEREST", "Everyday"), ("GROCER", "Everyday")]);
    }

    #[test]
    fn equal_times_follow_account_name_order() {
        let (_dir, storage) = get_test_storage();
        let noon = datetime!(2024-01-01 12:00 UTC);
        let zebra = storage.add_account("Zebra", "wellsfargocsv").unwrap();
        let apple = storage.add_account("Apple", "wellsfargocsv").unwrap();
        storage
            .set_transactions(&zebra.id, vec![Transaction::new(noon, 1, "FROM ZEBRA", "z")])
            .unwrap();
        storage
            .set_transactions(&apple.id, vec![Transaction::new(noon, 2, "FROM APPLE", "a")])
            .unwrap();

        let got = combined_view(&storage).unwrap();

        let descriptions: Vec<_> = got.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["FROM APPLE", "FROM ZEBRA"]);
    }

    #[test]
    fn no_accounts_is_empty() {
        let (_dir, storage) = get_test_storage();

        assert!(combined_view(&storage).unwrap().is_empty());
    }
}
