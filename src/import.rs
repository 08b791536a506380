//! Importers parse bank statements into transactions and merge them into
//! an account's existing history.

mod merge;
mod wells_fargo;

use std::io::Read;

use time::UtcOffset;

use crate::{Error, Transaction};

pub use merge::merge_transactions;
pub use wells_fargo::WellsFargoImporter;

/// Loads transactions from one bank's statement format.
pub trait TransactionImporter: Send + Sync {
    /// A unique, stable ID for this type of importer.
    ///
    /// Accounts refer to their importer by this ID.
    fn id(&self) -> &'static str;

    /// A human-readable name for the importer.
    fn name(&self) -> &'static str;

    /// Parse every transaction in `document`.
    ///
    /// The returned transactions have an empty ID and an `extra` value that is
    /// the same each time the same source row is imported.
    ///
    /// # Errors
    /// Returns [Error::InvalidCsv] if any part of the document is malformed.
    /// No transactions are returned in that case.
    fn import(&self, document: &mut dyn Read) -> Result<Vec<Transaction>, Error>;

    /// Like [TransactionImporter::import], but returns the union of the
    /// transactions in `document` and `existing`.
    ///
    /// Rows that were already imported are skipped, so importing overlapping
    /// statements does not create duplicates. See [merge_transactions].
    fn merge(
        &self,
        document: &mut dyn Read,
        existing: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, Error> {
        let imported = self.import(document)?;

        Ok(merge_transactions(imported, existing))
    }
}

/// Every supported importer.
///
/// Imported rows are timestamped in the timezone given by `local_offset`.
pub fn importers(local_offset: UtcOffset) -> Vec<Box<dyn TransactionImporter>> {
    vec![Box::new(WellsFargoImporter::new(local_offset))]
}

/// Get the importer with the ID `importer_id`.
///
/// # Errors
/// Returns [Error::UnknownImporter] if no importer has that ID.
pub fn importer_for_id(
    importer_id: &str,
    local_offset: UtcOffset,
) -> Result<Box<dyn TransactionImporter>, Error> {
    importers(local_offset)
        .into_iter()
        .find(|importer| importer.id() == importer_id)
        .ok_or_else(|| Error::UnknownImporter(importer_id.to_owned()))
}

/// Whether `importer_id` refers to a supported importer.
pub fn is_known_importer(importer_id: &str) -> bool {
    importers(UtcOffset::UTC)
        .iter()
        .any(|importer| importer.id() == importer_id)
}

#[cfg(test)]
mod registry_tests {
    use time::UtcOffset;

    use crate::{Error, importer_for_id, importers, is_known_importer};

    #[test]
    fn importer_ids_are_unique() {
        let importers = importers(UtcOffset::UTC);
        let mut ids: Vec<_> = importers.iter().map(|importer| importer.id()).collect();
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), importers.len());
    }

    #[test]
    fn finds_wells_fargo_by_id() {
        let importer = importer_for_id("wellsfargocsv", UtcOffset::UTC).unwrap();

        assert_eq!(importer.id(), "wellsfargocsv");
        assert_eq!(importer.name(), "Wells Fargo CSV");
        assert!(is_known_importer("wellsfargocsv"));
    }

    #[test]
    fn unknown_id_is_an_error() {
        let got = importer_for_id("shoebox", UtcOffset::UTC);

        assert!(matches!(got, Err(Error::UnknownImporter(ref id)) if id == "shoebox"));
        assert!(!is_known_importer("shoebox"));
        assert!(!is_known_importer(""));
    }
}
