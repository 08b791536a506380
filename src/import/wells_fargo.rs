//! Parses CSV statements exported from Wells Fargo online banking.

use std::io::{self, Read};

use csv::StringRecord;
use serde::Serialize;
use serde_json::ser::Formatter;
use time::{Date, Month, OffsetDateTime, UtcOffset, macros::time};

use crate::{Error, Transaction, TransactionImporter};

/// Imports headerless Wells Fargo CSV statements.
///
/// Each row has exactly five columns:
///
/// ```text
/// "01/31/2024","-12.50","*","","COFFEE SHOP"
/// ```
///
/// The date is `mm/dd/yyyy`, the amount is signed dollars, the third and
/// fourth columns are ignored and the last column is the description.
#[derive(Debug, Clone, Copy)]
pub struct WellsFargoImporter {
    local_offset: UtcOffset,
}

impl WellsFargoImporter {
    /// Create an importer that timestamps rows at noon in `local_offset`.
    pub fn new(local_offset: UtcOffset) -> Self {
        Self { local_offset }
    }

    fn parse_record(&self, record: &StringRecord, row: usize) -> Result<Transaction, Error> {
        const DATE_COLUMN: usize = 0;
        const AMOUNT_COLUMN: usize = 1;
        const DESCRIPTION_COLUMN: usize = 4;
        const COLUMN_COUNT: usize = 5;

        if record.len() != COLUMN_COUNT {
            return Err(Error::InvalidCsv(format!(
                "expected exactly {COLUMN_COUNT} columns on row {row}, but got {}",
                record.len()
            )));
        }

        let date = parse_date(&record[DATE_COLUMN]).ok_or_else(|| {
            Error::InvalidCsv(format!(
                "expected first column to be mm/dd/yyyy on row {row}, but got {:?}",
                &record[DATE_COLUMN]
            ))
        })?;
        let amount = parse_cents(&record[AMOUNT_COLUMN]).ok_or_else(|| {
            Error::InvalidCsv(format!(
                "expected money amount on row {row}, but got {:?}",
                &record[AMOUNT_COLUMN]
            ))
        })?;
        let extra = encode_row(record).ok_or_else(|| {
            Error::InvalidCsv(format!("could not encode row {row} as JSON"))
        })?;

        Ok(Transaction::new(
            self.noon_on(date),
            amount,
            &record[DESCRIPTION_COLUMN],
            &extra,
        ))
    }

    fn noon_on(&self, date: Date) -> OffsetDateTime {
        date.with_time(time!(12:00)).assume_offset(self.local_offset)
    }
}

impl TransactionImporter for WellsFargoImporter {
    fn id(&self) -> &'static str {
        "wellsfargocsv"
    }

    fn name(&self) -> &'static str {
        "Wells Fargo CSV"
    }

    fn import(&self, document: &mut dyn Read) -> Result<Vec<Transaction>, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(document);

        let mut transactions = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let row = index + 1;
            let record = result.map_err(|error| {
                Error::InvalidCsv(format!("could not read row {row}: {error}"))
            })?;

            transactions.push(self.parse_record(&record, row)?);
        }

        tracing::debug!("parsed {} rows from Wells Fargo CSV", transactions.len());

        Ok(transactions)
    }
}

/// Encode the columns of a row as a JSON array of strings, with `&`, `<`, `>`,
/// U+2028 and U+2029 written as `\u` escapes.
fn encode_row(record: &StringRecord) -> Option<String> {
    let mut json = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, HtmlSafeFormatter);
    record
        .iter()
        .collect::<Vec<_>>()
        .serialize(&mut serializer)
        .ok()?;

    String::from_utf8(json).ok()
}

/// Compact JSON that escapes characters which are unsafe inside HTML.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, character) in fragment.char_indices() {
            let escaped = match character {
                '&' => "\\u0026",
                '<' => "\\u003c",
                '>' => "\\u003e",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = index + character.len_utf8();
        }

        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Parse `mm/dd/yyyy`, where any component may have leading zeros.
fn parse_date(text: &str) -> Option<Date> {
    let mut parts = text.split('/');
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let month = Month::try_from(month).ok()?;

    Date::from_calendar_date(year, month, day).ok()
}

/// Parse a dollar amount and round it to whole cents.
fn parse_cents(text: &str) -> Option<i64> {
    let dollars: f64 = text.parse().ok()?;
    let cents = (dollars * 100.0).round();

    if cents.is_finite() && cents.abs() < i64::MAX as f64 {
        Some(cents as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod import_tests {
    use time::{UtcOffset, macros::datetime};

    use crate::{Error, TransactionImporter, WellsFargoImporter};

    fn import(document: &str) -> Result<Vec<crate::Transaction>, Error> {
        WellsFargoImporter::new(UtcOffset::UTC).import(&mut document.as_bytes())
    }

    #[test]
    fn parses_rows() {
        let document = "\
\"01/31/2024\",\"-12.50\",\"*\",\"\",\"COFFEE SHOP\"
\"02/01/2024\",\"1200\",\"*\",\"1234\",\"PAYROLL ACME\"
";

        let got = import(document).unwrap();

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].time, datetime!(2024-01-31 12:00 UTC));
        assert_eq!(got[0].amount, -1250);
        assert_eq!(got[0].description, "COFFEE SHOP");
        assert_eq!(got[0].extra, r#"["01/31/2024","-12.50","*","","COFFEE SHOP"]"#);
        assert!(got[0].is_new());
        assert!(got[0].category.is_empty());
        assert_eq!(got[1].amount, 120000);
        assert_eq!(got[1].description, "PAYROLL ACME");
    }

    #[test]
    fn timestamps_rows_at_local_noon() {
        let offset = UtcOffset::from_hms(13, 0, 0).unwrap();
        let importer = WellsFargoImporter::new(offset);

        let got = importer
            .import(&mut "\"3/4/2024\",\"1\",\"*\",\"\",\"X\"".as_bytes())
            .unwrap();

        assert_eq!(got[0].time, datetime!(2024-03-04 12:00 +13:00));
    }

    #[test]
    fn accepts_leading_zeros_in_dates() {
        let got = import("\"003/0009/02024\",\"1\",\"*\",\"\",\"X\"").unwrap();

        assert_eq!(got[0].time, datetime!(2024-03-09 12:00 UTC));
    }

    #[test]
    fn rounds_amounts_to_cents() {
        let got = import(
            "\"01/01/2024\",\"0.126\",\"*\",\"\",\"A\"\n\"01/01/2024\",\"-19.999\",\"*\",\"\",\"B\"",
        )
        .unwrap();

        assert_eq!(got[0].amount, 13);
        assert_eq!(got[1].amount, -2000);
    }

    #[test]
    fn extra_escapes_html_characters() {
        let got = import("\"01/01/2024\",\"-1\",\"*\",\"\",\"AT&T <BILL>\"").unwrap();

        assert_eq!(got[0].description, "AT&T <BILL>");
        assert_eq!(
            got[0].extra,
            r#"["01/01/2024","-1","*","","AT\u0026T \u003cBILL\u003e"]"#
        );
    }

    #[test]
    fn extra_escapes_line_and_paragraph_separators() {
        let got = import("\"01/01/2024\",\"-1\",\"*\",\"\",\"A\u{2028}B\u{2029}\"").unwrap();

        assert_eq!(got[0].extra, r#"["01/01/2024","-1","*","","A\u2028B\u2029"]"#);
    }

    #[test]
    fn same_row_gives_same_extra() {
        let row = "\"01/01/2024\",\"5\",\"*\",\"\",\"A\"";

        let first = import(row).unwrap();
        let second = import(row).unwrap();

        assert_eq!(first[0].extra, second[0].extra);
    }

    #[test]
    fn empty_document_has_no_transactions() {
        assert!(import("").unwrap().is_empty());
    }

    #[test]
    fn wrong_column_count_fails_whole_import() {
        let document = "\
\"01/01/2024\",\"5\",\"*\",\"\",\"A\"
\"01/02/2024\",\"5\",\"*\",\"B\"
";

        let got = import(document);

        assert!(matches!(got, Err(Error::InvalidCsv(ref message)) if message.contains("row 2")));
    }

    #[test]
    fn rejects_bad_dates() {
        for date in ["2024-01-01", "13/01/2024", "1/2", "1/2/3/4", "a/b/c"] {
            let got = import(&format!("\"{date}\",\"1\",\"*\",\"\",\"X\""));

            assert!(
                matches!(got, Err(Error::InvalidCsv(_))),
                "want {date:?} to be rejected"
            );
        }
    }

    #[test]
    fn impossible_calendar_dates_are_rejected_not_rolled_over() {
        for date in ["02/30/2024", "02/29/2023", "04/31/2024", "01/00/2024"] {
            let got = import(&format!("\"{date}\",\"1\",\"*\",\"\",\"X\""));

            assert!(
                matches!(got, Err(Error::InvalidCsv(ref message)) if message.contains("mm/dd/yyyy")),
                "want {date:?} to be rejected instead of moved into the next month"
            );
        }
    }

    #[test]
    fn rejects_bad_amounts() {
        for amount in ["", "twelve", "NaN", "inf", "1e300"] {
            let got = import(&format!("\"01/01/2024\",\"{amount}\",\"*\",\"\",\"X\""));

            assert!(
                matches!(got, Err(Error::InvalidCsv(_))),
                "want {amount:?} to be rejected"
            );
        }
    }
}
