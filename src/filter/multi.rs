//! Defines [MultiFilter], the filter configuration stored per account and globally.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    filter::{
        CategoryFilter, Filter, FilterKind, IdFilter, PatternFilter, ReplaceFilter, SignFilter,
        TransactionStream, compile_pattern, null_as_empty,
    },
};

/// A filter that combines many simple filters.
///
/// The stages always run in this order: pattern, category, replace, sign, ID.
/// A pattern filter therefore sees the description before any replace filter
/// rewrites it. The default value passes every transaction through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultiFilter {
    /// Exclusions, applied first.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pattern_filters: Vec<PatternFilter>,
    /// Category tagging, later entries override earlier ones.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category_filters: Vec<CategoryFilter>,
    /// Description rewrites.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replace_filters: Vec<ReplaceFilter>,
    /// Keep only credits or only debits.
    #[serde(default)]
    pub sign_filter: Option<SignFilter>,
    /// Drop transactions by ID, applied last.
    #[serde(rename = "IDFilter", default)]
    pub id_filter: Option<IdFilter>,
}

impl MultiFilter {
    /// Check that every pattern compiles.
    ///
    /// Filters are validated before they are stored so that applying a stored
    /// filter cannot fail on a bad pattern.
    ///
    /// # Errors
    /// Returns [Error::InvalidPattern] for the first pattern that does not compile.
    pub fn validate(&self) -> Result<(), Error> {
        for filter in &self.pattern_filters {
            compile_pattern(FilterKind::Pattern, &filter.pattern)?;
        }
        for filter in &self.category_filters {
            compile_pattern(FilterKind::Category, &filter.pattern)?;
        }
        for filter in &self.replace_filters {
            compile_pattern(FilterKind::Replace, &filter.pattern)?;
        }

        Ok(())
    }

    /// Whether the filter passes every transaction through unchanged.
    pub fn is_empty(&self) -> bool {
        self.pattern_filters.is_empty()
            && self.category_filters.is_empty()
            && self.replace_filters.is_empty()
            && self.sign_filter.is_none()
            && self.id_filter.is_none()
    }
}

impl Filter for MultiFilter {
    fn filter<'a>(
        &'a self,
        transactions: TransactionStream<'a>,
    ) -> Result<TransactionStream<'a>, Error> {
        let mut transactions = transactions;

        for filter in &self.pattern_filters {
            transactions = filter.filter(transactions)?;
        }
        for filter in &self.category_filters {
            transactions = filter.filter(transactions)?;
        }
        for filter in &self.replace_filters {
            transactions = filter.filter(transactions)?;
        }
        if let Some(filter) = &self.sign_filter {
            transactions = filter.filter(transactions)?;
        }
        if let Some(filter) = &self.id_filter {
            transactions = filter.filter(transactions)?;
        }

        Ok(transactions)
    }
}


#[cfg(test)]
mod multi_filter_tests {
    use crate::{
        CategoryFilter, IdFilter, MultiFilter, PatternFilter, ReplaceFilter, SignFilter,
        apply_filter,
        filter::test_utils::{descriptions, transactions},
    };

    #[test]
    fn applies_stages_in_fixed_order() {
        let filter = MultiFilter {
            pattern_filters: vec![PatternFilter {
                pattern: "CHASE".to_owned(),
            }],
            category_filters: vec![CategoryFilter {
                pattern: "^AMZN".to_owned(),
                category: "Shopping".to_owned(),
            }],
            replace_filters: vec![
                ReplaceFilter {
                    pattern: "CHASE|AMZN".to_owned(),
                    replacement: "VISA".to_owned(),
                },
                ReplaceFilter {
                    pattern: "Mktp US".to_owned(),
                    replacement: "Marketplace".to_owned(),
                },
            ],
            sign_filter: Some(SignFilter { positive: false }),
            id_filter: Some(IdFilter {
                ids: vec!["t3".to_owned()],
            }),
        };
        let input = transactions(&[
            (-100, "payment to CHASE"),
            (-20, "AMZN Mktp US"),
            (300, "AMZN refund"),
            (-4, "AMZN gift card"),
        ]);

        let got = apply_filter(&filter, input).unwrap();

        assert_eq!(descriptions(&got), ["VISA Marketplace"]);
        assert_eq!(got[0].category, "Shopping");
        assert_eq!(got[0].id, "t1");
    }

    #[test]
    fn empty_filter_is_identity() {
        let input = transactions(&[(1, "a"), (-2, "b")]);

        let got = apply_filter(&MultiFilter::default(), input.clone()).unwrap();

        assert_eq!(got, input);
    }

    #[test]
    fn decodes_records_with_null_lists() {
        let json = r#"{
            "PatternFilters": null,
            "ReplaceFilters": [{"Pattern": "a", "Replacement": "b"}],
            "SignFilter": {"Positive": true},
            "IDFilter": null
        }"#;

        let filter: MultiFilter = serde_json::from_str(json).unwrap();

        assert!(filter.pattern_filters.is_empty());
        assert!(filter.category_filters.is_empty());
        assert_eq!(filter.replace_filters.len(), 1);
        assert_eq!(filter.sign_filter, Some(SignFilter { positive: true }));
        assert_eq!(filter.id_filter, None);
    }
}
