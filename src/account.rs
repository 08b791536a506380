//! Core account domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The storage-assigned identifier of an account.
pub type AccountId = String;

/// A validated, non-empty account name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Create an account name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyAccountName] if `name` is empty
    /// or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyAccountName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create an account name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    #[cfg(test)]
    pub(crate) fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountName::new(s)
    }
}

impl Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A collection of transactions imported from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Account {
    /// The ID of the account, fixed when the account is created.
    #[serde(rename = "ID")]
    pub id: AccountId,
    /// The display name of the account.
    #[serde(rename = "Name")]
    pub name: AccountName,
    /// The ID of the importer that reads this account's statements.
    #[serde(rename = "ImporterID")]
    pub importer_id: String,
}
