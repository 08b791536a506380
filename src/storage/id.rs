//! Generation and validation of record IDs.

use uuid::Uuid;

use crate::Error;

/// Check that `id` only contains ASCII letters, digits and `-`.
///
/// IDs end up in file names, anything else could escape the data directory.
///
/// # Errors
/// Returns [Error::InvalidId] if `id` contains any other character.
pub fn validate_id(id: &str) -> Result<(), Error> {
    if id
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '-')
    {
        Ok(())
    } else {
        Err(Error::InvalidId(id.to_owned()))
    }
}

/// Generate a fresh, globally unique ID.
pub(super) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
