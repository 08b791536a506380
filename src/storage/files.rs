//! Record naming and crash-safe reading and writing of JSON records.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::Path,
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, storage::validate_id};

const ACCOUNT_PREFIX: &str = "account_";
const TRANSACTIONS_PREFIX: &str = "transactions_";
const ACCOUNT_FILTERS_PREFIX: &str = "accountfilters_";
const RECORD_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// The file name of the global filters record.
pub(super) const GLOBAL_FILTERS_RECORD: &str = "global_filters.json";

pub(super) fn account_record(account_id: &str) -> String {
    format!("{ACCOUNT_PREFIX}{account_id}{RECORD_SUFFIX}")
}

pub(super) fn transactions_record(account_id: &str) -> String {
    format!("{TRANSACTIONS_PREFIX}{account_id}{RECORD_SUFFIX}")
}

pub(super) fn account_filters_record(account_id: &str) -> String {
    format!("{ACCOUNT_FILTERS_PREFIX}{account_id}{RECORD_SUFFIX}")
}

/// Get the account ID from the file name of an account record.
///
/// Returns `None` for any other file, including temporary files.
pub(super) fn account_id_from_record(file_name: &str) -> Option<&str> {
    let account_id = file_name
        .strip_prefix(ACCOUNT_PREFIX)?
        .strip_suffix(RECORD_SUFFIX)?;

    validate_id(account_id).ok().map(|_| account_id)
}

/// Read and decode the record `name`, or `None` if it does not exist.
///
/// # Errors
/// Returns [Error::Io] if the file cannot be read and [Error::CorruptRecord]
/// if it is not valid JSON for `T`.
pub(super) fn read_record<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Option<T>, Error> {
    let bytes = match fs::read(dir.join(name)) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| Error::CorruptRecord {
            name: name.to_owned(),
            source,
        })
}

/// Atomically replace the record `name` with `value`.
///
/// The record is written and synced to `<name>.tmp`, which is then renamed
/// over `name`, and the directory is synced so the rename survives a crash.
/// On failure the temporary file is removed and the previous record is left
/// as it was.
pub(super) fn write_record<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<(), Error> {
    let path = dir.join(name);
    let temp_path = dir.join(format!("{name}{TEMP_SUFFIX}"));

    let result = write_temp_file(&temp_path, value)
        .and_then(|_| fs::rename(&temp_path, &path))
        .and_then(|_| sync_dir(dir));

    if let Err(error) = result {
        match fs::remove_file(&temp_path) {
            Ok(_) => {}
            Err(remove_error) if remove_error.kind() == io::ErrorKind::NotFound => {}
            Err(remove_error) => {
                tracing::warn!("could not discard temporary file {temp_path:?}: {remove_error}");
            }
        }

        return Err(error.into());
    }

    tracing::debug!("committed {name}");

    Ok(())
}

fn write_temp_file<T: Serialize + ?Sized>(temp_path: &Path, value: &T) -> io::Result<()> {
    let mut bytes = serde_json::to_vec(value)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    bytes.push(b'\n');

    let mut file = File::create(temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()
}

/// Flush directory entries, such as a rename, to disk.
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Remove the record `name`, treating a missing record as already removed.
pub(super) fn remove_record(dir: &Path, name: &str) -> io::Result<()> {
    match fs::remove_file(dir.join(name)) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
