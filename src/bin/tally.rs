use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use serde::Serialize;
use time::UtcOffset;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use tally_rs::{
    DirStorage, Error, ErrorKind, MultiFilter, Storage, account_view, combined_view,
    get_local_offset, import_document, importers, system_local_offset,
};

/// Keep track of bank transactions grouped into accounts.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the account, transaction and filter records.
    #[arg(long, default_value = "tally_data")]
    data_dir: PathBuf,

    /// Canonical timezone used to timestamp imported rows, e.g. "Pacific/Auckland".
    ///
    /// Defaults to the system timezone.
    #[arg(long)]
    timezone: Option<String>,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported importers.
    Importers,
    /// List every account.
    Accounts,
    /// Show one account.
    Account { account_id: String },
    /// Create an account.
    AddAccount { name: String, importer_id: String },
    /// Delete an account with its transactions and filters.
    DeleteAccount { account_id: String },
    /// Show the transactions of an account through its filters.
    Transactions {
        account_id: String,
        /// Show the stored transactions without applying filters.
        #[arg(long)]
        raw: bool,
    },
    /// Show the transactions of every account through all filters.
    AllTransactions,
    /// Import a bank statement into an account.
    Import { account_id: String, file: PathBuf },
    /// Show the filters of an account.
    Filters { account_id: String },
    /// Replace the filters of an account with the JSON in a file.
    SetFilters { account_id: String, file: PathBuf },
    /// Show the filters applied across all accounts.
    GlobalFilters,
    /// Replace the filters applied across all accounts with the JSON in a file.
    SetGlobalFilters { file: PathBuf },
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImporterInfo {
    #[serde(rename = "ID")]
    id: &'static str,
    name: &'static str,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        eprintln!("Could not open log file {:?}: {error}", args.log_file);
        return ExitCode::FAILURE;
    }

    let local_offset = match &args.timezone {
        Some(timezone) => match get_local_offset(timezone) {
            Some(offset) => offset,
            None => {
                eprintln!("Unknown timezone {timezone:?}, expected a name like \"Pacific/Auckland\"");
                return ExitCode::from(2);
            }
        },
        None => system_local_offset(),
    };

    match run(args.command, &args.data_dir, local_offset) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!("command failed: {error:?}");
            eprintln!("Error: {error}");
            exit_code(&error)
        }
    }
}

fn exit_code(error: &Error) -> ExitCode {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => ExitCode::from(2),
        ErrorKind::Io | ErrorKind::Parse => ExitCode::FAILURE,
    }
}

fn run(command: Command, data_dir: &Path, local_offset: UtcOffset) -> Result<(), Error> {
    let storage = DirStorage::open(data_dir)?;
    tracing::debug!("using data directory {}", storage.dir().display());

    match command {
        Command::Importers => {
            let importers: Vec<_> = importers(local_offset)
                .iter()
                .map(|importer| ImporterInfo {
                    id: importer.id(),
                    name: importer.name(),
                })
                .collect();
            print_json(&importers)
        }
        Command::Accounts => {
            let mut accounts = storage.accounts()?;
            accounts.sort_by(|a, b| a.name.as_ref().cmp(b.name.as_ref()));
            print_json(&accounts)
        }
        Command::Account { account_id } => print_json(&storage.account(&account_id)?),
        Command::AddAccount { name, importer_id } => {
            print_json(&storage.add_account(&name, &importer_id)?)
        }
        Command::DeleteAccount { account_id } => storage.delete_account(&account_id),
        Command::Transactions { account_id, raw } => {
            let transactions = if raw {
                storage.transactions(&account_id)?
            } else {
                account_view(&storage, &account_id)?
            };
            print_json(&transactions)
        }
        Command::AllTransactions => print_json(&combined_view(&storage)?),
        Command::Import { account_id, file } => {
            let mut document = File::open(&file)?;
            let stored = import_document(&storage, &account_id, &mut document, local_offset)?;
            print_json(&stored)
        }
        Command::Filters { account_id } => print_json(&storage.account_filters(&account_id)?),
        Command::SetFilters { account_id, file } => {
            let filters = read_filters(&file)?;
            if filters.is_empty() {
                tracing::info!("clearing the filters of account {account_id}");
            }
            storage.set_account_filters(&account_id, &filters)
        }
        Command::GlobalFilters => print_json(&storage.global_filters()?),
        Command::SetGlobalFilters { file } => storage.set_global_filters(&read_filters(&file)?),
    }
}

fn read_filters(path: &Path) -> Result<MultiFilter, Error> {
    let text = fs::read_to_string(path)?;

    serde_json::from_str(&text).map_err(|source| Error::CorruptRecord {
        name: path.display().to_string(),
        source,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::from)?;
    writeln!(stdout)?;

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`), and at debug level
/// to `log_file` if given. Stdout is reserved for command output.
fn setup_logging(log_file: Option<&Path>) -> io::Result<()> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(debug_log)
        .init();

    Ok(())
}
