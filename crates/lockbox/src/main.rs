// SPDX-FileCopyrightText: 2026 Lockbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! lockbox - a local, offline password vault.
//!
//! Every invocation opens the store, unlocks at most once, runs one command
//! and locks again on exit.

mod context;
mod credentials;
mod folders;
mod manage;
mod output;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lockbox_config::LockboxConfig;
use lockbox_core::LockboxError;
use lockbox_vault::Vault;

/// lockbox - a local, offline password vault.
#[derive(Parser, Debug)]
#[command(name = "lockbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new vault protected by a master password.
    Init,
    /// Add a credential. The password is prompted for, never passed as an argument.
    Add(credentials::AddArgs),
    /// Show one credential.
    Get {
        id: String,
        /// Print the password and custom field values in clear.
        #[arg(long)]
        show: bool,
    },
    /// List credentials.
    List {
        /// Only credentials filed directly under this folder.
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Find credentials by title, username, URL or notes.
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a credential or move it between folders.
    Edit(credentials::EditArgs),
    /// Move a credential to the trash.
    Rm {
        id: String,
        /// Delete for good instead of moving to the trash.
        #[arg(long)]
        permanent: bool,
    },
    /// Take a credential back out of the trash.
    Restore { id: String },
    /// List trashed credentials.
    Trash,
    /// Manage folders.
    Folder {
        #[command(subcommand)]
        command: folders::FolderCommand,
    },
    /// Show or set the inactivity lock timeout (1-60 minutes).
    Timeout { minutes: Option<u32> },
    /// Change the master password.
    Passwd,
    /// Delete every credential, folder and the vault metadata.
    Wipe {
        /// Confirm the wipe.
        #[arg(long)]
        yes: bool,
    },
    /// Show vault status without unlocking.
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(errors) => {
            lockbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    if let Err(err) = run(cli, config).await {
        eprintln!("lockbox: {}", output::user_message(&err));
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<LockboxConfig, Vec<lockbox_config::ConfigError>> {
    match &cli.config {
        Some(path) => lockbox_config::load_and_validate_path(path),
        None => lockbox_config::load_and_validate(),
    }
}

async fn run(cli: Cli, config: LockboxConfig) -> Result<(), LockboxError> {
    let store = context::open_store(&config).await?;
    let vault = context::build_vault(store.clone(), &config).await?;

    let result = dispatch(&vault, &store, cli.command, cli.plain).await;
    let closed = vault.close().await;
    result.and(closed)
}

async fn dispatch(
    vault: &Vault,
    store: &lockbox_storage::SqliteStore,
    command: Commands,
    plain: bool,
) -> Result<(), LockboxError> {
    match command {
        Commands::Init => manage::run_init(vault).await,
        Commands::Status { json } => status::run_status(vault, store, json, plain).await,
        Commands::Timeout { minutes } => manage::run_timeout(vault, minutes).await,
        Commands::Passwd => manage::run_passwd(vault).await,
        Commands::Wipe { yes: false } => Err(LockboxError::Internal(
            "refusing to wipe without --yes".to_string(),
        )),
        command => {
            context::unlock(vault).await?;
            run_unlocked(vault, command, plain).await
        }
    }
}

async fn run_unlocked(vault: &Vault, command: Commands, plain: bool) -> Result<(), LockboxError> {
    match command {
        Commands::Add(args) => credentials::run_add(vault, args).await,
        Commands::Get { id, show } => credentials::run_get(vault, &id, show, plain).await,
        Commands::List { folder, json } => {
            credentials::run_list(vault, folder.as_deref(), json).await
        }
        Commands::Search { query, json } => credentials::run_search(vault, &query, json).await,
        Commands::Edit(args) => credentials::run_edit(vault, args).await,
        Commands::Rm { id, permanent } => credentials::run_rm(vault, &id, permanent).await,
        Commands::Restore { id } => credentials::run_restore(vault, &id).await,
        Commands::Trash => credentials::run_trash(vault).await,
        Commands::Folder { command } => folders::run_folder(vault, command).await,
        Commands::Wipe { .. } => manage::run_wipe(vault).await,
        Commands::Init
        | Commands::Status { .. }
        | Commands::Timeout { .. }
        | Commands::Passwd => Err(LockboxError::Internal(
            "command does not run against an unlocked session".to_string(),
        )),
    }
}

/// Install the tracing subscriber. Logs go to stderr so command output on
/// stdout stays parseable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lockbox={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
