pub mod cli;
pub mod core;
pub mod ingest;
pub mod providers;
pub mod session;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::history::ManualEntry;
use crate::session::Session;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Commands that run against a session. `setup` is handled by the binary.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Advise { notify: bool },
    Market,
    Import { file: PathBuf },
    Record(ManualEntry),
    History { last: Option<usize> },
    Reset { confirmed: bool },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("PensionGuard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let session = Session::new(config)?;
    match command {
        AppCommand::Advise { notify } => cli::advise::run(&session, notify).await,
        AppCommand::Market => cli::market::run(&session).await,
        AppCommand::Import { file } => cli::history::import(&session, &file).await,
        AppCommand::Record(entry) => cli::history::record(&session, entry).await,
        AppCommand::History { last } => cli::history::show(&session, last),
        AppCommand::Reset { confirmed } => cli::history::reset(&session, confirmed),
    }
}
