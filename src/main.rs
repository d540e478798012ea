use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use pensionguard::core::history::{ManualEntry, parse_date};
use pensionguard::core::log::init_logging;
use pensionguard::core::recommendation::FundTier;
use pensionguard::ingest::parse::parse_number;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for pensionguard::AppCommand {
    fn from(cmd: Commands) -> pensionguard::AppCommand {
        match cmd {
            Commands::Advise { notify } => pensionguard::AppCommand::Advise { notify },
            Commands::Market => pensionguard::AppCommand::Market,
            Commands::Import { file } => pensionguard::AppCommand::Import { file },
            Commands::Record { date, fund, value } => {
                pensionguard::AppCommand::Record(ManualEntry {
                    date,
                    fund,
                    unit_value: value,
                })
            }
            Commands::History { last } => pensionguard::AppCommand::History { last },
            Commands::Reset { yes } => pensionguard::AppCommand::Reset { confirmed: yes },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Recommend a fund from the USD/CLP and S&P 500 trends
    Advise {
        /// Email an alert when the recommendation is Fondo E
        #[arg(long)]
        notify: bool,
    },
    /// Show the latest closes of the tracked instruments
    Market,
    /// Import a Planvital fund export (.xlsx, .xls, .ods or .csv)
    Import {
        file: PathBuf,
    },
    /// Record one day by hand
    Record {
        /// Date, e.g. 2024-03-01 or 01/03/2024
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        /// Fund held on that date (C, D or E)
        #[arg(long)]
        fund: FundTier,
        /// Unit value of that fund, e.g. 40123.45 or 40.123,45
        #[arg(long, value_parser = parse_value_arg)]
        value: Option<f64>,
    },
    /// Show the stored fund history
    History {
        /// Only show the most recent N days
        #[arg(long)]
        last: Option<usize>,
    },
    /// Delete the stored fund history
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("unrecognized date '{s}'"))
}

fn parse_value_arg(s: &str) -> Result<f64, String> {
    parse_number(s).ok_or_else(|| format!("unrecognized unit value '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => pensionguard::cli::setup::setup(),
        Some(cmd) => pensionguard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
