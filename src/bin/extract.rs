//! opsboard-extract: turn a spreadsheet export into a dashboard data file.
//!
//! Usage:
//!   opsboard-extract tasks "KTLO Tracker.xlsx"
//!   opsboard-extract databases aurora-inventory.xlsx --config ./opsboard.json
//!
//! Output goes to the path configured for the report kind
//! (`data/ktlo-data.json` or `data/aurora-data.json` by default).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use opsboard_lib::config::{load_config, Config};
use opsboard_lib::error::OpsError;
use opsboard_lib::json_loader::write_records;
use opsboard_lib::processor::{extract_instances, extract_tasks, ExtractionReport};

#[derive(Parser)]
#[command(name = "opsboard-extract")]
#[command(about = "Extract KTLO tracker or Aurora inventory workbooks into JSON")]
struct Cli {
    /// Config file (default: ~/.opsboard/config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    report: Report,
}

#[derive(Subcommand)]
enum Report {
    /// KTLO tracker workbook
    Tasks {
        /// Path to the .xlsx/.xls export
        source: PathBuf,
    },
    /// Aurora PostgreSQL inventory workbook
    Databases {
        /// Path to the .xlsx/.xls export
        source: PathBuf,
    },
}

fn run(cli: &Cli) -> Result<ExtractionReport, OpsError> {
    let config: Config = load_config(cli.config.as_deref())?;

    match &cli.report {
        Report::Tasks { source } => {
            let extraction = extract_tasks(source, &config)?;
            write(&config.task_output_path, &extraction.records)?;
            Ok(extraction.report)
        }
        Report::Databases { source } => {
            let extraction = extract_instances(source, &config)?;
            write(&config.database_output_path, &extraction.records)?;
            Ok(extraction.report)
        }
    }
}

fn write<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<(), OpsError> {
    if records.is_empty() {
        log::warn!("No records extracted; writing an empty array to {}", path.display());
    }
    write_records(path, records)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            log::info!(
                "Done: {} of {} candidate rows kept across {} sheet(s)",
                report.records,
                report.candidate_rows,
                report.sheets
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_fatal() => {
            log::error!("Extraction aborted: {}", e);
            log::error!("{}", e.recovery_suggestion());
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Extraction failed: {}", e);
            log::warn!("{}", e.recovery_suggestion());
            ExitCode::FAILURE
        }
    }
}
