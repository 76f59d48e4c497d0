mod command;
mod config;
mod device;
mod eligibility;
mod logging;
mod migrate;
mod ui;

use anyhow::{Result, bail};
use clap::Parser;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use sudo::RunningAs;

use crate::command::SystemRunner;
use crate::config::Config;
use crate::device::{DetectedPartition, DeviceFacts, PhysicalDevice, SystemDeviceFacts};
use crate::eligibility::{EligibilityReport, FsInspector, Options};
use crate::logging::LogLevel;
use crate::migrate::{Executor, Outcome, TerminalPrompt};
use crate::ui::{Level, OutputFormat, emit};

/// Move the Raspberry Pi root partition from the SD card to an external disk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log file (default: ./sd2usb.log)
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    debug: LogLevel,

    /// Don't execute any commands but display them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Allow target partitions which are smaller than the source partition
    #[arg(short, long)]
    force: bool,

    /// Configuration file (default: /etc/sd2usb.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only report detected partitions and their eligibility, then exit
    #[arg(short, long)]
    report: bool,

    /// Print the report as JSON
    #[arg(long, requires = "report")]
    json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    devices: &'a [PhysicalDevice],
    partitions: &'a [DetectedPartition],
    #[serde(flatten)]
    eligibility: &'a EligibilityReport,
}

fn main() {
    let cli = Cli::parse();

    ui::init(
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        std::io::stdout().is_terminal(),
    );

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            emit(Level::Error, "config.load", &format!("{:#}", e), None);
            std::process::exit(1);
        }
    };

    let log_file = cli.log.clone().unwrap_or_else(|| config.log_file.clone());
    let guard = match logging::init(&log_file, cli.debug) {
        Ok(guard) => guard,
        Err(e) => {
            emit(Level::Error, "logging.init", &format!("{:#}", e), None);
            std::process::exit(1);
        }
    };

    let code = match run(&cli, config) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:?}", e);
            emit(
                Level::Error,
                "failure",
                &format!(
                    "Unexpected error: '{}'.\nSee log file {} for details",
                    e,
                    log_file.display()
                ),
                None,
            );
            1
        }
    };

    // Flush the log before exiting.
    drop(guard);
    std::process::exit(code);
}

fn run(cli: &Cli, config: Config) -> Result<()> {
    if !matches!(sudo::check(), RunningAs::Root) {
        bail!("{} has to be invoked as root or with sudo", env!("CARGO_PKG_NAME"));
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), ?cli, "starting");
    if !cli.json {
        emit(
            Level::Info,
            "version",
            &format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            None,
        );
    }

    let policy = config.emptiness.clone();
    let facts = SystemDeviceFacts::new(Box::new(SystemRunner), config);

    let devices = facts.physical_devices()?;
    let detected = facts.all_detected()?;
    let options = Options { force: cli.force };
    let report = eligibility::evaluate(&facts, &FsInspector, options, &policy)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&JsonReport {
            devices: &devices,
            partitions: &detected,
            eligibility: &report,
        })?;
        println!("{}", json);
        return Ok(());
    }

    ui::print_physical_devices(&devices);
    ui::print_detected(&detected);
    ui::separator();
    ui::print_source(&report.source);
    ui::print_verdicts(&report.verdicts);
    ui::separator();

    if cli.report {
        ui::print_eligible(&report.eligible);
        return Ok(());
    }

    let executor = Executor::new(cli.dry_run);
    match migrate::run(&facts, &report, facts.config(), &executor, &TerminalPrompt)? {
        Outcome::Moved { target, target_id } => {
            tracing::info!(%target, %target_id, "root partition moved");
        }
        Outcome::Cancelled => {
            emit(Level::Info, "migrate.cancelled", "Nothing changed", None);
        }
    }
    Ok(())
}
