pub mod manage;
pub mod stats;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use manage::{process_settings_command, process_whitelist_command, WhitelistCommand};
use stats::{process_site_command, process_stats_command, SiteCommand, StatsCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{start_daemon, storage::kv::JsonFileStore, STORE_FILE},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, LogOptions, LogSource},
    },
};

#[derive(Parser, Debug)]
#[command(name = "sitetime", version, long_about = None)]
#[command(about = "Tracks active time spent on websites", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Print logs to stderr at trace level")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the tracker. Browser events are read from stdin, one JSON object per line"
    )]
    Serve {},
    #[command(about = "Show time spent per site")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Show daily time spent on one site")]
    Site {
        #[command(flatten)]
        command: SiteCommand,
    },
    #[command(about = "Manage sites that are never recorded")]
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommand,
    },
    #[command(about = "Show or change settings")]
    Settings {
        #[arg(long = "tracking-delay", help = "Minimal time on a site in seconds, 1 to 100")]
        tracking_delay: Option<u32>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let source = match args.commands {
        Commands::Serve {} => LogSource::Tracker,
        _ => LogSource::Cli,
    };
    enable_logging(
        &dir,
        LogOptions {
            source,
            level: logging_level,
            echo_stderr: args.log,
        },
    )?;

    let store = || JsonFileStore::new(dir.join(STORE_FILE));

    match args.commands {
        Commands::Serve {} => start_daemon(dir.clone()).await,
        Commands::Stats { command } => process_stats_command(store()?, command).await,
        Commands::Site { command } => process_site_command(store()?, command).await,
        Commands::Whitelist { command } => process_whitelist_command(store()?, command).await,
        Commands::Settings { tracking_delay } => {
            process_settings_command(store()?, tracking_delay).await
        }
    }
}
