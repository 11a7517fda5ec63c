//! `logincmd` binary: inspect, validate, dry-run, import/export, and drive
//! the login command scheduler from a file-based control channel.

mod commands;
mod control;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use logincmd_config::default_settings_path;

use crate::control::RunConfig;

#[derive(Debug, Parser)]
#[command(
    name = "logincmd",
    about = "Login-triggered command execution scheduler",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "LOGINCMD_SETTINGS",
        global = true,
        help = "Path to the settings document (default .logincmd/settings.json)"
    )]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a posture summary of the stored configuration.
    Inspect {
        #[arg(long, help = "Emit the report as pretty JSON")]
        json: bool,
    },
    /// Run the sanitizer against the stored document and report repairs.
    Validate {
        #[arg(long, help = "Persist the repaired document when changes were needed")]
        write: bool,
    },
    /// Dry-run a login for an identity and print the execution plan.
    Plan {
        #[arg(long, help = "Character name the plan is built for")]
        character: String,
        #[arg(long, help = "Numeric world identifier")]
        world_id: u16,
        #[arg(long, default_value = "", help = "World name (preferred over the id when set)")]
        world_name: String,
        #[arg(long, help = "Emit the plan rows as pretty JSON")]
        json: bool,
    },
    /// Export profiles and global commands as a transfer payload.
    Export {
        #[arg(long, help = "Write the payload to a file instead of stdout")]
        out: Option<PathBuf>,
    },
    /// Import a transfer payload, replacing profiles and global commands.
    Import {
        #[arg(long, help = "Transfer payload file to import")]
        file: PathBuf,
    },
    /// Show recent execution journal entries.
    Logs {
        #[arg(long, default_value_t = 20, help = "Maximum entries to show")]
        limit: usize,
    },
    /// Drive the scheduler from a control directory until ctrl-c.
    Run {
        #[arg(
            long,
            help = "Directory watched for control event files (default .logincmd/control)"
        )]
        control_dir: Option<PathBuf>,
        #[arg(
            long,
            help = "JSONL file dispatched commands are appended to (default .logincmd/outbox.jsonl)"
        )]
        outbox: Option<PathBuf>,
        #[arg(long, default_value_t = 100, help = "Tick interval in milliseconds")]
        tick_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings_path = match cli.settings {
        Some(path) => path,
        None => default_settings_path()?,
    };

    match cli.command {
        Command::Inspect { json } => commands::execute_inspect(&settings_path, json),
        Command::Validate { write } => commands::execute_validate(&settings_path, write),
        Command::Plan {
            character,
            world_id,
            world_name,
            json,
        } => commands::execute_plan(&settings_path, &character, world_id, &world_name, json),
        Command::Export { out } => commands::execute_export(&settings_path, out.as_deref()),
        Command::Import { file } => commands::execute_import(&settings_path, &file),
        Command::Logs { limit } => commands::execute_logs(&settings_path, limit),
        Command::Run {
            control_dir,
            outbox,
            tick_ms,
        } => {
            let base = settings_path
                .parent()
                .map(|parent| parent.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            control::run_loop(RunConfig {
                settings_path: settings_path.clone(),
                control_dir: control_dir.unwrap_or_else(|| base.join("control")),
                outbox_path: outbox.unwrap_or_else(|| base.join("outbox.jsonl")),
                tick_interval: Duration::from_millis(tick_ms.max(1)),
            })
            .await
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
