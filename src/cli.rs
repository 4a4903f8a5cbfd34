use crate::commands;
use crate::ops::config;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "opsrunner",
    version,
    about = "Retention-based folder archival and sequential SQL deployment runs"
)]
struct Cli {
    /// Print the run report as JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compress dated folders past the retention window and relocate them.
    Archive(ArchiveArgs),
    /// Execute pending SQL deployment scripts version by version.
    Deploy(DeployArgs),
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Directory containing YYYYMMDD-named subfolders.
    #[arg(long)]
    pub source: PathBuf,

    /// Directory the finished archives are moved to.
    #[arg(long)]
    pub destination: PathBuf,

    /// Archive filename prefix, also used as the log name.
    #[arg(long)]
    pub app_name: String,

    /// Retention window in days (default from config, 14).
    #[arg(long)]
    pub keep_days: Option<i64>,

    /// Local directory holding the hidden staging area; defaults to the
    /// parent of --source.
    #[arg(long)]
    pub compress_root: Option<PathBuf>,

    /// Override the configured log folder.
    #[arg(long)]
    pub log_folder: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Connection target passed to the SQL client.
    #[arg(long)]
    pub server: String,

    /// Directory containing Versions.txt and the version subdirectories.
    #[arg(long)]
    pub main_path: PathBuf,

    /// Override the configured log folder.
    #[arg(long)]
    pub log_folder: Option<PathBuf>,

    /// Log name for this run (default from config, "SqlDeploy").
    #[arg(long)]
    pub log_type: Option<String>,
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    let report = match &cli.command {
        Command::Archive(args) => commands::archive::run(args, &cfg)?,
        Command::Deploy(args) => commands::deploy::run(args, &cfg)?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for issue in &report.issues {
            eprintln!("issue: {issue}");
        }
    }

    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
