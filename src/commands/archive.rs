use crate::cli::ArchiveArgs;
use crate::commands::CommandReport;
use crate::ops::archiver::{self, ArchiveOptions};
use crate::ops::config::OpsConfig;
use crate::ops::logging::RunLog;
use anyhow::{Result, bail};

pub fn run(args: &ArchiveArgs, cfg: &OpsConfig) -> Result<CommandReport> {
    if !args.source.is_dir() {
        bail!("source directory does not exist: {}", args.source.display());
    }
    if !args.destination.is_dir() {
        bail!(
            "destination directory does not exist: {}",
            args.destination.display()
        );
    }
    if args.app_name.trim().is_empty() {
        bail!("app name cannot be empty");
    }
    // Same bound config::validate enforces; a negative window would put
    // the cutoff in the future and select folders written today.
    if args.keep_days.is_some_and(|days| days < 0) {
        bail!("keep days must be >= 0");
    }
    if let Some(folder) = &args.log_folder {
        if !folder.is_dir() {
            bail!("log folder does not exist: {}", folder.display());
        }
    }

    // Default staging root: the parent of the source, i.e. the same drive,
    // so compression never happens over the destination path.
    let compress_root = match &args.compress_root {
        Some(root) => {
            if !root.is_dir() {
                bail!("compress root does not exist: {}", root.display());
            }
            root.clone()
        }
        None => args
            .source
            .parent()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| args.source.clone()),
    };

    let opts = ArchiveOptions {
        source: args.source.clone(),
        destination: args.destination.clone(),
        app_name: args.app_name.trim().to_string(),
        keep_days: args.keep_days.unwrap_or(cfg.archive.keep_days),
        compress_root,
    };

    let log_folder = args
        .log_folder
        .clone()
        .unwrap_or_else(|| cfg.log_folder());
    let log = RunLog::new(log_folder, &opts.app_name);

    let mut report = CommandReport::new("archive");
    match archiver::run(&opts, &log) {
        Ok(outcome) => {
            report.detail(format!(
                "{} folder(s) scanned, {} archived, {} skipped (name), {} skipped (recent)",
                outcome.scanned, outcome.archived, outcome.skipped_name, outcome.skipped_recent
            ));
            if outcome.verify_failed > 0 {
                report.issue(format!(
                    "{} folder(s) failed archive verification and were retained",
                    outcome.verify_failed
                ));
            }
        }
        Err(err) => {
            // Top-level boundary: log and stop, no further folders.
            let _ = log.error(format!("archive run aborted: {err:#}"));
            report.issue(format!("archive run aborted: {err:#}"));
        }
    }

    Ok(report)
}
