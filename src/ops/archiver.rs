use crate::ops::compress;
use crate::ops::logging::RunLog;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Hidden staging directory created under the compress root. Archives are
/// built here first so compression I/O stays on a local drive even when
/// the destination is a network path.
pub const STAGING_DIR_NAME: &str = ".opsrunner-staging";

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub app_name: String,
    pub keep_days: i64,
    pub compress_root: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ArchiveOutcome {
    pub scanned: usize,
    pub skipped_name: usize,
    pub skipped_recent: usize,
    pub archived: usize,
    pub verify_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedFolder {
    pub path: PathBuf,
    pub name: String,
    pub last_write: NaiveDate,
}

/// A folder enters the processing set only when its name is an exact
/// `YYYYMMDD` calendar date. Anything else is a parse error for that entry
/// and excludes it, logged at Warn, never silently carried along.
fn scan_dated_folders(
    source: &Path,
    log: &RunLog,
    outcome: &mut ArchiveOutcome,
) -> Result<Vec<DatedFolder>> {
    let mut folders = Vec::new();
    for entry in
        fs::read_dir(source).with_context(|| format!("failed to list {}", source.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        outcome.scanned += 1;

        let name = entry.file_name().to_string_lossy().to_string();
        if let Err(err) = NaiveDate::parse_from_str(&name, DATE_FORMAT) {
            log.warn(format!("skipping `{name}`: not a dated folder ({err})"))?;
            outcome.skipped_name += 1;
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let last_write = DateTime::<Local>::from(modified).date_naive();

        folders.push(DatedFolder {
            path,
            name,
            last_write,
        });
    }
    Ok(folders)
}

/// Keep folders whose last-write date is strictly before
/// `today - keep_days`; returns survivors plus the count filtered out.
pub fn select_eligible(
    folders: Vec<DatedFolder>,
    today: NaiveDate,
    keep_days: i64,
) -> (Vec<DatedFolder>, usize) {
    let cutoff = today - Duration::days(keep_days);
    let before = folders.len();
    let eligible: Vec<DatedFolder> = folders
        .into_iter()
        .filter(|f| f.last_write < cutoff)
        .collect();
    let skipped = before - eligible.len();
    (eligible, skipped)
}

fn ensure_staging_dir(compress_root: &Path) -> Result<PathBuf> {
    let staging = compress_root.join(STAGING_DIR_NAME);
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    Ok(staging)
}

fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if matches!(
                rename_err.kind(),
                ErrorKind::CrossesDevices | ErrorKind::PermissionDenied
            ) {
                fs::copy(from, to).with_context(|| {
                    format!("failed to copy {} to {}", from.display(), to.display())
                })?;
                fs::remove_file(from)
                    .with_context(|| format!("failed to remove {}", from.display()))?;
                Ok(())
            } else {
                Err(rename_err).with_context(|| {
                    format!("failed to move {} to {}", from.display(), to.display())
                })
            }
        }
    }
}

/// Source deletion is gated on this: the relocated archive must exist and
/// hash identically to what was staged. A `false` here is fail-soft.
fn verify_archive(dest: &Path, expected_hash: &str) -> bool {
    if !dest.is_file() {
        return false;
    }
    match file_hash(dest) {
        Ok(hash) => hash == expected_hash,
        Err(_) => false,
    }
}

pub fn run(opts: &ArchiveOptions, log: &RunLog) -> Result<ArchiveOutcome> {
    log.start(format!(
        "archive run starting: {} -> {} (keep {} days)",
        opts.source.display(),
        opts.destination.display(),
        opts.keep_days
    ))?;

    let mut outcome = ArchiveOutcome::default();
    let folders = scan_dated_folders(&opts.source, log, &mut outcome)?;
    let today = Local::now().date_naive();
    let (eligible, skipped_recent) = select_eligible(folders, today, opts.keep_days);
    outcome.skipped_recent = skipped_recent;

    log.info(format!("eligible folders: {}", eligible.len()))?;
    if eligible.is_empty() {
        log.end("archive run complete: nothing to do")?;
        return Ok(outcome);
    }

    let staging = ensure_staging_dir(&opts.compress_root)?;

    for folder in &eligible {
        let archive_name = format!("{}-{}.zip", opts.app_name, folder.name);
        let staged = staging.join(&archive_name);
        log.info(format!(
            "compressing {} -> {}",
            folder.path.display(),
            staged.display()
        ))?;
        compress::zip_dir(&folder.path, &staged)?;
        let staged_hash = file_hash(&staged)?;

        let dest = opts.destination.join(&archive_name);
        move_file(&staged, &dest)?;

        if verify_archive(&dest, &staged_hash) {
            fs::remove_dir_all(&folder.path)
                .with_context(|| format!("failed to remove {}", folder.path.display()))?;
            log.info(format!(
                "archived `{}` to {} and removed source",
                folder.name,
                dest.display()
            ))?;
            outcome.archived += 1;
        } else {
            log.error(format!(
                "verification failed for {}; source folder retained",
                dest.display()
            ))?;
            outcome.verify_failed += 1;
        }
    }

    log.end(format!(
        "archive run complete: {} archived, {} verification failure(s)",
        outcome.archived, outcome.verify_failed
    ))?;
    Ok(outcome)
}
