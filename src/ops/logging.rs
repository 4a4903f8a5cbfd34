use crate::ops::util::host_identifier;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
    Warn,
    Start,
    End,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Start => "Start",
            Self::End => "End",
        }
    }
}

/// Append-only per-log-name, per-day log writer. Every entry is echoed to
/// stdout and appended to `{dir}/{name}/{yyyy}/{MM}/{name}-{yyyymmdd}.log`.
/// Single-writer assumption; no rotation, no locking.
#[derive(Debug, Clone)]
pub struct RunLog {
    log_dir: PathBuf,
    log_name: String,
}

impl RunLog {
    pub fn new(log_dir: impl Into<PathBuf>, log_name: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            log_name: log_name.into(),
        }
    }

    pub fn file_path_for(&self, day: NaiveDate) -> PathBuf {
        self.log_dir
            .join(&self.log_name)
            .join(day.format("%Y").to_string())
            .join(day.format("%m").to_string())
            .join(format!("{}-{}.log", self.log_name, day.format("%Y%m%d")))
    }

    pub fn entry(&self, level: LogLevel, message: &str) -> Result<()> {
        let now = Local::now();
        let path = self.file_path_for(now.date_naive());
        let fresh = !path.exists();
        if fresh {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        if fresh {
            let banner = format!(
                "=== {} log created {} on {} ===\n=== {} ===\n",
                self.log_name,
                now.format("%Y-%m-%d %H:%M:%S"),
                host_identifier(),
                path.display()
            );
            file.write_all(banner.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        // A blank line before Start separates runs sharing the daily file.
        if level == LogLevel::Start {
            println!();
            file.write_all(b"\n")?;
        }

        let line = format!(
            "[{}][{}] {}",
            level.as_str(),
            now.format("%Y-%m-%d %H:%M:%S"),
            message
        );
        println!("{line}");
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn info(&self, message: impl AsRef<str>) -> Result<()> {
        self.entry(LogLevel::Info, message.as_ref())
    }

    pub fn warn(&self, message: impl AsRef<str>) -> Result<()> {
        self.entry(LogLevel::Warn, message.as_ref())
    }

    pub fn error(&self, message: impl AsRef<str>) -> Result<()> {
        self.entry(LogLevel::Error, message.as_ref())
    }

    pub fn start(&self, message: impl AsRef<str>) -> Result<()> {
        self.entry(LogLevel::Start, message.as_ref())
    }

    pub fn end(&self, message: impl AsRef<str>) -> Result<()> {
        self.entry(LogLevel::End, message.as_ref())
    }
}
