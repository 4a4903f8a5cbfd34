use crate::error::DeployError;
use crate::ops::config::{DeployDefaults, VERSION_PLACEHOLDER};
use crate::ops::util::run_with_timeout;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Seam between the deployment runner and the database. The runner only
/// needs `execute(sql) -> success | error` semantics; connection handling
/// lives behind this trait.
pub trait SqlExecutor {
    fn run_script(&self, script: &Path) -> Result<()>;
    fn set_current_version(&self, version: &str) -> Result<()>;
}

/// `sqlcmd`-backed executor. `-b` makes the client exit non-zero when a
/// batch raises an error, which is what turns SQL failures into run
/// failures here.
pub struct SqlcmdClient {
    bin: PathBuf,
    server: String,
    timeout_secs: u64,
    marker_sql: String,
}

fn ensure_client_path(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|_| {
        DeployError::SqlClientUnavailable(format!("no such file: {}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(
            DeployError::SqlClientUnavailable(format!("not a file: {}", path.display())).into(),
        );
    }
    Ok(())
}

fn resolve_sql_client(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(custom) = configured {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            ensure_client_path(&path)?;
            return Ok(path);
        }
    }
    which::which("sqlcmd").map_err(|_| {
        DeployError::SqlClientUnavailable(
            "sqlcmd not found on PATH; set OPSRUNNER_SQL_CLIENT".to_string(),
        )
        .into()
    })
}

impl SqlcmdClient {
    pub fn new(server: impl Into<String>, defaults: &DeployDefaults) -> Result<Self> {
        let bin = resolve_sql_client(defaults.sql_client.as_deref())?;
        Ok(Self {
            bin,
            server: server.into(),
            timeout_secs: defaults.timeout_secs,
            marker_sql: defaults.version_marker_sql.clone(),
        })
    }

    fn run_client(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        run_with_timeout(&mut cmd, Some(self.timeout_secs)).with_context(|| {
            format!("failed to run `{} {}`", self.bin.display(), args.join(" "))
        })
    }

    fn check(out: Output, what: &str) -> Result<()> {
        if out.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stdout = String::from_utf8_lossy(&out.stdout);
        Err(DeployError::ExecutionFailed(format!(
            "{what}: {}",
            if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            }
        ))
        .into())
    }
}

impl SqlExecutor for SqlcmdClient {
    fn run_script(&self, script: &Path) -> Result<()> {
        let script_str = script.display().to_string();
        let out = self.run_client(&["-S", &self.server, "-b", "-i", &script_str])?;
        Self::check(out, &script_str)
    }

    fn set_current_version(&self, version: &str) -> Result<()> {
        let sql = self.marker_sql.replace(VERSION_PLACEHOLDER, version);
        let out = self.run_client(&["-S", &self.server, "-b", "-Q", &sql])?;
        Self::check(out, "version marker update")
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_sql_client;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn configured_client_must_exist() {
        let err = resolve_sql_client(Some("/nope/sqlcmd")).expect_err("should fail");
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn configured_client_path_is_used_verbatim() {
        let tmp = tempdir().expect("tempdir");
        let bin = tmp.path().join("sqlcmd");
        fs::write(&bin, "#!/bin/sh\nexit 0\n").expect("write stub");

        let got = resolve_sql_client(Some(bin.to_str().expect("utf8"))).expect("resolve");
        assert_eq!(got, bin);
    }
}
