use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveDefaults {
    pub keep_days: i64,
}

impl Default for ArchiveDefaults {
    fn default() -> Self {
        Self { keep_days: 14 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployDefaults {
    /// Path to the SQL client binary. When unset the client is looked up
    /// on PATH as `sqlcmd`.
    pub sql_client: Option<String>,
    pub timeout_secs: u64,
    /// Statement executed after a version completes; `{version}` is
    /// substituted with the version identifier.
    pub version_marker_sql: String,
}

impl Default for DeployDefaults {
    fn default() -> Self {
        Self {
            sql_client: None,
            timeout_secs: 86_400,
            version_marker_sql: "UPDATE dbo.DeploymentVersion SET CurrentVersion = '{version}';"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingDefaults {
    pub folder: Option<String>,
    pub deploy_log_name: String,
}

impl Default for LoggingDefaults {
    fn default() -> Self {
        Self {
            folder: None,
            deploy_log_name: "SqlDeploy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpsConfig {
    pub archive: ArchiveDefaults,
    pub deploy: DeployDefaults,
    pub logging: LoggingDefaults,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialOpsConfig {
    archive: Option<ArchiveDefaults>,
    deploy: Option<DeployDefaults>,
    logging: Option<LoggingDefaults>,
}

impl OpsConfig {
    /// Resolved log folder: explicit config value, else the platform state
    /// directory under `opsrunner/logs`.
    pub fn log_folder(&self) -> PathBuf {
        if let Some(folder) = &self.logging.folder {
            let trimmed = folder.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        default_log_folder()
    }
}

fn default_log_folder() -> PathBuf {
    if let Some(state) = dirs::state_dir() {
        return state.join("opsrunner").join("logs");
    }
    match dirs::home_dir() {
        Some(home) => home.join(".local/state/opsrunner/logs"),
        None => PathBuf::from("opsrunner-logs"),
    }
}

fn env_or_i64(var: &str, fallback: i64) -> i64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<i64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_opt_string(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => fallback,
    }
}

fn validate(cfg: &OpsConfig) -> Result<()> {
    if cfg.archive.keep_days < 0 {
        return Err(anyhow!("invalid keep days: must be >= 0"));
    }
    if cfg.deploy.timeout_secs == 0 {
        return Err(anyhow!("invalid sql timeout: must be >= 1 second"));
    }
    if !cfg.deploy.version_marker_sql.contains(VERSION_PLACEHOLDER) {
        return Err(anyhow!(
            "invalid version marker sql: missing `{VERSION_PLACEHOLDER}` placeholder"
        ));
    }
    if cfg.logging.deploy_log_name.trim().is_empty() {
        return Err(anyhow!("invalid deploy log name: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("OPSRUNNER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".config").join("opsrunner").join("config.toml"))
}

fn merge_file_config(base: &mut OpsConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialOpsConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(archive) = parsed.archive {
        base.archive = archive;
    }
    if let Some(deploy) = parsed.deploy {
        base.deploy = deploy;
    }
    if let Some(logging) = parsed.logging {
        base.logging = logging;
    }
    Ok(())
}

pub fn load_config() -> Result<OpsConfig> {
    let mut cfg = OpsConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.archive.keep_days = env_or_i64("OPSRUNNER_KEEP_DAYS", cfg.archive.keep_days);
    cfg.deploy.sql_client = env_or_opt_string("OPSRUNNER_SQL_CLIENT", cfg.deploy.sql_client);
    cfg.deploy.timeout_secs = env_or_u64("OPSRUNNER_SQL_TIMEOUT_SECS", cfg.deploy.timeout_secs);
    cfg.deploy.version_marker_sql = env_or_string(
        "OPSRUNNER_VERSION_MARKER_SQL",
        &cfg.deploy.version_marker_sql,
    );
    cfg.logging.folder = env_or_opt_string("OPSRUNNER_LOG_FOLDER", cfg.logging.folder);
    cfg.logging.deploy_log_name = env_or_string(
        "OPSRUNNER_DEPLOY_LOG_NAME",
        &cfg.logging.deploy_log_name,
    );

    validate(&cfg)?;
    Ok(cfg)
}
