use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions for a deployment run. All of these map to exit code 1;
/// there is no partial-success exit code.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("version list not found: {}", .0.display())]
    MissingVersionList(PathBuf),
    #[error("version directory not found: {}", .0.display())]
    MissingVersionDir(PathBuf),
    #[error("controller file not found: {}", .0.display())]
    MissingController(PathBuf),
    #[error("script file not found: {}", .0.display())]
    MissingScript(PathBuf),
    #[error("sql client unavailable: {0}")]
    SqlClientUnavailable(String),
    #[error("script execution failed: {0}")]
    ExecutionFailed(String),
}
