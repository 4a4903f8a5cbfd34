use crate::cli::DeployArgs;
use crate::commands::CommandReport;
use crate::ops::config::OpsConfig;
use crate::ops::deployer::{self, DeployOptions};
use crate::ops::logging::RunLog;
use crate::ops::sql::SqlcmdClient;
use anyhow::{Result, bail};

pub fn run(args: &DeployArgs, cfg: &OpsConfig) -> Result<CommandReport> {
    if args.server.trim().is_empty() {
        bail!("server cannot be empty");
    }
    if !args.main_path.is_dir() {
        bail!("main path does not exist: {}", args.main_path.display());
    }
    if let Some(folder) = &args.log_folder {
        if !folder.is_dir() {
            bail!("log folder does not exist: {}", folder.display());
        }
    }

    let log_folder = args
        .log_folder
        .clone()
        .unwrap_or_else(|| cfg.log_folder());
    let log_name = args
        .log_type
        .clone()
        .unwrap_or_else(|| cfg.logging.deploy_log_name.clone());
    let log = RunLog::new(log_folder, log_name);

    let sql = SqlcmdClient::new(args.server.trim(), &cfg.deploy)?;
    let opts = DeployOptions {
        server: args.server.trim().to_string(),
        main_path: args.main_path.clone(),
    };

    let mut report = CommandReport::new("deploy");
    match deployer::run(&opts, &log, &sql) {
        Ok(outcome) => {
            report.detail(format!(
                "{} version(s) processed, {} script(s) executed, {} skipped",
                outcome.versions, outcome.executed, outcome.skipped
            ));
        }
        Err(err) => {
            // Fail-fast boundary: no subsequent version is attempted.
            let _ = log.error(format!("deployment aborted: {err:#}"));
            report.issue(format!("deployment aborted: {err:#}"));
        }
    }

    Ok(report)
}
