use crate::error::DeployError;
use crate::ops::controller::{ControllerLine, load_controller, mark_completed, read_version_list};
use crate::ops::logging::RunLog;
use crate::ops::sql::SqlExecutor;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

pub const VERSION_LIST_FILE: &str = "Versions.txt";

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub server: String,
    pub main_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeployOutcome {
    pub versions: usize,
    pub executed: usize,
    pub skipped: usize,
}

/// Sequential deployment run. Fail-fast: the first missing file, missing
/// directory, or execution error aborts the whole run with no rollback;
/// progress already persisted in controller files stands, so a re-run
/// resumes at the first uncommented entry.
pub fn run(opts: &DeployOptions, log: &RunLog, sql: &dyn SqlExecutor) -> Result<DeployOutcome> {
    log.start(format!(
        "deployment run starting against `{}` from {}",
        opts.server,
        opts.main_path.display()
    ))?;

    let versions_file = opts.main_path.join(VERSION_LIST_FILE);
    if !versions_file.is_file() {
        return Err(DeployError::MissingVersionList(versions_file).into());
    }
    let versions = read_version_list(&versions_file)?;
    log.info(format!("{} version(s) listed", versions.len()))?;

    let mut outcome = DeployOutcome::default();
    for version in &versions {
        run_version(opts, log, sql, version, &mut outcome)?;
        sql.set_current_version(version)?;
        log.info(format!("current version marker advanced to `{version}`"))?;
        outcome.versions += 1;
    }

    log.end(format!(
        "deployment run complete: {} version(s), {} script(s) executed, {} skipped",
        outcome.versions, outcome.executed, outcome.skipped
    ))?;
    Ok(outcome)
}

fn run_version(
    opts: &DeployOptions,
    log: &RunLog,
    sql: &dyn SqlExecutor,
    version: &str,
    outcome: &mut DeployOutcome,
) -> Result<()> {
    let version_dir = opts.main_path.join(version);
    if !version_dir.is_dir() {
        return Err(DeployError::MissingVersionDir(version_dir).into());
    }
    let controller_path = version_dir.join(format!("{version}.Controller.sql"));
    if !controller_path.is_file() {
        return Err(DeployError::MissingController(controller_path).into());
    }

    log.info(format!("processing version `{version}`"))?;
    let lines = load_controller(&controller_path)?;

    for line in &lines {
        let ControllerLine::Script { text, completed } = line else {
            continue;
        };
        if *completed {
            log.info(format!("skipping completed entry `{text}`"))?;
            outcome.skipped += 1;
            continue;
        }

        let script_name = text.trim();
        let script_path = version_dir.join(script_name);
        if !script_path.is_file() {
            return Err(DeployError::MissingScript(script_path).into());
        }

        log.info(format!("executing `{script_name}`"))?;
        sql.run_script(&script_path)?;
        // Persist completion before moving on; a crash after this line
        // leaves the controller accurate for the next invocation.
        mark_completed(&controller_path, text)?;
        log.info(format!("completed `{script_name}`"))?;
        outcome.executed += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DeployOptions, run};
    use crate::error::DeployError;
    use crate::ops::logging::RunLog;
    use crate::ops::sql::SqlExecutor;
    use anyhow::Result;
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<String>>,
        fail_on: Option<String>,
    }

    impl SqlExecutor for RecordingExecutor {
        fn run_script(&self, script: &Path) -> Result<()> {
            let name = script
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            self.calls.borrow_mut().push(format!("run:{name}"));
            if self.fail_on.as_deref() == Some(name.as_str()) {
                anyhow::bail!("simulated execution error in {name}");
            }
            Ok(())
        }

        fn set_current_version(&self, version: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("mark:{version}"));
            Ok(())
        }
    }

    fn seed_version(main: &Path, version: &str, controller: &str, scripts: &[&str]) {
        let dir = main.join(version);
        fs::create_dir_all(&dir).expect("mkdir version");
        fs::write(dir.join(format!("{version}.Controller.sql")), controller)
            .expect("write controller");
        for script in scripts {
            fs::write(dir.join(script), format!("-- {script}\nSELECT 1;\n"))
                .expect("write script");
        }
    }

    fn opts(main: &Path) -> DeployOptions {
        DeployOptions {
            server: "db01".to_string(),
            main_path: main.to_path_buf(),
        }
    }

    fn test_log(root: &Path) -> RunLog {
        RunLog::new(root.join("logs"), "DeployTest")
    }

    #[test]
    fn pending_entries_run_in_file_order_and_get_commented() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "1\n").expect("versions");
        seed_version(&main, "1", "a.sql\n/* b.sql */\nc.sql\n", &["a.sql", "b.sql", "c.sql"]);

        let exec = RecordingExecutor::default();
        let outcome = run(&opts(&main), &test_log(tmp.path()), &exec).expect("run");

        assert_eq!(
            *exec.calls.borrow(),
            vec!["run:a.sql", "run:c.sql", "mark:1"]
        );
        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.skipped, 1);

        let controller =
            fs::read_to_string(main.join("1/1.Controller.sql")).expect("read controller");
        assert_eq!(controller, "/* a.sql */\n/* b.sql */\n/* c.sql */\n");
    }

    #[test]
    fn versions_are_processed_in_ascending_text_order() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "2\n1\n").expect("versions");
        seed_version(&main, "1", "a.sql\n", &["a.sql"]);
        seed_version(&main, "2", "b.sql\n", &["b.sql"]);

        let exec = RecordingExecutor::default();
        run(&opts(&main), &test_log(tmp.path()), &exec).expect("run");

        assert_eq!(
            *exec.calls.borrow(),
            vec!["run:a.sql", "mark:1", "run:b.sql", "mark:2"]
        );
    }

    #[test]
    fn execution_error_stops_before_later_versions() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "1\n2\n").expect("versions");
        seed_version(&main, "1", "a.sql\nboom.sql\n", &["a.sql", "boom.sql"]);
        seed_version(&main, "2", "c.sql\n", &["c.sql"]);

        let exec = RecordingExecutor {
            fail_on: Some("boom.sql".to_string()),
            ..Default::default()
        };
        let err = run(&opts(&main), &test_log(tmp.path()), &exec).expect_err("should fail");
        assert!(format!("{err:#}").contains("boom.sql"));

        // a.sql completed and was persisted; boom.sql stayed pending;
        // version 2 and the version-1 marker were never reached.
        let controller =
            fs::read_to_string(main.join("1/1.Controller.sql")).expect("read controller");
        assert_eq!(controller, "/* a.sql */\nboom.sql\n");
        let calls = exec.calls.borrow();
        assert!(!calls.iter().any(|c| c == "mark:1"));
        assert!(!calls.iter().any(|c| c == "run:c.sql"));
    }

    #[test]
    fn missing_version_list_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");

        let exec = RecordingExecutor::default();
        let err = run(&opts(&main), &test_log(tmp.path()), &exec).expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::MissingVersionList(_))
        ));
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn missing_version_directory_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "7\n").expect("versions");

        let exec = RecordingExecutor::default();
        let err = run(&opts(&main), &test_log(tmp.path()), &exec).expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::MissingVersionDir(_))
        ));
    }

    #[test]
    fn missing_script_is_fatal_before_execution() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "1\n").expect("versions");
        seed_version(&main, "1", "ghost.sql\n", &[]);

        let exec = RecordingExecutor::default();
        let err = run(&opts(&main), &test_log(tmp.path()), &exec).expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::MissingScript(_))
        ));
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn rerun_after_full_success_executes_nothing_new() {
        let tmp = tempdir().expect("tempdir");
        let main = tmp.path().join("main");
        fs::create_dir_all(&main).expect("mkdir main");
        fs::write(main.join("Versions.txt"), "1\n").expect("versions");
        seed_version(&main, "1", "a.sql\n", &["a.sql"]);

        let log = test_log(tmp.path());
        let first = RecordingExecutor::default();
        run(&opts(&main), &log, &first).expect("first run");

        let second = RecordingExecutor::default();
        let outcome = run(&opts(&main), &log, &second).expect("second run");
        assert_eq!(*second.calls.borrow(), vec!["mark:1"]);
        assert_eq!(outcome.executed, 0);
        assert_eq!(outcome.skipped, 1);
    }
}
