//! Supervisor contract tests against stand-in engine executables.
//!
//! The stand-ins are tiny shell scripts, so the process-facing tests are
//! unix-only. The cleanup guarantee is asserted by giving the supervisor a
//! dedicated configuration directory and checking it is empty afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mt4lab_runner::supervisor::{run_engine, EngineConfig, SilentObserver, SuperviseError};

fn fast_config(executable: PathBuf, config_dir: &Path) -> EngineConfig {
    EngineConfig {
        executable,
        config_dir: Some(config_dir.to_path_buf()),
        poll_interval: Duration::from_millis(10),
        timeout: None,
    }
}

fn assert_config_dir_empty(dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(
        leftovers.is_empty(),
        "transient configuration left behind: {leftovers:?}"
    );
}

#[cfg(unix)]
fn fake_engine(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("engine.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn clean_exit_reports_elapsed_and_removes_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("cfg");
    std::fs::create_dir_all(&cfg_dir).unwrap();

    let engine = fake_engine(dir.path(), "exit 0");
    let config = fast_config(engine, &cfg_dir);

    let run = run_engine(&config, "[Tester]\n", &SilentObserver).unwrap();
    assert!(run.elapsed < Duration::from_secs(30));
    assert_config_dir_empty(&cfg_dir);
}

#[cfg(unix)]
#[test]
fn nonzero_exit_is_not_interpreted_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("cfg");
    std::fs::create_dir_all(&cfg_dir).unwrap();

    let engine = fake_engine(dir.path(), "exit 3");
    let config = fast_config(engine, &cfg_dir);

    // The engine signals failure only through its report; the exit code is
    // opaque to the supervisor.
    run_engine(&config, "[Tester]\n", &SilentObserver).unwrap();
    assert_config_dir_empty(&cfg_dir);
}

#[cfg(unix)]
#[test]
fn configuration_text_reaches_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("cfg");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    let captured = dir.path().join("captured.ini");

    // The engine is launched as `engine --config <path>`; $2 is the path.
    let engine = fake_engine(dir.path(), &format!("cp \"$2\" \"{}\"", captured.display()));
    let config = fast_config(engine, &cfg_dir);

    let ini = "[Tester]\nExpert=X\nSymbol=EURUSD\n";
    run_engine(&config, ini, &SilentObserver).unwrap();

    assert_eq!(std::fs::read_to_string(&captured).unwrap(), ini);
    assert_config_dir_empty(&cfg_dir);
}

#[test]
fn missing_executable_is_a_launch_error_and_removes_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("cfg");
    std::fs::create_dir_all(&cfg_dir).unwrap();

    let config = fast_config(dir.path().join("no-such-engine"), &cfg_dir);
    let err = run_engine(&config, "[Tester]\n", &SilentObserver).unwrap_err();

    assert!(matches!(err, SuperviseError::Launch { .. }));
    assert!(err.to_string().contains("no-such-engine"));
    assert_config_dir_empty(&cfg_dir);
}

#[cfg(unix)]
#[test]
fn timeout_kills_the_engine_and_removes_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join("cfg");
    std::fs::create_dir_all(&cfg_dir).unwrap();

    let engine = fake_engine(dir.path(), "sleep 30");
    let mut config = fast_config(engine, &cfg_dir);
    config.timeout = Some(Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = run_engine(&config, "[Tester]\n", &SilentObserver).unwrap_err();

    assert!(matches!(err, SuperviseError::Timeout { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "bounded wait did not bound the run"
    );
    assert_config_dir_empty(&cfg_dir);
}
