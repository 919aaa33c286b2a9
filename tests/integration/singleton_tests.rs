//! Single-instance lock and status file, including the real `/proc` probe.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::Arc;

use crate::mock_hw::MapProbe;

use pumpctl::adapters::procfs::ProcfsProbe;
use pumpctl::app::ports::{Liveness, ProcessProbe};
use pumpctl::error::LockError;
use pumpctl::runtime::{LockStatus, RuntimePaths, SingletonGuard, Stage, StatePublisher, status};

fn probe_of(pid: u32, liveness: Liveness) -> MapProbe {
    MapProbe(HashMap::from([(pid, liveness)]))
}

/// The real `sleep` binary, with symlinks resolved.
fn sleep_binary() -> PathBuf {
    ["/bin/sleep", "/usr/bin/sleep"]
        .into_iter()
        .find_map(|p| fs::canonicalize(p).ok())
        .expect("no sleep binary on this host")
}

/// A live process that is not a controller.
fn bystander() -> Child {
    Command::new(sleep_binary()).arg("30").spawn().unwrap()
}

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

// ── Acquire ──────────────────────────────────────────────────

#[test]
fn second_controller_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let probe = probe_of(4242, Liveness::Controller);

    let _first = SingletonGuard::acquire_as(paths.clone(), 4242, &probe).unwrap();
    let second = SingletonGuard::acquire_as(paths.clone(), 5151, &probe);

    assert_eq!(second.unwrap_err(), LockError::AlreadyRunning { pid: 4242 });
    assert_eq!(fs::read_to_string(&paths.lock).unwrap(), "4242");
}

#[test]
fn lock_of_a_dead_process_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    fs::write(&paths.lock, "4242").unwrap();
    fs::write(&paths.state, "monitoring").unwrap();

    let guard = SingletonGuard::acquire_as(paths.clone(), 5151, &MapProbe::default()).unwrap();
    assert_eq!(guard.pid(), 5151);
    assert_eq!(fs::read_to_string(&paths.lock).unwrap(), "5151");
    assert!(!paths.state.exists(), "stale status must be cleared");
}

#[test]
fn live_controller_seen_through_proc_blocks_acquire() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let child = bystander();
    fs::write(&paths.lock, child.id().to_string()).unwrap();

    let result = SingletonGuard::acquire(paths.clone(), &ProcfsProbe::for_exe(sleep_binary()));
    let owner = child.id();
    stop(child);

    assert_eq!(result.unwrap_err(), LockError::AlreadyRunning { pid: owner });
}

#[test]
fn controller_launched_through_a_renamed_symlink_keeps_its_lock() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let alias = dir.path().join("fermentation-pump");
    symlink(sleep_binary(), &alias).unwrap();

    let child = Command::new(&alias).arg("30").spawn().unwrap();
    let owner = child.id();
    fs::write(&paths.lock, owner.to_string()).unwrap();

    let probe = ProcfsProbe::for_exe(sleep_binary());
    let seen = probe.probe(owner);
    let second = SingletonGuard::acquire(paths.clone(), &probe);
    stop(child);

    assert_eq!(seen, Liveness::Controller);
    assert_eq!(second.unwrap_err(), LockError::AlreadyRunning { pid: owner });
    assert_eq!(fs::read_to_string(&paths.lock).unwrap(), owner.to_string());
}

#[test]
fn recycled_pid_of_another_program_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let child = bystander();
    fs::write(&paths.lock, child.id().to_string()).unwrap();

    let result = SingletonGuard::acquire(paths.clone(), &ProcfsProbe::for_current_exe());
    stop(child);

    let guard = result.unwrap();
    assert_eq!(guard.pid(), std::process::id());
}

#[test]
fn exited_process_is_stale_through_proc() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    fs::write(&paths.lock, pid.to_string()).unwrap();

    assert_eq!(
        SingletonGuard::inspect(&paths, &ProcfsProbe::for_current_exe()),
        LockStatus::Idle
    );
    assert!(!paths.lock.exists());
}

// ── Release ──────────────────────────────────────────────────

#[test]
fn dropping_the_guard_removes_both_records() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    {
        let guard = Arc::new(
            SingletonGuard::acquire_as(paths.clone(), 4242, &MapProbe::default()).unwrap(),
        );
        StatePublisher::new(Arc::clone(&guard)).publish(Stage::Ready);
        assert!(paths.lock.exists());
        assert!(paths.state.exists());
    }
    assert!(!paths.lock.exists());
    assert!(!paths.state.exists());
}

#[test]
fn publisher_is_inert_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let guard =
        Arc::new(SingletonGuard::acquire_as(paths.clone(), 4242, &MapProbe::default()).unwrap());
    let publisher = StatePublisher::new(Arc::clone(&guard));

    guard.release();
    guard.release();
    publisher.publish(Stage::PumpOff);

    assert!(!paths.state.exists());
    assert!(!paths.lock.exists());
}

// ── Status ───────────────────────────────────────────────────

#[test]
fn status_reports_the_owners_stage() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    let probe = probe_of(4242, Liveness::Controller);
    let guard =
        Arc::new(SingletonGuard::acquire_as(paths.clone(), 4242, &MapProbe::default()).unwrap());

    assert_eq!(status::read(&paths, &probe), Stage::Initializing);

    StatePublisher::new(Arc::clone(&guard)).publish(Stage::PumpOn);
    assert_eq!(status::read(&paths, &probe), Stage::PumpOn);
    assert_eq!(
        SingletonGuard::inspect(&paths, &probe),
        LockStatus::OwnedBy(4242)
    );
}

#[test]
fn status_of_a_crashed_controller_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    fs::write(&paths.lock, "4242").unwrap();
    fs::write(&paths.state, "pump_on").unwrap();

    assert_eq!(status::read(&paths, &MapProbe::default()), Stage::Idle);
    assert!(!paths.lock.exists());
    assert!(!paths.state.exists());
}

#[test]
fn status_without_any_records_is_idle() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::in_dir(dir.path());
    assert_eq!(status::read(&paths, &MapProbe::default()), Stage::Idle);
}
