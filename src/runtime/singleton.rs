//! Process singleton guard.
//!
//! Mutual exclusion between controller processes rests on a lock file
//! holding the owner's PID, linked into place only if no lock exists
//! yet.  A record left behind by a crashed owner is detected through the
//! [`ProcessProbe`] port: a PID that no longer exists, text that is not a
//! PID, or a live process that is not a controller all count as stale.
//!
//! Between reading a stale record and removing it another process may
//! win the same race; the second link then fails and that
//! process's record is resolved like any other.  The window is narrow
//! and is not closed further.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};

use super::RuntimePaths;
use crate::app::ports::{Liveness, ProcessProbe};
use crate::error::LockError;

/// World-readable so `status` works for any user.
const RECORD_MODE: u32 = 0o644;

/// Result of a read-only lock inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// No valid owner.
    Idle,
    /// A live controller process holds the lock.
    OwnedBy(u32),
}

/// What a lock record on disk resolves to.
enum Owner {
    Valid(u32),
    Stale(String),
    /// The file disappeared while we were looking at it.
    Vanished,
}

/// Ownership of the lock and status files for this process.
///
/// Shared between the controller (through the state publisher) and the
/// shutdown handler.  [`release`](Self::release) is idempotent, and once
/// it has run [`while_held`](Self::while_held) refuses further work.
#[derive(Debug)]
pub struct SingletonGuard {
    paths: RuntimePaths,
    pid: u32,
    held: Mutex<bool>,
}

impl SingletonGuard {
    /// Take the lock for the current process.
    pub fn acquire(paths: RuntimePaths, probe: &impl ProcessProbe) -> Result<Self, LockError> {
        Self::acquire_as(paths, std::process::id(), probe)
    }

    /// Take the lock on behalf of `pid`.
    pub fn acquire_as(
        paths: RuntimePaths,
        pid: u32,
        probe: &impl ProcessProbe,
    ) -> Result<Self, LockError> {
        for attempt in 0..2 {
            match create_record(&paths, pid) {
                Ok(()) => {
                    info!("LOCK | acquired {} (pid {pid})", paths.lock.display());
                    return Ok(Self {
                        paths,
                        pid,
                        held: Mutex::new(true),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LockError::Io(e.kind())),
            }

            match resolve(&paths, probe, pid)? {
                Owner::Valid(owner) => return Err(LockError::AlreadyRunning { pid: owner }),
                Owner::Stale(why) if attempt == 0 => {
                    warn!("LOCK | removing stale lock ({why})");
                    clear_records(&paths);
                }
                Owner::Stale(_) => break,
                Owner::Vanished => {}
            }
        }
        Err(LockError::Io(io::ErrorKind::AlreadyExists))
    }

    /// Read-only query usable by any process.  Clears stale records but
    /// never creates one.
    pub fn inspect(paths: &RuntimePaths, probe: &impl ProcessProbe) -> LockStatus {
        match resolve(paths, probe, 0) {
            Ok(Owner::Valid(pid)) => LockStatus::OwnedBy(pid),
            Ok(Owner::Stale(why)) => {
                debug!("LOCK | clearing stale lock ({why})");
                clear_records(paths);
                LockStatus::Idle
            }
            Ok(Owner::Vanished) => LockStatus::Idle,
            Err(e) => {
                warn!("LOCK | cannot inspect {}: {e}", paths.lock.display());
                LockStatus::Idle
            }
        }
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` only while the lock is still held; `None` after release.
    ///
    /// Holds the internal mutex for the duration of `f`, so a concurrent
    /// [`release`](Self::release) waits until `f` has finished.
    pub fn while_held<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held { Some(f()) } else { None }
    }

    /// Remove the lock and status files.  Idempotent; errors are logged.
    pub fn release(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !*held {
            return;
        }
        *held = false;

        match read_pid(&self.paths) {
            Ok(Some(owner)) if owner != self.pid => {
                warn!("LOCK | lock now names pid {owner}, leaving it in place");
                return;
            }
            _ => {}
        }
        clear_records(&self.paths);
        info!("LOCK | released");
    }
}

impl Drop for SingletonGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Publish a lock naming `pid`.  The record is written and synced under a
/// temporary name in the same directory and then linked into place
/// without replacing anything, so no reader ever sees a partial record.
fn create_record(paths: &RuntimePaths, pid: u32) -> io::Result<()> {
    let dir = paths
        .lock
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".pumpctl-lock.")
        .tempfile_in(dir)?;
    write!(temp, "{pid}")?;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(RECORD_MODE))?;
    temp.as_file().sync_all()?;

    match temp.persist_noclobber(&paths.lock) {
        Ok(_) => Ok(()),
        Err(tempfile::PersistError { error, file }) => {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!("LOCK | could not remove {}: {e}", path.display());
            }
            Err(error)
        }
    }
}

/// `Ok(None)` when the file exists but does not hold a PID.
fn read_pid(paths: &RuntimePaths) -> io::Result<Option<u32>> {
    let text = fs::read_to_string(&paths.lock)?;
    Ok(text.trim().parse::<u32>().ok().filter(|&pid| pid != 0))
}

/// Classify the record on disk.  `self_pid` is never a valid owner: a
/// record naming the caller can only be a leftover from a previous
/// process that had the same PID.
fn resolve(
    paths: &RuntimePaths,
    probe: &impl ProcessProbe,
    self_pid: u32,
) -> Result<Owner, LockError> {
    let pid = match read_pid(paths) {
        Ok(Some(pid)) => pid,
        Ok(None) => return Ok(Owner::Stale("unparseable contents".to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Owner::Vanished),
        Err(e) => return Err(LockError::Io(e.kind())),
    };

    if pid == self_pid {
        return Ok(Owner::Stale(format!("pid {pid} is this process")));
    }
    Ok(match probe.probe(pid) {
        Liveness::Controller => Owner::Valid(pid),
        Liveness::Gone => Owner::Stale(format!("pid {pid} is not running")),
        Liveness::Foreign => Owner::Stale(format!("pid {pid} is not a pump controller")),
    })
}

fn clear_records(paths: &RuntimePaths) {
    for path in [&paths.lock, &paths.state] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("LOCK | could not remove {}: {e}", path.display()),
        }
    }
}
