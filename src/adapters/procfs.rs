//! Process-table probe backed by `kill(pid, 0)` and `/proc`.
//!
//! Existence comes from the signal-0 probe: `ESRCH` means gone, success
//! or `EPERM` means some process holds the PID.  Identity then comes from
//! `/proc/<pid>/exe`: the process is a controller only if it runs the same
//! binary as this one, whatever name it was launched under.  When the exe
//! link cannot be resolved (another user's process) `argv[0]` from
//! `/proc/<pid>/cmdline` is used instead.  When neither can be read the
//! owner is assumed valid, so an unverifiable lock is never reclaimed.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

use crate::app::ports::{Liveness, ProcessProbe};

const PROC_ROOT: &str = "/proc";
const DEFAULT_PROGRAM: &str = "pumpctl";
/// Appended by the kernel to the exe link once the binary was replaced.
const DELETED_SUFFIX: &[u8] = b" (deleted)";

pub struct ProcfsProbe {
    exe: PathBuf,
    proc_root: PathBuf,
}

impl ProcfsProbe {
    /// Probe that recognises processes running the binary at `exe`.
    /// Symlinks in `exe` are resolved first.
    pub fn for_exe(exe: impl AsRef<Path>) -> Self {
        let exe = strip_deleted(exe.as_ref());
        let exe = fs::canonicalize(&exe).unwrap_or(exe);
        Self {
            exe,
            proc_root: PathBuf::from(PROC_ROOT),
        }
    }

    /// Probe that recognises processes running the current executable.
    pub fn for_current_exe() -> Self {
        match std::env::current_exe() {
            Ok(exe) => Self::for_exe(exe),
            Err(e) => {
                warn!("LOCK | cannot resolve own executable ({e}), matching by name");
                Self::for_exe(DEFAULT_PROGRAM)
            }
        }
    }

    pub fn with_proc_root(mut self, root: &Path) -> Self {
        self.proc_root = root.to_path_buf();
        self
    }

    fn identify(&self, pid: u32) -> Liveness {
        let dir = self.proc_root.join(pid.to_string());
        match fs::read_link(dir.join("exe")) {
            Ok(target) if strip_deleted(&target) == self.exe => return Liveness::Controller,
            Ok(_) => return Liveness::Foreign,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Liveness::Gone,
            Err(e) => debug!("LOCK | exe of pid {pid} unreadable ({e}), checking cmdline"),
        }

        match fs::read(dir.join("cmdline")) {
            Ok(raw) if argv0_is(&raw, &self.exe) => Liveness::Controller,
            Ok(_) => Liveness::Foreign,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Liveness::Gone,
            Err(e) => {
                warn!("LOCK | cannot verify pid {pid} ({e}), assuming it is a controller");
                Liveness::Controller
            }
        }
    }
}

impl ProcessProbe for ProcfsProbe {
    fn probe(&self, pid: u32) -> Liveness {
        let Ok(raw) = i32::try_from(pid) else {
            return Liveness::Gone;
        };
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Liveness::Gone,
            Err(Errno::EPERM) => debug!("LOCK | pid {pid} exists but is not ours to signal"),
            Err(e) => debug!("LOCK | signal probe of pid {pid} failed: {e}"),
        }
        self.identify(pid)
    }
}

fn strip_deleted(path: &Path) -> PathBuf {
    let bytes = path.as_os_str().as_bytes();
    let kept = bytes.strip_suffix(DELETED_SUFFIX).unwrap_or(bytes);
    PathBuf::from(OsStr::from_bytes(kept))
}

/// Whether the first entry of a NUL-separated command line launched `exe`.
///
/// An absolute `argv[0]` is resolved through its symlinks and compared in
/// full.  A bare or relative one can only be matched by file name.
fn argv0_is(raw: &[u8], exe: &Path) -> bool {
    let Some(argv0) = raw.split(|&b| b == 0).next().filter(|a| !a.is_empty()) else {
        return false;
    };
    let argv0 = Path::new(OsStr::from_bytes(argv0));
    let resolved = argv0
        .is_absolute()
        .then(|| fs::canonicalize(argv0))
        .and_then(Result::ok);
    match resolved {
        Some(resolved) => resolved.as_path() == exe,
        None => argv0.file_name().is_some() && argv0.file_name() == exe.file_name(),
    }
}
