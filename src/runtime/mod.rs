//! Cross-process runtime records.
//!
//! Two plain-text files in a well-known directory make the controller
//! observable from unrelated processes:
//!
//! | File                          | Contents            | Writer            |
//! |-------------------------------|---------------------|-------------------|
//! | `fermentation_pump.lock`      | owner PID (decimal) | [`SingletonGuard`]|
//! | `fermentation_pump.state`     | stage name          | [`StatePublisher`]|
//!
//! Both are removed together when the owner releases the guard, or by any
//! inspector that finds the owner gone.

pub mod singleton;
pub mod status;

use std::path::{Path, PathBuf};

pub use singleton::{LockStatus, SingletonGuard};
pub use status::{Stage, StatePublisher};

const LOCK_FILE: &str = "fermentation_pump.lock";
const STATE_FILE: &str = "fermentation_pump.state";
/// Where the records live unless overridden.
pub const DEFAULT_RUNTIME_DIR: &str = "/tmp";

/// Locations of the lock and status files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub lock: PathBuf,
    pub state: PathBuf,
}

impl RuntimePaths {
    /// Both files inside `dir`, under their standard names.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            lock: dir.join(LOCK_FILE),
            state: dir.join(STATE_FILE),
        }
    }
}

impl Default for RuntimePaths {
    fn default() -> Self {
        Self::in_dir(Path::new(DEFAULT_RUNTIME_DIR))
    }
}
