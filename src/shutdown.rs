//! Emergency shutdown path.
//!
//! Every way out of the process (cycle finished, SIGTERM/SIGINT, panic,
//! startup failure after the lock was taken) converges on
//! [`ShutdownHandler::trigger`].  The first caller latches the relay off,
//! hands the GPIO line back, and removes the lock and status files.  Any
//! later caller, including one racing the first from another thread,
//! waits for that cleanup to finish and then returns without doing
//! anything.
//!
//! ```text
//!  signal thread ─┐
//!  main (finish) ─┼──▶ ShutdownHandler::trigger ──▶ ActuatorLine (latch, off, release)
//!  main (panic)  ─┘                             └─▶ SingletonGuard::release
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::{ActuatorPort, Sleeper, Wake};
use crate::error::ActuatorError;
use crate::runtime::SingletonGuard;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// ActuatorLine
// ───────────────────────────────────────────────────────────────

struct LineState {
    port: Option<Box<dyn ActuatorPort + Send>>,
    latched: bool,
}

/// The relay, shared between the controller and the shutdown handler.
///
/// Every command goes through one mutex, so an energize can never land
/// after shutdown has forced the line off: once latched, `energize`
/// fails with [`ActuatorError::Latched`].
pub struct ActuatorLine {
    inner: Mutex<LineState>,
}

impl ActuatorLine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LineState {
                port: None,
                latched: false,
            }),
        }
    }

    /// Hand the opened relay to the line.  If shutdown already ran, the
    /// relay is driven off and released on the spot.
    pub fn install(&self, mut port: Box<dyn ActuatorPort + Send>) -> Result<(), ActuatorError> {
        let mut line = lock(&self.inner);
        if line.latched {
            release_port(port.as_mut());
            return Err(ActuatorError::Latched);
        }
        line.port = Some(port);
        Ok(())
    }

    pub fn energize(&self) -> Result<(), ActuatorError> {
        let mut line = lock(&self.inner);
        if line.latched {
            return Err(ActuatorError::Latched);
        }
        line.port
            .as_mut()
            .ok_or(ActuatorError::NotInstalled)?
            .energize()
    }

    /// Drive the relay off.  Nothing installed (or already released) is
    /// already off.
    pub fn de_energize(&self) -> Result<(), ActuatorError> {
        match lock(&self.inner).port.as_mut() {
            Some(port) => port.de_energize(),
            None => Ok(()),
        }
    }

    pub fn is_energized(&self) -> bool {
        lock(&self.inner)
            .port
            .as_ref()
            .is_some_and(|port| port.is_energized())
    }

    /// Latch the line off for good: de-energize and release the relay,
    /// logging (never propagating) failures.
    pub fn force_off_and_release(&self) {
        let mut line = lock(&self.inner);
        line.latched = true;
        if let Some(mut port) = line.port.take() {
            release_port(port.as_mut());
        }
    }
}

impl Default for ActuatorLine {
    fn default() -> Self {
        Self::new()
    }
}

fn release_port(port: &mut (dyn ActuatorPort + Send)) {
    if let Err(e) = port.de_energize() {
        error!("SHUTDOWN | could not turn pump off: {e}");
    }
    if let Err(e) = port.release() {
        warn!("SHUTDOWN | could not release relay line: {e}");
    }
}

// ───────────────────────────────────────────────────────────────
// ShutdownHandler
// ───────────────────────────────────────────────────────────────

/// Why shutdown ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The cycle reached a terminal state.
    CycleFinished,
    /// A termination signal arrived.
    Signal(&'static str),
    /// The controller thread panicked.
    Panic,
    /// Initialisation failed after the lock was taken.
    StartupFailed,
}

impl core::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CycleFinished => write!(f, "cycle finished"),
            Self::Signal(name) => write!(f, "received {name}"),
            Self::Panic => write!(f, "panic"),
            Self::StartupFailed => write!(f, "startup failed"),
        }
    }
}

#[derive(Default)]
struct Progress {
    requested: bool,
    done: bool,
}

pub struct ShutdownHandler {
    line: Arc<ActuatorLine>,
    guard: Arc<SingletonGuard>,
    progress: Mutex<Progress>,
    wake: Condvar,
}

impl ShutdownHandler {
    pub fn new(line: Arc<ActuatorLine>, guard: Arc<SingletonGuard>) -> Self {
        Self {
            line,
            guard,
            progress: Mutex::new(Progress::default()),
            wake: Condvar::new(),
        }
    }

    pub fn line(&self) -> &Arc<ActuatorLine> {
        &self.line
    }

    /// Run the cleanup once.  Returns `true` for the call that did the
    /// work.
    ///
    /// The internal mutex is held across the whole cleanup, so a
    /// concurrent trigger blocks until the first one has finished.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let mut progress = lock(&self.progress);
        if progress.done {
            debug!("SHUTDOWN | already handled, ignoring {reason}");
            return false;
        }
        progress.requested = true;
        self.wake.notify_all();

        info!("SHUTDOWN | {reason}: stopping pump");
        self.line.force_off_and_release();
        self.guard.release();

        progress.done = true;
        info!("SHUTDOWN | cleanup complete");
        true
    }

    pub fn is_done(&self) -> bool {
        lock(&self.progress).done
    }
}

impl Sleeper for ShutdownHandler {
    /// Wait out one monitoring interval unless shutdown is requested first.
    fn sleep(&self, ms: u64) -> Wake {
        let progress = lock(&self.progress);
        let (progress, _) = self
            .wake
            .wait_timeout_while(progress, Duration::from_millis(ms), |p| !p.requested)
            .unwrap_or_else(PoisonError::into_inner);
        if progress.requested {
            Wake::Interrupted
        } else {
            Wake::Elapsed
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// Log panics through `log` before the default hook prints them.
///
/// The hook runs on the panicking thread while it may still hold the
/// actuator mutex, so it only records the panic.  Cleanup happens once
/// the unwind has been caught (see `main`).
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        match info.location() {
            Some(loc) => error!("PANIC | {reason} at {}:{}", loc.file(), loc.line()),
            None => error!("PANIC | {reason}"),
        }
        default_hook(info);
    }));
}
