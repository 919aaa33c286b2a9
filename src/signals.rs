//! Termination signal routing.
//!
//! SIGTERM and SIGINT are blocked in the main thread before any other
//! thread exists, so every thread inherits the mask and no asynchronous
//! handler ever runs.  A dedicated thread collects the signal with
//! `sigwait`, runs the shutdown handler, and exits the process with
//! status 1.

use std::io;
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, warn};
use nix::sys::signal::{SigSet, Signal};

use crate::shutdown::{ShutdownHandler, ShutdownReason};

/// Exit status after a signal-triggered shutdown.
pub const SIGNAL_EXIT_CODE: i32 = 1;

/// Termination signals handled by the controller.
pub fn termination_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGINT);
    set
}

/// Block the termination signals for the calling thread and every thread
/// it spawns afterwards.  Call first thing in `main`.
pub fn block_termination_signals() -> nix::Result<()> {
    termination_set().thread_block()
}

/// Start the thread that turns a termination signal into a shutdown.
pub fn spawn_watcher(handler: Arc<ShutdownHandler>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("signal-watch".to_string())
        .spawn(move || match termination_set().wait() {
            Ok(signal) => {
                warn!("SIGNAL | {} received, shutting down", signal.as_str());
                handler.trigger(ShutdownReason::Signal(signal.as_str()));
                process::exit(SIGNAL_EXIT_CODE);
            }
            Err(e) => error!("SIGNAL | sigwait failed: {e}"),
        })
}
