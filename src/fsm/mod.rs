//! Function-pointer finite state machine engine for one duty cycle.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌─────────────────┬───────────┬──────────┬──────────────────┐│
//! │  │ StateId         │ on_enter  │ on_exit  │ on_update        ││
//! │  ├─────────────────┼───────────┼──────────┼──────────────────┤│
//! │  │ Initializing    │ fn(ctx)   │ -        │ fn(ctx)->Option<>││
//! │  │ Ready           │ -         │ -        │ fn(ctx)->Option<>││
//! │  │ CycleStarting   │ fn(ctx)   │ -        │ fn(ctx)->Option<>││
//! │  │ Running         │ fn(ctx)   │ -        │ fn(ctx)->Option<>││
//! │  │ Monitoring      │ -         │ -        │ fn(ctx)->Option<>││
//! │  │ Finishing       │ fn(ctx)   │ -        │ fn(ctx)->Option<>││
//! │  │ Completed ...   │ fn(ctx)   │ -        │ terminal         ││
//! │  └─────────────────┴───────────┴──────────┴──────────────────┘│
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  Handlers never touch hardware: they read the latest
//! temperature input from [`CycleContext`] and write the desired relay
//! level into `ctx.commands`, which the cycle controller applies.

pub mod context;
pub mod states;

use context::{CycleContext, Outcome};
use log::info;

use crate::runtime::status::Stage;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all cycle states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Initializing = 0,
    Ready = 1,
    CycleStarting = 2,
    Running = 3,
    Monitoring = 4,
    Finishing = 5,
    Completed = 6,
    SkippedUnsafe = 7,
    AbortedCritical = 8,
    AbortedError = 9,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 10;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `AbortedError` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Initializing,
            1 => Self::Ready,
            2 => Self::CycleStarting,
            3 => Self::Running,
            4 => Self::Monitoring,
            5 => Self::Finishing,
            6 => Self::Completed,
            7 => Self::SkippedUnsafe,
            8 => Self::AbortedCritical,
            9 => Self::AbortedError,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::AbortedError
            }
        }
    }

    /// Stage published to the status file when this state is entered.
    pub fn stage(self) -> Stage {
        match self {
            Self::Initializing => Stage::Initializing,
            Self::Ready => Stage::Ready,
            Self::CycleStarting => Stage::CycleStarting,
            Self::Running => Stage::PumpOn,
            Self::Monitoring => Stage::Monitoring,
            Self::Finishing | Self::AbortedCritical | Self::AbortedError => Stage::PumpOff,
            Self::Completed | Self::SkippedUnsafe => Stage::Completed,
        }
    }

    /// Cycle outcome for terminal states, `None` otherwise.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Completed => Some(Outcome::Success),
            Self::SkippedUnsafe => Some(Outcome::SkippedUnsafe),
            Self::AbortedCritical => Some(Outcome::AbortedCritical),
            Self::AbortedError => Some(Outcome::AbortedError),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.outcome().is_some()
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut CycleContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut CycleContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single cycle state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]); the
/// [`CycleContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut CycleContext) {
        info!("FSM | starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut CycleContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by the controller to start a
    /// cycle and to abort on faults regardless of what `on_update` returned).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut CycleContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut CycleContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM | {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
