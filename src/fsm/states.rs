//! Concrete state handler functions and table builder.
//!
//! Each state is a row of plain `fn` pointers; no closures and no dynamic
//! dispatch.
//!
//! ```text
//!  INITIALIZING ──▶ READY ──▶ CYCLE_STARTING ──[low / critical]──▶ SKIPPED_UNSAFE
//!                                  │      └──[read failed]──▶ ABORTED_ERROR
//!                              [safe/high]
//!                                  ▼
//!                               RUNNING ──▶ MONITORING ⟲
//!                                  │            │
//!                                  │     [elapsed >= run_time]
//!                                  │            ▼
//!                                  │        FINISHING ──▶ COMPLETED
//!                                  │
//!  RUNNING / MONITORING ──[temp > max]──▶ ABORTED_CRITICAL
//!  CYCLE_STARTING / RUNNING / MONITORING ──[fault]──▶ ABORTED_ERROR
//! ```

use super::context::{CycleContext, Reading};
use super::{StateDescriptor, StateId};
use crate::safety::{Verdict, evaluate};
use log::{error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per controller.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Initializing,
            name: "Initializing",
            on_enter: Some(all_off),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::Ready,
            name: "Ready",
            on_enter: None,
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::CycleStarting,
            name: "CycleStarting",
            on_enter: Some(cycle_starting_enter),
            on_exit: None,
            on_update: cycle_starting_update,
        },
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: None,
            on_update: running_update,
        },
        StateDescriptor {
            id: StateId::Monitoring,
            name: "Monitoring",
            on_enter: None,
            on_exit: None,
            on_update: monitoring_update,
        },
        StateDescriptor {
            id: StateId::Finishing,
            name: "Finishing",
            on_enter: Some(all_off),
            on_exit: None,
            on_update: finishing_update,
        },
        StateDescriptor {
            id: StateId::Completed,
            name: "Completed",
            on_enter: Some(completed_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::SkippedUnsafe,
            name: "SkippedUnsafe",
            on_enter: Some(skipped_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::AbortedCritical,
            name: "AbortedCritical",
            on_enter: Some(aborted_critical_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::AbortedError,
            name: "AbortedError",
            on_enter: Some(aborted_error_enter),
            on_exit: None,
            on_update: stay,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared handlers
// ═══════════════════════════════════════════════════════════════════════════

fn all_off(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
}

fn stay(_ctx: &mut CycleContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CYCLE_STARTING: pre-cycle temperature gate
// ═══════════════════════════════════════════════════════════════════════════

fn cycle_starting_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
    info!("CYCLE | starting pump cycle");
}

fn cycle_starting_update(ctx: &mut CycleContext) -> Option<StateId> {
    if let Some(fault) = ctx.fault {
        error!("CYCLE | {fault} before start");
        return Some(StateId::AbortedError);
    }

    if !ctx.sensor_present {
        warn!("CYCLE | no temperature sensor, continuing without check");
        return Some(StateId::Running);
    }

    let Reading::Celsius(temp) = ctx.reading else {
        error!("CYCLE | cannot read temperature");
        return Some(StateId::AbortedError);
    };

    info!("CYCLE | initial temperature {temp:.2}\u{00b0}C");
    let env = &ctx.envelope;
    let verdict = evaluate(temp, env);
    if !verdict.permits_start() {
        if verdict == Verdict::Critical {
            error!(
                "SAFETY | temperature too high ({temp:.2}\u{00b0}C > {:.2}\u{00b0}C)",
                env.max_temp
            );
        } else {
            warn!(
                "SAFETY | temperature too low ({temp:.2}\u{00b0}C < {:.2}\u{00b0}C)",
                env.min_temp
            );
        }
        return Some(StateId::SkippedUnsafe);
    }

    if verdict == Verdict::High {
        warn!("SAFETY | high temperature ({temp:.2}\u{00b0}C)");
    }
    ctx.initial_temp = Some(temp);
    Some(StateId::Running)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING / MONITORING: pump energized, periodic checks
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = true;
    info!(
        "CYCLE | pump on for {}s, checking every {}s",
        ctx.envelope.run_time_ms / 1000,
        ctx.envelope.check_interval_ms / 1000
    );
}

fn running_update(ctx: &mut CycleContext) -> Option<StateId> {
    monitor_check(ctx).or(Some(StateId::Monitoring))
}

fn monitoring_update(ctx: &mut CycleContext) -> Option<StateId> {
    monitor_check(ctx)
}

/// One monitoring check.  `None` means keep running.
///
/// The critical-temperature check runs before the run-time comparison so
/// an over-temperature reading on the final tick still aborts.
fn monitor_check(ctx: &mut CycleContext) -> Option<StateId> {
    if let Some(fault) = ctx.fault {
        error!("CYCLE | {fault}, stopping pump");
        return Some(StateId::AbortedError);
    }

    ctx.checks = ctx.checks.saturating_add(1);
    let env = ctx.envelope;

    match ctx.reading {
        Reading::Celsius(temp) => {
            info!(
                "TEMP | {temp:.2}\u{00b0}C | time {}/{}s",
                ctx.elapsed_ms / 1000,
                env.run_time_ms / 1000
            );
            match evaluate(temp, &env) {
                Verdict::Critical => {
                    error!(
                        "SAFETY | CRITICAL TEMPERATURE {temp:.2}\u{00b0}C > {:.2}\u{00b0}C, stopping",
                        env.max_temp
                    );
                    return Some(StateId::AbortedCritical);
                }
                Verdict::High => warn!("SAFETY | high temperature ({temp:.2}\u{00b0}C)"),
                Verdict::Low => warn!(
                    "SAFETY | temperature below minimum during run ({temp:.2}\u{00b0}C), continuing"
                ),
                Verdict::Safe => {}
            }
        }
        Reading::Failed => warn!("TEMP | reading failed, skipping this check"),
        Reading::NotTaken => {}
    }

    info!("CYCLE | progress {:.1}%", ctx.progress_percent());

    if ctx.elapsed_ms >= env.run_time_ms {
        return Some(StateId::Finishing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FINISHING: pump off, final report
// ═══════════════════════════════════════════════════════════════════════════

fn finishing_update(ctx: &mut CycleContext) -> Option<StateId> {
    if let Reading::Celsius(temp) = ctx.reading {
        ctx.final_temp = Some(temp);
        info!("TEMP | final temperature {temp:.2}\u{00b0}C");
        if let Some(initial) = ctx.initial_temp {
            info!("TEMP | change {:+.2}\u{00b0}C", temp - initial);
        }
    }
    Some(StateId::Completed)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Terminal states
// ═══════════════════════════════════════════════════════════════════════════

fn completed_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
    info!("CYCLE | completed successfully");
}

fn skipped_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
    warn!("CYCLE | skipping cycle due to temperature");
}

fn aborted_critical_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
    error!("CYCLE | aborted on critical temperature");
}

fn aborted_error_enter(ctx: &mut CycleContext) {
    ctx.commands.pump_on = false;
    error!("CYCLE | aborted on error");
}
