//! Cycle controller: the hexagonal core.
//!
//! [`CycleController`] owns the FSM and its context and drives one duty
//! cycle end to end.  All I/O flows through port traits and the shared
//! [`ActuatorLine`], making the whole cycle testable with mock adapters.
//!
//! ```text
//!  TemperaturePort ──▶ ┌──────────────────────┐ ──▶ EventSink
//!                      │   CycleController    │ ──▶ StatePublisher
//!     ActuatorLine  ◀──│   FSM · Safety       │
//!          Sleeper  ◀──└──────────────────────┘
//! ```
//!
//! Each step is: update inputs → FSM tick → apply relay command → report
//! the transition.  A failed relay command aborts the cycle on the spot.

use std::sync::Arc;

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, SensorError};
use crate::fsm::context::{ActuatorCommands, CycleContext, Fault, Outcome, Reading};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::runtime::{Stage, StatePublisher};
use crate::shutdown::ActuatorLine;

use super::events::{AppEvent, CycleReport, TelemetryData};
use super::ports::{ActuatorPort, EventSink, Platform, Sleeper, TemperaturePort, Wake};

// ───────────────────────────────────────────────────────────────
// CycleController
// ───────────────────────────────────────────────────────────────

pub struct CycleController<T, S, E> {
    fsm: Fsm,
    ctx: CycleContext,
    line: Arc<ActuatorLine>,
    sensor: Option<T>,
    sleeper: S,
    sink: E,
    publisher: StatePublisher,
    last_stage: Option<Stage>,
}

impl<T, S, E> CycleController<T, S, E>
where
    T: TemperaturePort,
    S: Sleeper,
    E: EventSink,
{
    /// Open the hardware and bring the controller to `Ready`.
    ///
    /// The relay is driven off before it is installed on `line`.  A
    /// missing sensor is not an error: the cycle then runs for the full
    /// run time without temperature checks.
    pub fn new<P>(
        config: &SystemConfig,
        platform: &mut P,
        line: Arc<ActuatorLine>,
        publisher: StatePublisher,
        sleeper: S,
        sink: E,
    ) -> Result<Self, Error>
    where
        P: Platform<Sensor = T>,
    {
        let mut ctx = CycleContext::new(config.envelope(), false);
        let mut fsm = Fsm::new(build_state_table(), StateId::Initializing);
        fsm.start(&mut ctx);

        let mut this = Self {
            fsm,
            ctx,
            line,
            sensor: None,
            sleeper,
            sink,
            publisher,
            last_stage: None,
        };
        this.publish(Stage::Initializing);

        let mut relay = platform.open_actuator(&config.pump)?;
        if let Err(e) = relay.de_energize() {
            if let Err(release) = relay.release() {
                warn!("PUMP | could not release relay after failed init: {release}");
            }
            return Err(e.into());
        }
        this.line.install(Box::new(relay))?;
        info!("PUMP | relay on GPIO {} initialised off", config.pump.gpio_pin);

        match platform.open_sensor(&config.temperature) {
            Ok(sensor) => {
                info!("TEMP | sensor ready");
                this.sensor = Some(sensor);
            }
            Err(e) => {
                warn!("TEMP | sensor unavailable ({e}), running without temperature checks");
                this.sink.emit(&AppEvent::SensorUnavailable(e));
            }
        }
        this.ctx.sensor_present = this.sensor.is_some();

        this.enter(StateId::Ready);
        this.sink.emit(&AppEvent::Started(this.fsm.current_state()));
        Ok(this)
    }

    /// Run one duty cycle to a terminal state.
    pub fn run_cycle(&mut self) -> CycleReport {
        if self.fsm.current_state() != StateId::Ready {
            warn!("CYCLE | not ready (in {:?}), refusing to start", self.fsm.current_state());
            return self.report();
        }

        self.enter(StateId::CycleStarting);
        if self.sensor.is_some() {
            self.ctx.reading = match self.read_sensor() {
                Ok(reading) => reading,
                Err(e) => {
                    self.raise(Fault::Sensor(e));
                    Reading::Failed
                }
            };
        }

        loop {
            self.step();
            match self.fsm.current_state() {
                StateId::Running | StateId::Monitoring => self.wait_and_sample(),
                StateId::Finishing => self.final_sample(),
                state if state.is_terminal() => break,
                _ => {}
            }
        }

        let report = self.report();
        self.sink.emit(&AppEvent::Finished(report));
        report
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn sensor_present(&self) -> bool {
        self.ctx.sensor_present
    }

    pub fn report(&self) -> CycleReport {
        CycleReport {
            outcome: self
                .fsm
                .current_state()
                .outcome()
                .unwrap_or(Outcome::AbortedError),
            initial_temp: self.ctx.initial_temp,
            final_temp: self.ctx.final_temp,
            elapsed_ms: self.ctx.elapsed_ms,
            checks: self.ctx.checks,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Sleep one monitoring interval, then refresh the inputs for the
    /// next tick.
    fn wait_and_sample(&mut self) {
        let interval = self.ctx.next_sleep_ms();
        if self.sleeper.sleep(interval) == Wake::Interrupted {
            warn!("CYCLE | shutdown requested during monitoring");
            self.raise(Fault::Interrupted);
            return;
        }
        self.ctx.elapsed_ms = self.ctx.elapsed_ms.saturating_add(interval);
        self.publish(Stage::Monitoring);

        self.ctx.reading = match self.read_sensor() {
            Ok(reading) => reading,
            Err(e) => {
                self.raise(Fault::Sensor(e));
                Reading::Failed
            }
        };

        self.sink.emit(&AppEvent::Telemetry(TelemetryData {
            state: self.fsm.current_state(),
            temperature_c: match self.ctx.reading {
                Reading::Celsius(t) => Some(t),
                _ => None,
            },
            elapsed_ms: self.ctx.elapsed_ms,
            run_time_ms: self.ctx.envelope.run_time_ms,
            pump_on: self.line.is_energized(),
        }));
    }

    /// Final reading for the report.  The pump is already off, so a
    /// sensor error here is logged rather than treated as a fault.
    fn final_sample(&mut self) {
        self.ctx.reading = match self.read_sensor() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("TEMP | final reading failed: {e}");
                Reading::Failed
            }
        };
    }

    fn read_sensor(&mut self) -> Result<Reading, SensorError> {
        let Some(sensor) = self.sensor.as_mut() else {
            return Ok(Reading::NotTaken);
        };
        Ok(match sensor.read_celsius()? {
            Some(t) => Reading::Celsius(t),
            None => Reading::Failed,
        })
    }

    fn raise(&mut self, fault: Fault) {
        self.ctx.fault = Some(fault);
        self.sink.emit(&AppEvent::FaultDetected(fault));
    }

    /// One FSM tick followed by actuation and reporting.
    fn step(&mut self) {
        let from = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        self.settle(from);
    }

    /// Controller-driven transition (startup, cycle start).
    fn enter(&mut self, next: StateId) {
        let from = self.fsm.current_state();
        self.fsm.force_transition(next, &mut self.ctx);
        self.settle(from);
    }

    fn settle(&mut self, from: StateId) {
        self.apply_actuators();
        let to = self.fsm.current_state();
        if to != from {
            self.sink.emit(&AppEvent::StateChanged { from, to });
            self.publish(to.stage());
        }
    }

    /// Translate the FSM's relay command into a line write.
    ///
    /// A failed write aborts the cycle: the FSM is forced to
    /// `AbortedError` and the line is driven off on a best-effort basis.
    fn apply_actuators(&mut self) {
        let want_on = self.ctx.commands.pump_on;
        if want_on == self.line.is_energized() {
            return;
        }
        let result = if want_on {
            self.line.energize()
        } else {
            self.line.de_energize()
        };

        match result {
            Ok(()) if want_on => info!("PUMP | on"),
            Ok(()) => info!("PUMP | off"),
            Err(e) => {
                error!("PUMP | command failed: {e}");
                self.ctx.commands = ActuatorCommands::all_off();
                self.raise(Fault::Actuator(e));
                if self.fsm.current_state() != StateId::AbortedError {
                    self.fsm.force_transition(StateId::AbortedError, &mut self.ctx);
                }
                if let Err(e) = self.line.de_energize() {
                    error!("PUMP | could not force relay off: {e}");
                }
            }
        }
    }

    fn publish(&mut self, stage: Stage) {
        if self.last_stage == Some(stage) {
            return;
        }
        self.last_stage = Some(stage);
        self.publisher.publish(stage);
    }
}
