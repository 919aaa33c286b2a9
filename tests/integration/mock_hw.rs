//! Mock hardware adapters for integration tests.
//!
//! Records every relay call so tests can assert on the full command
//! history without touching real GPIO, and replays scripted temperature
//! readings instead of the 1-Wire bus.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pumpctl::app::events::AppEvent;
use pumpctl::app::ports::{
    ActuatorPort, EventSink, Liveness, Platform, ProcessProbe, Sleeper, TemperaturePort, Wake,
};
use pumpctl::config::{PumpConfig, SystemConfig, TemperatureConfig};
use pumpctl::error::{ActuatorError, SensorError};
use pumpctl::runtime::{RuntimePaths, SingletonGuard, StatePublisher};
use pumpctl::shutdown::ActuatorLine;

// ── Relay ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Energize,
    DeEnergize,
    Release,
}

#[derive(Clone, Default)]
pub struct RelayLog(Arc<Mutex<Vec<ActuatorCall>>>);

#[allow(dead_code)]
impl RelayLog {
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, call: ActuatorCall) {
        self.0.lock().unwrap().push(call);
    }

    /// Relay level implied by the call history.
    pub fn energized(&self) -> bool {
        self.calls()
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Energize => Some(true),
                ActuatorCall::DeEnergize => Some(false),
                ActuatorCall::Release => None,
            })
            .unwrap_or(false)
    }

    pub fn ever_energized(&self) -> bool {
        self.calls().contains(&ActuatorCall::Energize)
    }

    pub fn released(&self) -> bool {
        self.calls().contains(&ActuatorCall::Release)
    }
}

pub struct MockRelay {
    log: RelayLog,
    energized: bool,
    fail_energize: bool,
    fail_off: bool,
}

impl ActuatorPort for MockRelay {
    fn energize(&mut self) -> Result<(), ActuatorError> {
        if self.fail_energize {
            return Err(ActuatorError::GpioWriteFailed(io::ErrorKind::PermissionDenied));
        }
        self.log.push(ActuatorCall::Energize);
        self.energized = true;
        Ok(())
    }

    fn de_energize(&mut self) -> Result<(), ActuatorError> {
        if self.fail_off {
            return Err(ActuatorError::GpioWriteFailed(io::ErrorKind::PermissionDenied));
        }
        self.log.push(ActuatorCall::DeEnergize);
        self.energized = false;
        Ok(())
    }

    fn is_energized(&self) -> bool {
        self.energized
    }

    /// Recorded even when the line is stuck, since the attempt is what
    /// callers are checked for.
    fn release(&mut self) -> Result<(), ActuatorError> {
        self.log.push(ActuatorCall::Release);
        if self.fail_off {
            return Err(ActuatorError::GpioSetupFailed(io::ErrorKind::PermissionDenied));
        }
        Ok(())
    }
}

// ── Sensor ────────────────────────────────────────────────────

pub type ScriptedRead = Result<Option<f32>, SensorError>;

/// Replays scripted readings, then repeats the last one.
pub struct MockSensor {
    script: VecDeque<ScriptedRead>,
    last: ScriptedRead,
}

impl MockSensor {
    pub fn new(script: impl IntoIterator<Item = ScriptedRead>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Ok(None),
        }
    }

    pub fn celsius(readings: &[f32]) -> Self {
        Self::new(readings.iter().map(|&t| Ok(Some(t))))
    }
}

impl TemperaturePort for MockSensor {
    fn read_celsius(&mut self) -> Result<Option<f32>, SensorError> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

// ── Platform ──────────────────────────────────────────────────

pub struct MockPlatform {
    pub relay_log: RelayLog,
    sensor: Option<MockSensor>,
    pub fail_energize: bool,
    /// Relay line stuck: both driving it off and releasing it fail.
    pub fail_off: bool,
    pub opened_actuator: bool,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn with_sensor(sensor: MockSensor) -> Self {
        Self {
            relay_log: RelayLog::default(),
            sensor: Some(sensor),
            fail_energize: false,
            fail_off: false,
            opened_actuator: false,
        }
    }

    pub fn without_sensor() -> Self {
        Self {
            relay_log: RelayLog::default(),
            sensor: None,
            fail_energize: false,
            fail_off: false,
            opened_actuator: false,
        }
    }
}

impl Platform for MockPlatform {
    type Actuator = MockRelay;
    type Sensor = MockSensor;

    fn open_actuator(&mut self, _config: &PumpConfig) -> Result<MockRelay, ActuatorError> {
        self.opened_actuator = true;
        Ok(MockRelay {
            log: self.relay_log.clone(),
            energized: false,
            fail_energize: self.fail_energize,
            fail_off: self.fail_off,
        })
    }

    fn open_sensor(&mut self, _config: &TemperatureConfig) -> Result<MockSensor, SensorError> {
        self.sensor.take().ok_or(SensorError::DeviceNotFound)
    }
}

// ── Sleeper ───────────────────────────────────────────────────

#[derive(Default)]
pub struct SleepLog {
    pub slept_ms: Vec<u64>,
    /// Status file contents seen at the start of each sleep.
    pub stage_at_sleep: Vec<Option<String>>,
}

/// Returns immediately, recording what it was asked to do.
#[derive(Clone)]
pub struct FakeSleeper {
    pub log: Arc<Mutex<SleepLog>>,
    state_file: PathBuf,
    interrupt_at: Option<usize>,
}

#[allow(dead_code)]
impl FakeSleeper {
    pub fn new(paths: &RuntimePaths) -> Self {
        Self {
            log: Arc::default(),
            state_file: paths.state.clone(),
            interrupt_at: None,
        }
    }

    /// Report an interruption on the `n`th sleep (0-based).
    pub fn interrupting_at(mut self, n: usize) -> Self {
        self.interrupt_at = Some(n);
        self
    }

    pub fn slept(&self) -> Vec<u64> {
        self.log.lock().unwrap().slept_ms.clone()
    }

    pub fn stages(&self) -> Vec<Option<String>> {
        self.log.lock().unwrap().stage_at_sleep.clone()
    }
}

impl Sleeper for FakeSleeper {
    fn sleep(&self, ms: u64) -> Wake {
        let mut log = self.log.lock().unwrap();
        let n = log.slept_ms.len();
        log.slept_ms.push(ms);
        log.stage_at_sleep
            .push(fs::read_to_string(&self.state_file).ok());
        if self.interrupt_at == Some(n) {
            Wake::Interrupted
        } else {
            Wake::Elapsed
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<AppEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Process probe ─────────────────────────────────────────────

#[derive(Default)]
pub struct MapProbe(pub HashMap<u32, Liveness>);

impl ProcessProbe for MapProbe {
    fn probe(&self, pid: u32) -> Liveness {
        self.0.get(&pid).copied().unwrap_or(Liveness::Gone)
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Lock, status publisher and relay line in a private temp directory.
pub struct Rig {
    pub dir: tempfile::TempDir,
    pub paths: RuntimePaths,
    pub guard: Arc<SingletonGuard>,
    pub line: Arc<ActuatorLine>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path());
        let guard = Arc::new(
            SingletonGuard::acquire_as(paths.clone(), 4242, &MapProbe::default()).unwrap(),
        );
        Self {
            dir,
            paths,
            guard,
            line: Arc::new(ActuatorLine::new()),
        }
    }

    pub fn publisher(&self) -> StatePublisher {
        StatePublisher::new(Arc::clone(&self.guard))
    }

    pub fn stage(&self) -> Option<String> {
        fs::read_to_string(&self.paths.state).ok()
    }
}

/// The envelope used by the acceptance scenarios.
pub fn scenario_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.temperature.min = 15.0;
    config.temperature.max = 30.0;
    config.temperature.warning = 25.0;
    config.temperature.check_interval = 30;
    config.pump.run_time = 60;
    config
}
