//! Shutdown racing a live cycle.
//!
//! Uses the real [`ShutdownHandler`] as the controller's sleeper, so a
//! trigger from another thread (standing in for the signal watcher) cuts
//! the monitoring sleep short.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::mock_hw::{ActuatorCall, MockPlatform, MockSensor, RecordingSink, Rig, scenario_config};

use pumpctl::app::service::CycleController;
use pumpctl::error::ActuatorError;
use pumpctl::fsm::context::Outcome;
use pumpctl::shutdown::{ShutdownHandler, ShutdownReason};

fn handler_for(rig: &Rig) -> Arc<ShutdownHandler> {
    Arc::new(ShutdownHandler::new(
        Arc::clone(&rig.line),
        Arc::clone(&rig.guard),
    ))
}

#[test]
fn signal_during_monitoring_stops_the_pump_and_clears_records() {
    let rig = Rig::new();
    let handler = handler_for(&rig);
    let mut platform = MockPlatform::with_sensor(MockSensor::celsius(&[22.0]));
    let relay_log = platform.relay_log.clone();

    let mut controller = CycleController::new(
        &scenario_config(),
        &mut platform,
        Arc::clone(&rig.line),
        rig.publisher(),
        Arc::clone(&handler),
        RecordingSink::default(),
    )
    .unwrap();

    let watcher = {
        let handler = Arc::clone(&handler);
        let relay_log = relay_log.clone();
        thread::spawn(move || {
            // Wait until the pump is running, then deliver the "signal".
            let deadline = Instant::now() + Duration::from_secs(10);
            while !relay_log.ever_energized() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            handler.trigger(ShutdownReason::Signal("SIGTERM"))
        })
    };

    let started = Instant::now();
    let report = controller.run_cycle();
    assert!(watcher.join().unwrap(), "watcher should have done the cleanup");

    assert!(started.elapsed() < Duration::from_secs(20), "sleep was not interrupted");
    assert_eq!(report.outcome, Outcome::AbortedError);
    assert_eq!(report.exit_code(), 1);
    assert!(handler.is_done());

    assert!(!relay_log.energized());
    assert!(relay_log.released());
    assert!(!rig.paths.lock.exists());
    assert!(!rig.paths.state.exists(), "late stage publish recreated the status file");
}

#[test]
fn shutdown_twice_equals_shutdown_once() {
    let rig = Rig::new();
    let handler = handler_for(&rig);
    let mut platform = MockPlatform::with_sensor(MockSensor::celsius(&[12.0]));

    let mut controller = CycleController::new(
        &scenario_config(),
        &mut platform,
        Arc::clone(&rig.line),
        rig.publisher(),
        Arc::clone(&handler),
        RecordingSink::default(),
    )
    .unwrap();
    assert_eq!(controller.run_cycle().outcome, Outcome::SkippedUnsafe);

    assert!(handler.trigger(ShutdownReason::CycleFinished));
    let after_first = platform.relay_log.calls();
    assert!(!handler.trigger(ShutdownReason::Signal("SIGINT")));

    assert_eq!(platform.relay_log.calls(), after_first);
    assert_eq!(
        after_first
            .iter()
            .filter(|&&c| c == ActuatorCall::Release)
            .count(),
        1
    );
    assert!(!rig.paths.lock.exists());
}

#[test]
fn shutdown_before_hardware_opens_fails_startup() {
    let rig = Rig::new();
    let handler = handler_for(&rig);
    handler.trigger(ShutdownReason::Signal("SIGTERM"));

    let mut platform = MockPlatform::with_sensor(MockSensor::celsius(&[22.0]));
    let result = CycleController::new(
        &scenario_config(),
        &mut platform,
        Arc::clone(&rig.line),
        rig.publisher(),
        Arc::clone(&handler),
        RecordingSink::default(),
    );

    assert_eq!(
        result.err(),
        Some(pumpctl::error::Error::Actuator(ActuatorError::Latched))
    );
    assert!(platform.relay_log.released());
    assert!(!platform.relay_log.ever_energized());
    assert!(!rig.paths.state.exists());
}
