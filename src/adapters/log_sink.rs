//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade, which `adapters::logging` routes to the
//! console and the pump log file.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | state={:?}", state);
            }
            AppEvent::SensorUnavailable(e) => {
                warn!("SENSOR | unavailable: {}", e);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::Telemetry(t) => {
                let temp = t
                    .temperature_c
                    .map_or_else(|| "n/a".to_string(), |c| format!("{c:.2}\u{00b0}C"));
                info!(
                    "TELEM | state={:?} | T={} | {}/{}s | pump={}",
                    t.state,
                    temp,
                    t.elapsed_ms / 1000,
                    t.run_time_ms / 1000,
                    if t.pump_on { "ON" } else { "OFF" },
                );
            }
            AppEvent::FaultDetected(fault) => {
                error!("FAULT | {}", fault);
            }
            AppEvent::Finished(report) => {
                info!(
                    "RESULT | outcome={} | checks={} | run={}s",
                    report.outcome,
                    report.checks,
                    report.elapsed_ms / 1000
                );
                if let Some(delta) = report.temp_change() {
                    info!("RESULT | temperature change {:+.2}\u{00b0}C", delta);
                }
            }
        }
    }
}
