//! DS18B20 1-Wire temperature probe.
//!
//! Read through the kernel `w1_therm` driver, which exposes each probe as
//! `/sys/bus/w1/devices/28-xxxxxxxxxxxx/w1_slave`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line carries the CRC verdict, the second the temperature in
//! millidegrees Celsius.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::TemperaturePort;
use crate::error::SensorError;

pub const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";
/// Family code of the DS18B20 in 1-Wire device names.
const FAMILY_PREFIX: &str = "28";

const READ_ATTEMPTS: u32 = 3;
const IO_BACKOFF: Duration = Duration::from_millis(500);
const CRC_BACKOFF: Duration = Duration::from_millis(200);

/// One decoded `w1_slave` frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    CrcFailed,
    NoTemperature,
    Celsius(f32),
}

pub struct Ds18b20Sensor {
    device_file: PathBuf,
    io_backoff: Duration,
    crc_backoff: Duration,
}

impl Ds18b20Sensor {
    /// Find the first DS18B20 under `base`.
    pub fn discover_in(base: &Path) -> Result<Self, SensorError> {
        let entries = fs::read_dir(base).map_err(|e| {
            debug!("TEMP | cannot list {}: {e}", base.display());
            SensorError::DeviceNotFound
        })?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(FAMILY_PREFIX))
            .map(|entry| entry.path())
            .collect();
        devices.sort();

        let Some(device) = devices.into_iter().next() else {
            error!("TEMP | DS18B20 not found under {}", base.display());
            return Err(SensorError::DeviceNotFound);
        };
        info!("TEMP | DS18B20 found: {}", device.display());
        Ok(Self {
            device_file: device.join("w1_slave"),
            io_backoff: IO_BACKOFF,
            crc_backoff: CRC_BACKOFF,
        })
    }

    /// Override the pauses between retries.
    pub fn with_backoff(mut self, io: Duration, crc: Duration) -> Self {
        self.io_backoff = io;
        self.crc_backoff = crc;
        self
    }

    pub fn device_file(&self) -> &Path {
        &self.device_file
    }

    /// Same as [`read_celsius`](TemperaturePort::read_celsius), converted
    /// to Fahrenheit.
    pub fn read_fahrenheit(&mut self) -> Result<Option<f32>, SensorError> {
        Ok(self.read_celsius()?.map(celsius_to_fahrenheit))
    }
}

impl TemperaturePort for Ds18b20Sensor {
    /// Up to three attempts.  A device that vanished or never produced a
    /// valid frame gives `Ok(None)`; a device file that still fails with
    /// any other I/O error on the last attempt gives [`SensorError::Io`].
    fn read_celsius(&mut self) -> Result<Option<f32>, SensorError> {
        let mut io_failure = None;
        for attempt in 1..=READ_ATTEMPTS {
            let text = match fs::read_to_string(&self.device_file) {
                Ok(text) => {
                    io_failure = None;
                    text
                }
                Err(e) => {
                    warn!("TEMP | read error (attempt {attempt}): {e}");
                    io_failure = Some(e.kind()).filter(|&k| k != io::ErrorKind::NotFound);
                    thread::sleep(self.io_backoff);
                    continue;
                }
            };
            match parse_frame(&text)? {
                Frame::Celsius(t) => return Ok(Some(t)),
                Frame::CrcFailed => {
                    debug!("TEMP | CRC check failed (attempt {attempt})");
                    thread::sleep(self.crc_backoff);
                }
                Frame::NoTemperature => debug!("TEMP | no t= field (attempt {attempt})"),
            }
        }
        if let Some(kind) = io_failure {
            error!("TEMP | device unreadable after {READ_ATTEMPTS} attempts: {kind}");
            return Err(SensorError::Io(kind));
        }
        error!("TEMP | cannot read temperature after {READ_ATTEMPTS} attempts");
        Ok(None)
    }
}

/// Decode the contents of a `w1_slave` file.  `Err` means the frame is
/// truncated or the `t=` value is not a number.
pub fn parse_frame(text: &str) -> Result<Frame, SensorError> {
    let mut lines = text.lines();
    let status = lines.next().ok_or(SensorError::Malformed)?;
    if !status.trim_end().ends_with("YES") {
        return Ok(Frame::CrcFailed);
    }
    let data = lines.next().ok_or(SensorError::Malformed)?;
    let Some(pos) = data.find("t=") else {
        return Ok(Frame::NoTemperature);
    };
    let milli: f64 = data[pos + 2..]
        .trim()
        .parse()
        .map_err(|_| SensorError::Malformed)?;
    let celsius = round2(milli / 1000.0);
    // `f64::from_str` accepts "nan" and "inf".
    if !celsius.is_finite() {
        return Err(SensorError::Malformed);
    }
    Ok(Frame::Celsius(celsius))
}

fn round2(value: f64) -> f32 {
    ((value * 100.0).round() / 100.0) as f32
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    round2(f64::from(celsius) * 9.0 / 5.0 + 32.0)
}
