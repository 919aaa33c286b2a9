//! Fuzz target: DS18B20 `w1_slave` frame decoder
//!
//! Feeds arbitrary text to `parse_frame` and verifies:
//! - No panics on arbitrary input
//! - A decoded temperature is finite and rounded to 0.01
//!
//! cargo fuzz run fuzz_sensor_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpctl::sensors::ds18b20::{Frame, parse_frame};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(Frame::Celsius(t)) = parse_frame(&text) {
        assert!(t.is_finite(), "decoded {t} from {text:?}");
        if t.abs() < 1.0e4 {
            let hundredths = f64::from(t) * 100.0;
            assert!(
                (hundredths - hundredths.round()).abs() < 1.0e-2,
                "{t} is not rounded to two decimals"
            );
        }
    }
});
