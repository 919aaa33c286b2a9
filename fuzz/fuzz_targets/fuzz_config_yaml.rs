//! Fuzz target: YAML configuration loader
//!
//! Any document `from_yaml` accepts must produce a usable envelope:
//! - min < warning < max, all finite
//! - non-zero check interval and run time
//!
//! cargo fuzz run fuzz_config_yaml

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpctl::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = SystemConfig::from_yaml(text) else {
        return;
    };

    let env = config.envelope();
    assert!(env.min_temp < env.warning_temp && env.warning_temp < env.max_temp);
    assert!(env.check_interval_ms > 0);
    assert!(env.run_time_ms > 0);
});
