//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements    | Connects to                       |
//! |----------------|---------------|-----------------------------------|
//! | `hardware`     | Platform      | sysfs GPIO relay, 1-Wire DS18B20  |
//! | `log_sink`     | EventSink     | `log` facade                      |
//! | `procfs`       | ProcessProbe  | `kill(pid, 0)`, `/proc/<pid>`     |
//! | `config_file`  | ConfigPort    | YAML file                         |
//! | `logging`      | -             | tracing-subscriber console + file |

pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod logging;
pub mod procfs;
