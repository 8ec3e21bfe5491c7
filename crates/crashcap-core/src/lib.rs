//! CrashCap Core Library
//!
//! Monitoring and alerting engine for a single Linux host: system sampling,
//! process ranking, threshold-crossing alerts with notification dedup, and a
//! safe process-termination protocol.

pub mod alert;
pub mod config;
pub mod error;
pub mod executor;
pub mod monitor;
pub mod notify;
pub mod pressure;
pub mod sampler;
pub mod scanner;
pub mod swap;
pub mod types;

pub use alert::{AlertEvent, AlertKind, AlertState, AlertStateMachine};
pub use config::{Config, LogConfig, MonitorConfig, NotificationConfig};
pub use error::{Error, Result};
pub use executor::{ProcessExecutor, Termination};
pub use monitor::{start_monitor, start_monitor_with, MonitorHandle, MonitorStatus};
pub use notify::{notifier_from_config, DesktopNotifier, LogNotifier, Notifier};
pub use pressure::MemoryPressure;
pub use sampler::{Sampler, SystemSampler};
pub use scanner::{aggregate_by_user, rank_by_memory, ProcessMemoryDetail, ProcessScanner};
pub use swap::{SwapDevice, SwapStatus};
pub use types::{MemorySnapshot, MonitorStats, ProcessInfo};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
