use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time read of aggregate memory, swap, and CPU usage.
///
/// Immutable once captured; the sampler creates a fresh one per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub used_percent: f64,
    pub swap_total_bytes: u64,
    pub swap_used_percent: f64,
    pub cpu_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl MemorySnapshot {
    pub fn new(total_bytes: u64, used_bytes: u64, available_bytes: u64) -> Self {
        let used_percent = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_bytes,
            used_bytes,
            available_bytes,
            used_percent,
            swap_total_bytes: 0,
            swap_used_percent: 0.0,
            cpu_percent: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_swap(mut self, swap_total_bytes: u64, swap_used_bytes: u64) -> Self {
        self.swap_total_bytes = swap_total_bytes;
        // No swap configured degrades to 0%, not an error
        self.swap_used_percent = if swap_total_bytes > 0 {
            swap_used_bytes as f64 / swap_total_bytes as f64 * 100.0
        } else {
            0.0
        };
        self
    }

    pub fn with_cpu(mut self, cpu_percent: f64) -> Self {
        self.cpu_percent = cpu_percent;
        self
    }

    /// Aggregate usage at or above the given percentage?
    pub fn exceeds(&self, threshold_percent: f64) -> bool {
        self.used_percent >= threshold_percent
    }
}

/// One running process at snapshot time.
///
/// The pid is only unique within a single snapshot; the OS reuses pids, so
/// never treat a stored pid as a stable identity across snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub user: String,
    pub name: String,
    pub memory_bytes: u64,
    pub memory_percent: f64,
    pub cpu_percent: f64,
}

impl ProcessInfo {
    pub fn new(pid: u32, user: String, name: String, memory_bytes: u64) -> Self {
        Self {
            pid,
            user,
            name,
            memory_bytes,
            memory_percent: 0.0,
            cpu_percent: 0.0,
        }
    }

    pub fn with_usage(mut self, memory_percent: f64, cpu_percent: f64) -> Self {
        self.memory_percent = memory_percent;
        self.cpu_percent = cpu_percent;
        self
    }

    pub fn memory_mb(&self) -> u64 {
        self.memory_bytes / (1024 * 1024)
    }
}

/// Counters accumulated by the monitor loop, one instance per session.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorStats {
    pub total_ticks: u64,
    pub failed_samples: u64,
    pub alerts_raised: u64,
    pub recoveries: u64,
    pub notification_failures: u64,
    pub last_tick: Option<DateTime<Utc>>,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.total_ticks += 1;
        self.last_tick = Some(Utc::now());
    }

    pub fn record_failed_sample(&mut self) {
        self.failed_samples += 1;
    }

    pub fn record_alert(&mut self) {
        self.alerts_raised += 1;
    }

    pub fn record_recovery(&mut self) {
        self.recoveries += 1;
    }

    pub fn record_notification_failure(&mut self) {
        self.notification_failures += 1;
    }
}
