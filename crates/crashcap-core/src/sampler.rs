use crate::error::{Error, Result};
use crate::types::MemorySnapshot;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Source of memory snapshots.
///
/// The monitor loop only sees this trait, so tests can drive it with scripted
/// readings instead of the live system.
pub trait Sampler: Send {
    fn sample(&mut self) -> Result<MemorySnapshot>;
}

/// Samples aggregate memory, swap, and CPU usage from the running system.
///
/// Holds the `sysinfo` handle across calls: CPU usage is computed as a delta
/// against the previous refresh, so the first sample after construction may
/// report 0% CPU.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::everything())
                .with_cpu(CpuRefreshKind::new().with_cpu_usage()),
        );
        // Prime the CPU counters so the next sample has a delta to work with
        system.refresh_cpu();
        Self { system }
    }

    /// Number of logical CPUs seen at the last refresh.
    pub fn cpu_count(&self) -> usize {
        self.system.cpus().len()
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SystemSampler {
    /// Capture a point-in-time snapshot.
    ///
    /// Swap being absent is not an error (degrades to zero); memory totals
    /// being unreadable is.
    fn sample(&mut self) -> Result<MemorySnapshot> {
        self.system.refresh_memory();
        self.system.refresh_cpu();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(Error::Sampling(
                "memory totals unreadable (total reported as 0)".to_string(),
            ));
        }

        let snapshot = MemorySnapshot::new(
            total,
            self.system.used_memory(),
            self.system.available_memory(),
        )
        .with_swap(self.system.total_swap(), self.system.used_swap())
        .with_cpu(self.system.global_cpu_info().cpu_usage() as f64);

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_returns_plausible_values() {
        let mut sampler = SystemSampler::new();
        let snap = sampler.sample().expect("live sample should succeed");

        assert!(snap.total_bytes > 0);
        assert!(snap.used_bytes <= snap.total_bytes);
        assert!(snap.used_percent >= 0.0 && snap.used_percent <= 100.0);
        assert!(snap.swap_used_percent >= 0.0 && snap.swap_used_percent <= 100.0);
    }

    #[test]
    fn test_two_samples_are_independent_snapshots() {
        let mut sampler = SystemSampler::new();
        let first = sampler.sample().expect("first sample");
        let second = sampler.sample().expect("second sample");

        // The system is live, so values may differ; totals should not
        assert_eq!(first.total_bytes, second.total_bytes);
        assert!(second.timestamp >= first.timestamp);
    }
}
