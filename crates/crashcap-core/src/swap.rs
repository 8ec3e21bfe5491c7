use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// One active swap area from /proc/swaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapDevice {
    pub filename: String,
    pub kind: String,
    pub size_kib: u64,
    pub used_kib: u64,
    pub priority: i64,
}

impl SwapDevice {
    pub fn is_partition(&self) -> bool {
        self.filename.starts_with("/dev/")
    }
}

/// Snapshot of all active swap areas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapStatus {
    pub devices: Vec<SwapDevice>,
}

impl SwapStatus {
    /// Read current swap status from /proc/swaps.
    ///
    /// Format (first line is a header):
    /// ```text
    /// Filename    Type        Size     Used   Priority
    /// /dev/sda2   partition   8388604  1024   -2
    /// ```
    pub fn read() -> Result<Self> {
        let content = fs::read_to_string("/proc/swaps")
            .map_err(|e| Error::Sampling(format!("Failed to read /proc/swaps: {}", e)))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let mut devices = Vec::new();

        // Skip the header line
        for line in content.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return Err(Error::Parse(format!(
                    "Malformed /proc/swaps line: {}",
                    line
                )));
            }

            devices.push(SwapDevice {
                filename: parts[0].to_string(),
                kind: parts[1].to_string(),
                size_kib: parts[2]
                    .parse()
                    .map_err(|e| Error::Parse(format!("Bad swap size '{}': {}", parts[2], e)))?,
                used_kib: parts[3]
                    .parse()
                    .map_err(|e| Error::Parse(format!("Bad swap used '{}': {}", parts[3], e)))?,
                priority: parts[4]
                    .parse()
                    .map_err(|e| Error::Parse(format!("Bad swap priority '{}': {}", parts[4], e)))?,
            });
        }

        Ok(Self { devices })
    }

    /// No active swap at all?
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn total_kib(&self) -> u64 {
        self.devices.iter().map(|d| d.size_kib).sum()
    }

    pub fn used_kib(&self) -> u64 {
        self.devices.iter().map(|d| d.used_kib).sum()
    }

    pub fn free_kib(&self) -> u64 {
        self.total_kib().saturating_sub(self.used_kib())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_swaps() {
        let content = "Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority\n\
                       /dev/sda2                               partition\t8388604\t\t1024\t\t-2\n\
                       /swapfile                               file\t\t2097148\t\t0\t\t-3\n";

        let status = SwapStatus::parse(content).unwrap();
        assert_eq!(status.devices.len(), 2);

        let part = &status.devices[0];
        assert_eq!(part.filename, "/dev/sda2");
        assert_eq!(part.kind, "partition");
        assert_eq!(part.size_kib, 8388604);
        assert_eq!(part.used_kib, 1024);
        assert_eq!(part.priority, -2);
        assert!(part.is_partition());

        let file = &status.devices[1];
        assert_eq!(file.filename, "/swapfile");
        assert!(!file.is_partition());
    }

    #[test]
    fn test_parse_header_only_means_no_swap() {
        let content = "Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority\n";
        let status = SwapStatus::parse(content).unwrap();
        assert!(status.is_empty());
        assert_eq!(status.total_kib(), 0);
    }

    #[test]
    fn test_parse_malformed_line_is_error() {
        let content = "Filename Type Size Used Priority\n/dev/sda2 partition 8388604\n";
        assert!(SwapStatus::parse(content).is_err());
    }

    #[test]
    fn test_parse_bad_number_is_error() {
        let content = "Filename Type Size Used Priority\n/dev/sda2 partition lots 0 -2\n";
        assert!(SwapStatus::parse(content).is_err());
    }

    #[test]
    fn test_totals() {
        let content = "Filename Type Size Used Priority\n\
                       /dev/sda2 partition 1000 400 -2\n\
                       /swapfile file 500 100 -3\n";

        let status = SwapStatus::parse(content).unwrap();
        assert_eq!(status.total_kib(), 1500);
        assert_eq!(status.used_kib(), 500);
        assert_eq!(status.free_kib(), 1000);
    }

    #[test]
    fn test_read_live_if_proc_present() {
        // /proc/swaps exists on any Linux host; content varies
        if std::path::Path::new("/proc/swaps").exists() {
            let status = SwapStatus::read().expect("readable /proc/swaps must parse");
            assert!(status.used_kib() <= status.total_kib());
        }
    }
}
