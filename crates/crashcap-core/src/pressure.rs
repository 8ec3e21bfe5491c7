use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Memory pressure from PSI (Pressure Stall Information).
///
/// `some` is the share of time at least one task stalled on memory; `full`
/// the share where every task stalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryPressure {
    pub some_avg10: f64,
    pub some_avg60: f64,
    pub full_avg10: f64,
    pub full_avg60: f64,
}

impl MemoryPressure {
    /// Read from /proc/pressure/memory. Missing on kernels without PSI;
    /// callers treat that as "not available", not a hard failure.
    pub fn read() -> Result<Self> {
        let content = fs::read_to_string("/proc/pressure/memory").map_err(|e| {
            Error::Sampling(format!("Failed to read /proc/pressure/memory: {}", e))
        })?;
        Self::parse(&content)
    }

    /// Parse lines of the form:
    /// `some avg10=0.00 avg60=0.00 avg300=0.00 total=634678`
    fn parse(content: &str) -> Result<Self> {
        let mut pressure = Self::default();
        let mut saw_some = false;

        for line in content.lines() {
            let mut fields = line.split_whitespace();
            let label = match fields.next() {
                Some(l) => l,
                None => continue,
            };

            for field in fields {
                let (key, value) = match field.split_once('=') {
                    Some(kv) => kv,
                    None => continue,
                };
                let value: f64 = match value.parse() {
                    Ok(v) => v,
                    Err(_) => continue,
                };

                match (label, key) {
                    ("some", "avg10") => {
                        pressure.some_avg10 = value;
                        saw_some = true;
                    }
                    ("some", "avg60") => pressure.some_avg60 = value,
                    ("full", "avg10") => pressure.full_avg10 = value,
                    ("full", "avg60") => pressure.full_avg60 = value,
                    _ => {}
                }
            }
        }

        if !saw_some {
            return Err(Error::Parse(
                "No 'some' record in PSI memory data".to_string(),
            ));
        }

        Ok(pressure)
    }

    /// Coarse status label for display.
    pub fn status(&self) -> &'static str {
        if self.full_avg10 > 0.0 {
            "CRITICAL"
        } else if self.some_avg10 > 10.0 {
            "HIGH"
        } else if self.some_avg10 > 5.0 {
            "MEDIUM"
        } else if self.some_avg10 > 0.0 {
            "LOW"
        } else {
            "NONE"
        }
    }
}
