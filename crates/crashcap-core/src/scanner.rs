use crate::error::{Error, Result};
use crate::types::ProcessInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use sysinfo::{Pid, System, Users};

/// Detailed memory view of a single process, for on-demand inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMemoryDetail {
    pub pid: u32,
    pub name: String,
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub run_time_secs: u64,
}

/// Enumerates live processes and ranks them by resource usage.
///
/// Process lifetimes are racy: anything that disappears between enumeration
/// and detail read is skipped silently, never surfaced as an error.
pub struct ProcessScanner {
    system: System,
    users: Users,
}

impl ProcessScanner {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            users: Users::new_with_refreshed_list(),
        }
    }

    /// One pass over currently running processes.
    ///
    /// Returned in ascending pid order so identical process sets always
    /// produce identical output.
    pub fn list_processes(&mut self) -> Vec<ProcessInfo> {
        self.system.refresh_memory();
        self.system.refresh_processes();

        let total = self.system.total_memory();
        let users = &self.users;

        let mut procs: Vec<ProcessInfo> = self
            .system
            .processes()
            .iter()
            .map(|(pid, p)| {
                let user = p
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|u| u.name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let memory_percent = if total > 0 {
                    p.memory() as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                ProcessInfo::new(pid.as_u32(), user, p.name().to_string(), p.memory())
                    .with_usage(memory_percent, p.cpu_usage() as f64)
            })
            .collect();

        procs.sort_by_key(|p| p.pid);
        procs
    }

    /// Top `n` processes by resident memory, descending.
    pub fn top_by_memory(&mut self, n: usize) -> Vec<ProcessInfo> {
        rank_by_memory(self.list_processes(), n)
    }

    /// Aggregate resident memory per owning user.
    pub fn memory_by_user(&mut self) -> HashMap<String, u64> {
        aggregate_by_user(&self.list_processes())
    }

    /// All processes owned by the given user, ascending pid.
    pub fn processes_for_user(&mut self, user: &str) -> Vec<ProcessInfo> {
        self.list_processes()
            .into_iter()
            .filter(|p| p.user == user)
            .collect()
    }

    /// Look up a single live process by pid.
    pub fn find(&mut self, pid: u32) -> Result<ProcessInfo> {
        self.list_processes()
            .into_iter()
            .find(|p| p.pid == pid)
            .ok_or(Error::NotFound(pid))
    }

    /// Detailed memory breakdown for a single pid, from a fresh read.
    pub fn memory_detail(&mut self, pid: u32) -> Result<ProcessMemoryDetail> {
        self.system.refresh_memory();
        let sys_pid = Pid::from_u32(pid);
        if !self.system.refresh_process(sys_pid) {
            return Err(Error::NotFound(pid));
        }

        let total = self.system.total_memory();
        let p = self.system.process(sys_pid).ok_or(Error::NotFound(pid))?;

        Ok(ProcessMemoryDetail {
            pid,
            name: p.name().to_string(),
            rss_bytes: p.memory(),
            virtual_bytes: p.virtual_memory(),
            memory_percent: if total > 0 {
                p.memory() as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            cpu_percent: p.cpu_usage() as f64,
            run_time_secs: p.run_time(),
        })
    }

    /// Name of the user owning this process, if resolvable.
    pub fn current_user(&mut self) -> Option<String> {
        let pid = sysinfo::get_current_pid().ok()?;
        self.system.refresh_process(pid);
        let proc = self.system.process(pid)?;
        let uid = proc.user_id()?;
        self.users
            .get_user_by_id(uid)
            .map(|u| u.name().to_string())
    }

    /// Number of currently running processes.
    pub fn process_count(&mut self) -> usize {
        self.system.refresh_processes();
        self.system.processes().len()
    }
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank a process snapshot by resident memory, descending; ties broken by
/// ascending pid so identical inputs always produce identical output.
pub fn rank_by_memory(mut procs: Vec<ProcessInfo>, n: usize) -> Vec<ProcessInfo> {
    procs.sort_by(|a, b| {
        b.memory_bytes
            .cmp(&a.memory_bytes)
            .then(a.pid.cmp(&b.pid))
    });
    procs.truncate(n);
    procs
}

/// Sum resident memory per owning user.
pub fn aggregate_by_user(procs: &[ProcessInfo]) -> HashMap<String, u64> {
    let mut by_user: HashMap<String, u64> = HashMap::new();
    for p in procs {
        *by_user.entry(p.user.clone()).or_insert(0) += p.memory_bytes;
    }
    by_user
}
