use std::fs;
use std::path::{Path, PathBuf};

/// A well-known cache location the console can report and clean.
#[derive(Debug, Clone)]
pub struct CachePath {
    pub name: String,
    pub path: PathBuf,
    /// Deletion typically needs elevated privileges
    pub needs_root: bool,
}

/// Outcome of cleaning one directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    pub removed_entries: usize,
    pub removed_bytes: u64,
    pub failed_entries: usize,
}

/// Standard cache locations for a Linux host.
pub fn default_cache_paths() -> Vec<CachePath> {
    let mut paths = Vec::new();

    if let Some(user_cache) = dirs::cache_dir() {
        paths.push(CachePath {
            name: "User cache".to_string(),
            path: user_cache,
            needs_root: false,
        });
    }

    paths.push(CachePath {
        name: "APT package cache".to_string(),
        path: PathBuf::from("/var/cache/apt/archives"),
        needs_root: true,
    });

    paths.push(CachePath {
        name: "Temporary files".to_string(),
        path: PathBuf::from("/tmp"),
        needs_root: false,
    });

    paths
}

/// Recursive directory size in bytes. Entries that cannot be read are
/// skipped; an unreadable root counts as zero.
pub fn dir_size(path: &Path) -> u64 {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut total = 0u64;
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            total += dir_size(&entry.path());
        } else {
            total += meta.len();
        }
    }
    total
}

/// Delete the contents of `path` (never the directory itself).
///
/// Per-entry failures are counted, not fatal, so one protected file does not
/// abort the rest of the cleanup.
pub fn clean_dir(path: &Path) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => {
            outcome.failed_entries = 1;
            return outcome;
        }
    };

    for entry in entries.flatten() {
        let entry_path = entry.path();
        let Ok(meta) = entry.metadata() else {
            outcome.failed_entries += 1;
            continue;
        };

        let (size, result) = if meta.is_dir() {
            (dir_size(&entry_path), fs::remove_dir_all(&entry_path))
        } else {
            (meta.len(), fs::remove_file(&entry_path))
        };

        match result {
            Ok(()) => {
                outcome.removed_entries += 1;
                outcome.removed_bytes += size;
            }
            Err(_) => outcome.failed_entries += 1,
        }
    }

    outcome
}
