pub mod storage;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildHistoryEntry {
    pub timestamp: DateTime<Local>,
    pub toolchain: String,
    pub duration: f64,
    pub success: bool,
    pub forced: bool,
    pub compiled: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
}

impl BuildHistoryEntry {
    pub fn new(toolchain: String) -> Self {
        Self {
            timestamp: Local::now(),
            toolchain,
            duration: 0.0,
            success: false,
            forced: false,
            compiled: 0,
            error_count: 0,
            warning_count: 0,
            git_commit: capture_git(&["rev-parse", "HEAD"]),
            git_branch: capture_git(&["rev-parse", "--abbrev-ref", "HEAD"]),
        }
    }
}

impl fmt::Display for BuildHistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "failed" };
        let forced = if self.forced { " (forced)" } else { "" };

        write!(
            f,
            "{} {:4} {:6} compiled {}, {} errors, {} warnings ({:.2}s){}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.toolchain,
            status,
            self.compiled,
            self.error_count,
            self.warning_count,
            self.duration,
            forced
        )?;

        if let (Some(branch), Some(commit)) = (&self.git_branch, &self.git_commit) {
            write!(f, " [{}@{}]", branch, &commit[..commit.len().min(8)])?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryEntry {
    pub timestamp: DateTime<Local>,
    pub executable: String,
    pub duration: f64,
    pub exit_code: Option<i32>,
    pub success: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl RunHistoryEntry {
    pub fn new(executable: String) -> Self {
        Self {
            timestamp: Local::now(),
            executable,
            duration: 0.0,
            exit_code: None,
            success: false,
            failure_reason: None,
        }
    }
}

impl fmt::Display for RunHistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} exit {} ({:.2}s)",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.executable,
            self.exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string()),
            self.duration
        )?;

        if let Some(reason) = &self.failure_reason {
            write!(f, " [{}]", reason)?;
        }

        Ok(())
    }
}

pub struct BuildHistory {
    entries: Vec<BuildHistoryEntry>,
    storage_path: PathBuf,
    max_entries: usize,
}

impl BuildHistory {
    pub fn new(storage_path: PathBuf, max_entries: usize) -> anyhow::Result<Self> {
        let entries = storage::load_entries(&storage_path)?;
        Ok(Self {
            entries,
            storage_path,
            max_entries,
        })
    }

    pub fn add_entry(&mut self, entry: BuildHistoryEntry) -> anyhow::Result<()> {
        self.entries.push(entry);

        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }

        storage::save_entries(&self.storage_path, &self.entries)
    }

    pub fn entries(&self) -> &[BuildHistoryEntry] {
        &self.entries
    }

    pub fn last_entry(&self) -> Option<&BuildHistoryEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        storage::save_entries(&self.storage_path, &self.entries)
    }
}

pub struct RunHistory {
    entries: Vec<RunHistoryEntry>,
    storage_path: PathBuf,
    max_entries: usize,
}

impl RunHistory {
    /// Kept next to the build history file, under its own name.
    pub fn storage_path_for(build_history_path: &Path) -> PathBuf {
        build_history_path.with_file_name("run_history.json")
    }

    pub fn new(build_history_path: PathBuf, max_entries: usize) -> anyhow::Result<Self> {
        let storage_path = Self::storage_path_for(&build_history_path);
        let entries = storage::load_entries(&storage_path)?;
        Ok(Self {
            entries,
            storage_path,
            max_entries,
        })
    }

    pub fn add_entry(&mut self, entry: RunHistoryEntry) -> anyhow::Result<()> {
        self.entries.push(entry);

        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }

        storage::save_entries(&self.storage_path, &self.entries)
    }

    pub fn entries(&self) -> &[RunHistoryEntry] {
        &self.entries
    }

    pub fn last_entry(&self) -> Option<&RunHistoryEntry> {
        self.entries.last()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        storage::save_entries(&self.storage_path, &self.entries)
    }
}

fn capture_git(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build_entry(toolchain: &str, success: bool) -> BuildHistoryEntry {
        let mut entry = BuildHistoryEntry::new(toolchain.to_string());
        entry.success = success;
        entry
    }

    #[test]
    fn test_build_history_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history/build_history.json");

        {
            let mut history = BuildHistory::new(path.clone(), 10).unwrap();
            history.add_entry(build_entry("gnu", true)).unwrap();
        }

        let reopened = BuildHistory::new(path, 10).unwrap();
        assert_eq!(reopened.entries().len(), 1);
        assert_eq!(reopened.last_entry().unwrap().toolchain, "gnu");
        assert!(reopened.last_entry().unwrap().success);
    }

    #[test]
    fn test_build_history_evicts_oldest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build_history.json");

        let mut history = BuildHistory::new(path, 2).unwrap();
        history.add_entry(build_entry("gnu", true)).unwrap();
        history.add_entry(build_entry("msvc", false)).unwrap();
        history.add_entry(build_entry("gnu", true)).unwrap();

        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].toolchain, "msvc");
    }

    #[test]
    fn test_run_history_uses_its_own_file() {
        let dir = tempdir().unwrap();
        let build_path = dir.path().join("build_history.json");

        let mut runs = RunHistory::new(build_path.clone(), 10).unwrap();
        let mut entry = RunHistoryEntry::new("app".to_string());
        entry.exit_code = Some(0);
        entry.success = true;
        runs.add_entry(entry).unwrap();

        assert!(dir.path().join("run_history.json").exists());
        assert!(!build_path.exists());
    }

    #[test]
    fn test_clear_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build_history.json");

        let mut history = BuildHistory::new(path.clone(), 10).unwrap();
        history.add_entry(build_entry("gnu", true)).unwrap();
        history.clear().unwrap();

        assert!(history.entries().is_empty());
        let reopened = BuildHistory::new(path, 10).unwrap();
        assert!(reopened.entries().is_empty());
    }

    #[test]
    fn test_build_entry_display_mentions_counts() {
        let mut entry = build_entry("gnu", true);
        entry.compiled = 3;
        entry.warning_count = 1;

        let line = entry.to_string();
        assert!(line.contains("compiled 3"));
        assert!(line.contains("1 warnings"));
        assert!(line.contains("ok"));
    }

    #[test]
    fn test_run_entry_display_mentions_failure() {
        let mut entry = RunHistoryEntry::new("app".to_string());
        entry.exit_code = Some(139);
        entry.failure_reason = Some("Signal 11 (SIGSEGV (Segmentation fault))".to_string());

        let line = entry.to_string();
        assert!(line.contains("exit 139"));
        assert!(line.contains("SIGSEGV"));
    }
}
