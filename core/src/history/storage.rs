use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn load_entries<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;

    let entries: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))?;

    Ok(entries)
}

pub fn save_entries<T: Serialize>(path: &Path, entries: &[T]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
    }

    let content =
        serde_json::to_string_pretty(entries).context("Failed to serialize history entries")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write history file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let entries: Vec<String> = load_entries(&dir.path().join("none.json")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/history.json");

        save_entries(&path, &["one".to_string(), "two".to_string()]).unwrap();

        let entries: Vec<String> = load_entries(&path).unwrap();
        assert_eq!(entries, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();

        let result: anyhow::Result<Vec<String>> = load_entries(&path);
        assert!(result.is_err());
    }
}
