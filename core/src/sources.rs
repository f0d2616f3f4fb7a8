use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Walk the source tree and collect every file with the configured
/// extension, sorted by path so build order is reproducible.
pub fn discover(source_dir: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == extension)
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

pub fn object_path(source: &Path, build_dir: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or(source.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".o");
    build_dir.join(name)
}

/// A source is stale when its object is missing or strictly older. Any
/// metadata failure counts as stale so the compile step surfaces the
/// real problem.
pub fn is_stale(source: &Path, object: &Path) -> bool {
    let object_modified = match fs::metadata(object).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(_) => return true,
    };
    let source_modified = match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(time) => time,
        Err(_) => return true,
    };

    source_modified > object_modified
}

pub fn select_stale(sources: &[PathBuf], build_dir: &Path, force: bool) -> Vec<PathBuf> {
    if force {
        return sources.to_vec();
    }

    sources
        .iter()
        .filter(|source| is_stale(source, &object_path(source, build_dir)))
        .cloned()
        .collect()
}
