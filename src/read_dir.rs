use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub type Entries = BTreeSet<Entry>;

/// A game log file, identified well enough to tell when it has changed.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

pub fn is_gamelog(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| {
            let name = name.to_ascii_lowercase();
            name.ends_with(".csv") || name.ends_with(".csv.gz")
        })
}

pub fn read_dir(path: &Path) -> Result<Entries> {
    let mut set = BTreeSet::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to read {}", path.display()))?;
        if !entry.file_type().is_file() || !is_gamelog(entry.path()) {
            continue;
        }
        let metadata = entry.metadata()?;
        set.insert(Entry {
            path: entry.path().strip_prefix(path)?.to_path_buf(),
            len: metadata.len(),
            modified: metadata.modified()?,
        });
    }
    Ok(set)
}
