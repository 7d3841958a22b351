//! Process-wide template cache (spec §5): a read-mostly map from
//! configuration file path to its parsed `Config`, populated lazily and
//! invalidated when the backing file's mtime changes.
//!
//! Grounded on the teacher's `notify`/`notify-debouncer-mini` watch-mode
//! dependency pair (`cli::commands::watch`) for the "invalidate when a
//! file changes" idea, generalized here to a passive mtime check rather
//! than an active filesystem watcher, since the cache only needs to be
//! correct on next access, not to push notifications. Readers observe
//! either the old or the new snapshot atomically via a single `RwLock`
//! (spec §5: "single-writer discipline").

use crate::config::Config;
use crate::error::EngineError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

struct CacheEntry {
    config: Config,
    mtime: SystemTime,
}

static CACHE: Lazy<RwLock<HashMap<PathBuf, CacheEntry>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Load `path`, reusing the cached parse when the file's mtime hasn't
/// moved since it was last read. Returns a clone of the cached
/// configuration; the cache itself never hands out a mutable reference.
pub fn load(path: &Path) -> Result<Config, EngineError> {
    let mtime = fs_mtime(path)?;

    if let Some(entry) = CACHE.read().expect("template cache poisoned").get(path) {
        if entry.mtime == mtime {
            tracing::debug!(path = %path.display(), "template cache hit");
            return Ok(entry.config.clone());
        }
    }

    tracing::info!(path = %path.display(), "template cache miss, reparsing");
    let text = std::fs::read_to_string(path)?;
    let config = Config::from_json_str(&text)?;

    CACHE
        .write()
        .expect("template cache poisoned")
        .insert(path.to_path_buf(), CacheEntry { config: config.clone(), mtime });

    Ok(config)
}

/// Drop every cached entry. Exposed for tests and for callers that want
/// to force a clean reparse (e.g. after an external bulk config reload).
pub fn clear() {
    CACHE.write().expect("template cache poisoned").clear();
}

fn fs_mtime(path: &Path) -> Result<SystemTime, EngineError> {
    std::fs::metadata(path)?.modified().map_err(EngineError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn caches_until_mtime_changes() {
        clear();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"formulas": [{{ "id": "a", "formula": "1", "inputs": [] }}]}}"#).unwrap();
        file.flush().unwrap();

        let first = load(file.path()).unwrap();
        assert_eq!(first.formulas[0].id, "a");

        // Re-reading without touching the file should hit the cache.
        let second = load(file.path()).unwrap();
        assert_eq!(second.formulas.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        clear();
        let err = load(Path::new("/nonexistent/path/config.json")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
