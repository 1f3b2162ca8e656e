//! Process-wide per-subtype database cache (§6 external collaborator: "the
//! registry ... a process-wide cache of opened databases, one per subtype,
//! configured once at startup"). See SPEC_FULL.md §4.4, §9.
//!
//! Two layers: an explicit [`Registry`] that owns a directory and a cache of
//! opened [`Database`]s, and a process-wide default instance behind
//! [`setup`]/[`get`] for binaries that don't want to thread a `Registry`
//! through every call site.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::database::Database;
use crate::error::{HidbError, Result};

/// Maps the handful of virus-type spellings the rest of the crate accepts
/// onto the registry's on-disk key. Unrecognized subtypes are a
/// [`HidbError::NoHiDbForVirusType`], not a panic.
fn normalize_virus_type(virus_type: &str) -> Option<&'static str> {
    match virus_type {
        "A(H1N1)" | "H1" | "h1" => Some("h1"),
        "A(H3N2)" | "H3" | "h3" => Some("h3"),
        "B" | "b" => Some("b"),
        _ => None,
    }
}

/// An explicit registry context: a directory of `{key}.hidb` files and the
/// databases opened from it so far. Opening is lazy and memoized — the first
/// `get()` for a subtype reads the file; later calls return the same `Arc`.
pub struct Registry {
    dir: PathBuf,
    databases: RwLock<HashMap<&'static str, Arc<Database>>>,
}

impl Registry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), databases: RwLock::new(HashMap::new()) }
    }

    fn default_dir() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_default();
        Path::new(&home).join("AD").join("data")
    }

    /// The database for `virus_type`, opening and caching it on first use.
    /// The on-disk convention is `{dir}/{key}.hidb` where `key` is one of
    /// `h1`/`h3`/`b` — not spelled out in the original, chosen to match the
    /// lower-case subtype abbreviations the query tools already print.
    pub fn get(&self, virus_type: &str) -> Result<Arc<Database>> {
        let key =
            normalize_virus_type(virus_type).ok_or_else(|| HidbError::NoHiDbForVirusType { virus_type: virus_type.to_string() })?;
        if let Some(db) = self.databases.read().get(key) {
            return Ok(Arc::clone(db));
        }
        let mut databases = self.databases.write();
        if let Some(db) = databases.get(key) {
            return Ok(Arc::clone(db));
        }
        let path = self.dir.join(format!("{key}.hidb"));
        tracing::info!(?path, virus_type, "opening database");
        let db = Arc::new(Database::open(&path)?);
        databases.insert(key, Arc::clone(&db));
        Ok(db)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

static DEFAULT: OnceLock<RwLock<Registry>> = OnceLock::new();

fn default_registry() -> &'static RwLock<Registry> {
    DEFAULT.get_or_init(|| RwLock::new(Registry::default()))
}

/// One-shot configuration of the process-wide default registry's directory.
/// Call this before the first [`get`] if the default (`$HOME/AD/data`)
/// isn't right; calling it again replaces the cache (and drops anything
/// already opened).
pub fn setup(dir: impl Into<PathBuf>) {
    *default_registry().write() = Registry::new(dir);
}

/// Convenience accessor over the process-wide default registry.
pub fn get(virus_type: &str) -> Result<Arc<Database>> {
    default_registry().read().get(virus_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_subtypes() {
        assert_eq!(normalize_virus_type("A(H3N2)"), Some("h3"));
        assert_eq!(normalize_virus_type("H1"), Some("h1"));
        assert_eq!(normalize_virus_type("B"), Some("b"));
    }

    #[test]
    fn unknown_virus_type_is_an_error_not_a_panic() {
        let registry = Registry::new(std::env::temp_dir());
        let err = registry.get("A(H5N1)").unwrap_err();
        assert!(matches!(err, HidbError::NoHiDbForVirusType { virus_type } if virus_type == "A(H5N1)"));
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let dir = std::env::temp_dir().join("hidb-registry-test-missing");
        let registry = Registry::new(dir);
        let err = registry.get("B").unwrap_err();
        assert!(matches!(err, HidbError::Io(_)));
    }
}
