use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TaxonomyError;

/// Cached query results older than this are recomputed.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(8 * 7 * 24 * 60 * 60);

/// Content fingerprint tolerant of insignificant whitespace variation.
///
/// Queries differing only in indentation or line breaks intentionally collide
/// to the same cache slot; that loses nothing because such queries are
/// semantically identical to the endpoint.
pub fn approximate_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    for token in input.split_whitespace() {
        hasher.update(token.as_bytes());
        hasher.update(b" ");
    }
    hex_digest(hasher)
}

/// Exact content fingerprint, for payloads where bytes matter.
pub fn exact_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex_digest(hasher)
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// On-disk content-addressed store with a fixed validity window.
///
/// Entries live under `<root>/<namespace>/<key>`; namespaces keep the raw
/// query cache and the parsed-record cache from colliding. Writes go through
/// a temp file and rename, so concurrent identical writers race harmlessly.
#[derive(Debug, Clone)]
pub struct QueryCache {
    root: Utf8PathBuf,
    validity: Duration,
}

impl QueryCache {
    pub fn new() -> Result<Self, TaxonomyError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("lotus-taxonomy"))
                    .ok()
            })
            .ok_or_else(|| {
                TaxonomyError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self {
            root,
            validity: DEFAULT_VALIDITY,
        })
    }

    pub fn new_with_root(root: impl Into<Utf8PathBuf>, validity: Duration) -> Self {
        Self {
            root: root.into(),
            validity,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn slot(&self, namespace: &str, key: &str) -> Utf8PathBuf {
        self.root.join(namespace).join(key)
    }

    /// Return the stored content for `key` if present and younger than the
    /// validity window.
    pub fn lookup(&self, namespace: &str, key: &str) -> Option<String> {
        let slot = self.slot(namespace, key);
        let metadata = fs::metadata(slot.as_std_path()).ok()?;
        let age = metadata.modified().ok()?.elapsed().ok()?;
        if age > self.validity {
            debug!(namespace, key, "cache entry expired");
            return None;
        }
        fs::read_to_string(slot.as_std_path()).ok()
    }

    pub fn store(&self, namespace: &str, key: &str, content: &str) -> Result<(), TaxonomyError> {
        let slot = self.slot(namespace, key);
        if let Some(parent) = slot.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        }
        let tmp = tempfile::Builder::new()
            .prefix(".cache-write")
            .tempfile_in(slot.parent().unwrap_or(&self.root).as_std_path())
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        fs::write(tmp.path(), content).map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        tmp.persist(slot.as_std_path())
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Cache-aside lookup: return the fresh entry for `key`, or run `compute`
    /// and store its result under the same key.
    pub fn fetch_or_compute<F>(
        &self,
        namespace: &str,
        key: &str,
        compute: F,
    ) -> Result<String, TaxonomyError>
    where
        F: FnOnce() -> Result<String, TaxonomyError>,
    {
        if let Some(hit) = self.lookup(namespace, key) {
            debug!(namespace, key, "cache hit");
            return Ok(hit);
        }
        let content = compute()?;
        self.store(namespace, key, &content)?;
        Ok(content)
    }
}
