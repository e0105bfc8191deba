use std::collections::BTreeMap;
use std::fs;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::TaxonomyError;

/// Fixed metadata fields every manifest carries. These are never valid
/// capability keys and never become download objectives.
pub const RESERVED_KEYS: [&str; 4] = ["version", "year", "month", "day"];

/// Per-version declarative listing of fetchable capability keys and their
/// remote locators, e.g. `{"version": "2024-07-03", ..., "owl": "http://..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version: String,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    #[serde(flatten)]
    capabilities: BTreeMap<String, String>,
}

impl VersionManifest {
    pub fn capability(&self, key: &str) -> Option<&str> {
        if RESERVED_KEYS.contains(&key) {
            return None;
        }
        self.capabilities.get(key).map(String::as_str)
    }

    /// Capability keys in stable (sorted) order, fixed metadata excluded.
    pub fn capability_keys(&self) -> Vec<String> {
        self.capabilities
            .keys()
            .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
            .cloned()
            .collect()
    }
}

/// Storage abstraction for version manifests so the backend (filesystem,
/// embedded releases) stays swappable.
pub trait VersionRegistry {
    fn available_versions(&self) -> Vec<String>;
    fn load(&self, version: &str) -> Result<VersionManifest, TaxonomyError>;
}

/// Registry reading `<version>.json` or `<version>.json.gz` documents from a
/// directory.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: Utf8PathBuf,
}

impl FsRegistry {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_document(&self, version: &str) -> Option<Result<String, TaxonomyError>> {
        let plain = self.root.join(format!("{version}.json"));
        if plain.as_std_path().exists() {
            return Some(
                fs::read_to_string(plain.as_std_path())
                    .map_err(|err| TaxonomyError::Filesystem(err.to_string())),
            );
        }
        let gzipped = self.root.join(format!("{version}.json.gz"));
        if gzipped.as_std_path().exists() {
            let result = fs::read(gzipped.as_std_path())
                .map_err(|err| TaxonomyError::Filesystem(err.to_string()))
                .and_then(|bytes| {
                    let mut decoder = GzDecoder::new(bytes.as_slice());
                    let mut text = String::new();
                    decoder
                        .read_to_string(&mut text)
                        .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
                    Ok(text)
                });
            return Some(result);
        }
        None
    }
}

impl VersionRegistry for FsRegistry {
    fn available_versions(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root.as_std_path()) else {
            return Vec::new();
        };
        let mut versions: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_suffix(".json.gz")
                    .or_else(|| name.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    fn load(&self, version: &str) -> Result<VersionManifest, TaxonomyError> {
        let Some(document) = self.read_document(version) else {
            return Err(TaxonomyError::VersionNotFound {
                version: version.to_string(),
                available: self.available_versions(),
            });
        };
        parse_manifest(version, &document?)
    }
}

/// Release manifests bundled into the binary, so `lotus-taxo` works without a
/// versions directory on disk.
const EMBEDDED_RELEASES: &[(&str, &str)] = &[
    ("2023-12-14", include_str!("../versions/2023-12-14.json")),
    ("2024-07-03", include_str!("../versions/2024-07-03.json")),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedRegistry;

impl VersionRegistry for EmbeddedRegistry {
    fn available_versions(&self) -> Vec<String> {
        EMBEDDED_RELEASES
            .iter()
            .map(|(version, _)| version.to_string())
            .collect()
    }

    fn load(&self, version: &str) -> Result<VersionManifest, TaxonomyError> {
        let Some((_, document)) = EMBEDDED_RELEASES
            .iter()
            .find(|(candidate, _)| *candidate == version)
        else {
            return Err(TaxonomyError::VersionNotFound {
                version: version.to_string(),
                available: self.available_versions(),
            });
        };
        parse_manifest(version, document)
    }
}

fn parse_manifest(version: &str, document: &str) -> Result<VersionManifest, TaxonomyError> {
    let manifest: VersionManifest =
        serde_json::from_str(document).map_err(|err| TaxonomyError::InvalidManifest {
            version: version.to_string(),
            message: err.to_string(),
        })?;
    if manifest.version != version {
        return Err(TaxonomyError::InvalidManifest {
            version: version.to_string(),
            message: format!("document declares version {}", manifest.version),
        });
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_versions_load() {
        let registry = EmbeddedRegistry;
        for version in registry.available_versions() {
            let manifest = registry.load(&version).unwrap();
            assert_eq!(manifest.version, version);
            assert!(!manifest.capability_keys().is_empty());
        }
    }

    #[test]
    fn capability_lookup_excludes_reserved() {
        let manifest = EmbeddedRegistry.load("2024-07-03").unwrap();
        assert!(manifest.capability("version").is_none());
        assert!(!manifest.capability_keys().contains(&"year".to_string()));
    }
}
