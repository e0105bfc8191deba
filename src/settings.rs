use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::TaxonomyError;
use crate::manifest::{VersionManifest, VersionRegistry};

/// A single resolved retrieval unit: where a remote resource lives and where
/// it lands locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadObjective {
    pub path: Utf8PathBuf,
    pub url: String,
}

/// Settings for constructing one version of the taxonomy dataset.
///
/// An owned value transformed by self-consuming methods; misconfiguration
/// (unknown version, unknown capability key) fails at construction or
/// inclusion time, before any network access.
#[derive(Debug, Clone)]
pub struct DatasetSettings {
    manifest: VersionManifest,
    to_include: Vec<String>,
    verbose: bool,
    downloads_directory: Utf8PathBuf,
}

impl DatasetSettings {
    pub fn new(registry: &dyn VersionRegistry, version: &str) -> Result<Self, TaxonomyError> {
        let manifest = registry.load(version)?;
        Ok(Self {
            manifest,
            to_include: Vec::new(),
            verbose: false,
            downloads_directory: Utf8PathBuf::from("downloads"),
        })
    }

    pub fn manifest(&self) -> &VersionManifest {
        &self.manifest
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn included(&self) -> &[String] {
        &self.to_include
    }

    pub fn downloads_directory(&self) -> &Utf8Path {
        &self.downloads_directory
    }

    /// Include a capability key. Fails eagerly when the key is absent from
    /// the manifest; including an already-included key is a no-op.
    pub fn include(mut self, key: &str) -> Result<Self, TaxonomyError> {
        if self.manifest.capability(key).is_none() {
            return Err(TaxonomyError::UnknownCapability {
                key: key.to_string(),
                valid: self.manifest.capability_keys(),
            });
        }
        if !self.to_include.iter().any(|included| included == key) {
            self.to_include.push(key.to_string());
        }
        Ok(self)
    }

    pub fn include_tsv(self) -> Result<Self, TaxonomyError> {
        self.include("tsv")
    }

    pub fn include_json(self) -> Result<Self, TaxonomyError> {
        self.include("json")
    }

    pub fn include_owl(self) -> Result<Self, TaxonomyError> {
        self.include("owl")
    }

    /// Include every capability the manifest declares, in stable key order.
    pub fn include_all(mut self) -> Self {
        for key in self.manifest.capability_keys() {
            if !self.to_include.contains(&key) {
                self.to_include.push(key);
            }
        }
        self
    }

    pub fn set_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn set_downloads_directory(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.downloads_directory = directory.into();
        self
    }

    /// Derive one objective per included key, in inclusion order. Pure path
    /// mapping, no network access. Each objective lands under a
    /// version-scoped subdirectory so versions never collide.
    pub fn download_objectives(&self) -> Result<Vec<DownloadObjective>, TaxonomyError> {
        let mut objectives = Vec::with_capacity(self.to_include.len());
        for key in &self.to_include {
            let url = self.manifest.capability(key).ok_or_else(|| {
                TaxonomyError::UnknownCapability {
                    key: key.clone(),
                    valid: self.manifest.capability_keys(),
                }
            })?;
            let file_name = terminal_segment(url);
            let path = self
                .downloads_directory
                .join(&self.manifest.version)
                .join(file_name);
            objectives.push(DownloadObjective {
                path,
                url: url.to_string(),
            });
        }
        Ok(objectives)
    }

    /// Settings as a plain mapping, for embedding into dataset metadata.
    pub fn to_metadata(&self) -> SettingsMetadata {
        SettingsMetadata {
            version_metadata: self.manifest.clone(),
            verbose: self.verbose,
            to_include: self.to_include.clone(),
            downloads_directory: self.downloads_directory.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsMetadata {
    pub version_metadata: VersionManifest,
    pub verbose: bool,
    pub to_include: Vec<String>,
    pub downloads_directory: String,
}

fn terminal_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::manifest::EmbeddedRegistry;

    #[test]
    fn include_unknown_key_fails_eagerly() {
        let settings = DatasetSettings::new(&EmbeddedRegistry, "2024-07-03").unwrap();
        let err = settings.include("obo").unwrap_err();
        assert_matches!(err, TaxonomyError::UnknownCapability { ref key, ref valid } => {
            assert_eq!(key, "obo");
            assert!(!valid.contains(&"version".to_string()));
            assert!(!valid.contains(&"year".to_string()));
        });
    }

    #[test]
    fn include_is_idempotent() {
        let once = DatasetSettings::new(&EmbeddedRegistry, "2024-07-03")
            .unwrap()
            .include_owl()
            .unwrap();
        let twice = once.clone().include_owl().unwrap();
        assert_eq!(once.included(), twice.included());
    }

    #[test]
    fn objectives_follow_inclusion_order() {
        let settings = DatasetSettings::new(&EmbeddedRegistry, "2024-07-03")
            .unwrap()
            .include_owl()
            .unwrap()
            .include_json()
            .unwrap();
        let objectives = settings.download_objectives().unwrap();
        assert_eq!(objectives.len(), 2);
        assert!(objectives[0].url.ends_with("ncbitaxon.owl"));
        assert!(objectives[1].url.ends_with("ncbitaxon.json"));
        assert!(
            objectives[0]
                .path
                .starts_with("downloads/2024-07-03")
        );
    }
}
