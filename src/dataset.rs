use std::fs;
use std::time::Duration;

use rayon::prelude::*;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::TaxonomyError;
use crate::settings::{DatasetSettings, DownloadObjective, SettingsMetadata};

/// Retrieval collaborator. Receives the full batch in one call and owns
/// parallelism and any retry policy.
pub trait Downloader: Send + Sync {
    fn download(&self, objectives: &[DownloadObjective]) -> Result<(), TaxonomyError>;
}

pub struct HttpDownloader {
    client: Client,
    process_number: usize,
    verbose: bool,
}

impl HttpDownloader {
    pub fn new(process_number: usize, verbose: bool) -> Result<Self, TaxonomyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lotus-taxo/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TaxonomyError::DownloadFailed(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| TaxonomyError::DownloadFailed(err.to_string()))?;
        Ok(Self {
            client,
            process_number: process_number.max(1),
            verbose,
        })
    }

    fn download_one(&self, objective: &DownloadObjective) -> Result<(), TaxonomyError> {
        if self.verbose {
            info!(url = %objective.url, path = %objective.path, "downloading");
        }
        let mut response = self
            .client
            .get(&objective.url)
            .send()
            .map_err(|err| TaxonomyError::DownloadFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(TaxonomyError::DownloadFailed(format!(
                "{} returned status {}",
                objective.url,
                response.status().as_u16()
            )));
        }

        let parent = objective
            .path
            .parent()
            .ok_or_else(|| TaxonomyError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".download")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut temp)
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        temp.persist(objective.path.as_std_path())
            .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
        debug!(path = %objective.path, "stored");
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, objectives: &[DownloadObjective]) -> Result<(), TaxonomyError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.process_number)
            .build()
            .map_err(|err| TaxonomyError::DownloadFailed(err.to_string()))?;
        let failures: Vec<String> = pool.install(|| {
            objectives
                .par_iter()
                .filter_map(|objective| {
                    self.download_one(objective)
                        .err()
                        .map(|err| format!("{}: {err}", objective.url))
                })
                .collect()
        });
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TaxonomyError::DownloadFailed(failures.join("; ")))
        }
    }
}

/// A fully retrieved taxonomy dataset version.
///
/// Only produced after every objective completed; a partially retrieved batch
/// never yields a `Dataset`.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    metadata: DatasetMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetadata {
    pub settings: SettingsMetadata,
    pub built_at: String,
}

impl Dataset {
    pub fn build(
        settings: &DatasetSettings,
        downloader: &dyn Downloader,
    ) -> Result<Self, TaxonomyError> {
        let objectives = settings.download_objectives()?;
        info!(
            version = %settings.manifest().version,
            objectives = objectives.len(),
            "building taxonomy dataset"
        );
        downloader.download(&objectives)?;
        Ok(Self {
            metadata: DatasetMetadata {
                settings: settings.to_metadata(),
                built_at: chrono::Utc::now().to_rfc3339(),
            },
        })
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }
}
