use std::fs;
use std::io::Write;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;

use lotus_taxonomy::error::TaxonomyError;
use lotus_taxonomy::manifest::{FsRegistry, VersionRegistry};

const DOCUMENT_2024: &str = r#"{
    "version": "2024",
    "year": 2024,
    "month": 6,
    "day": 1,
    "json": "http://x/a.json",
    "tsv": "http://x/b.tsv"
}"#;

#[test]
fn fs_registry_lists_and_loads_versions() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("2024.json"), DOCUMENT_2024).unwrap();

    let document_2023 = DOCUMENT_2024.replace("2024", "2023");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document_2023.as_bytes()).unwrap();
    fs::write(temp.path().join("2023.json.gz"), encoder.finish().unwrap()).unwrap();

    let registry = FsRegistry::new(temp.path().to_str().unwrap());
    assert_eq!(registry.available_versions(), vec!["2023", "2024"]);

    let manifest = registry.load("2024").unwrap();
    assert_eq!(manifest.capability("json"), Some("http://x/a.json"));
    assert_eq!(manifest.year, 2024);

    let gzipped = registry.load("2023").unwrap();
    assert_eq!(gzipped.version, "2023");
}

#[test]
fn missing_version_enumerates_available() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("2024.json"), DOCUMENT_2024).unwrap();

    let registry = FsRegistry::new(temp.path().to_str().unwrap());
    let err = registry.load("1999").unwrap_err();
    assert_matches!(err, TaxonomyError::VersionNotFound { ref version, ref available } => {
        assert_eq!(version, "1999");
        assert_eq!(available, &vec!["2024".to_string()]);
    });
}

#[test]
fn version_mismatch_is_invalid() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("2025.json"), DOCUMENT_2024).unwrap();

    let registry = FsRegistry::new(temp.path().to_str().unwrap());
    let err = registry.load("2025").unwrap_err();
    assert_matches!(err, TaxonomyError::InvalidManifest { .. });
}
