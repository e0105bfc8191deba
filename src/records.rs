use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{QueryCache, exact_hash};
use crate::error::TaxonomyError;

/// One taxon-to-parent row from a taxonomy query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub taxon: String,
    pub taxon_name: String,
    pub taxon_rank: String,
    pub taxon_rank_label: String,
    pub taxon_parent: String,
    pub parent_name: String,
}

/// One structure-in-taxon occurrence row from the LOTUS query, with the
/// reference that links them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    pub structure: String,
    pub structure_inchikey: String,
    pub taxon: String,
    pub taxon_name: String,
    pub reference: String,
    pub reference_doi: String,
}

const TAXON_COLUMNS: [&str; 6] = [
    "taxon",
    "taxon_name",
    "taxon_rank",
    "taxon_rank_label",
    "taxon_parent",
    "parent_name",
];

const OCCURRENCE_COLUMNS: [&str; 6] = [
    "structure",
    "structure_inchikey",
    "taxon",
    "taxon_name",
    "reference",
    "reference_doi",
];

pub fn parse_taxon_records(raw_text: &str) -> Result<Vec<TaxonRecord>, TaxonomyError> {
    parse_csv(raw_text, &TAXON_COLUMNS)
}

pub fn parse_occurrence_records(raw_text: &str) -> Result<Vec<OccurrenceRecord>, TaxonomyError> {
    parse_csv(raw_text, &OCCURRENCE_COLUMNS)
}

fn parse_csv<T: DeserializeOwned>(
    raw_text: &str,
    required: &[&str],
) -> Result<Vec<T>, TaxonomyError> {
    let mut reader = csv::Reader::from_reader(raw_text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| TaxonomyError::MalformedQueryResult(err.to_string()))?
        .clone();
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            return Err(TaxonomyError::MalformedQueryResult(format!(
                "missing column {column} (found: {})",
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }
    }
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| TaxonomyError::MalformedQueryResult(err.to_string()))
}

/// Parse taxonomy rows through the cache. The key is an exact hash of the raw
/// text and the namespace carries the parser identity, so this memo can never
/// collide with the raw-text query cache.
pub fn cached_taxon_records(
    cache: &QueryCache,
    raw_text: &str,
) -> Result<Vec<TaxonRecord>, TaxonomyError> {
    cached_records(cache, "parse_taxon_records", raw_text, parse_taxon_records)
}

pub fn cached_occurrence_records(
    cache: &QueryCache,
    raw_text: &str,
) -> Result<Vec<OccurrenceRecord>, TaxonomyError> {
    cached_records(
        cache,
        "parse_occurrence_records",
        raw_text,
        parse_occurrence_records,
    )
}

fn cached_records<T>(
    cache: &QueryCache,
    namespace: &str,
    raw_text: &str,
    parse: fn(&str) -> Result<Vec<T>, TaxonomyError>,
) -> Result<Vec<T>, TaxonomyError>
where
    T: Serialize + DeserializeOwned,
{
    let key = exact_hash(raw_text);
    if let Some(stored) = cache.lookup(namespace, &key) {
        if let Ok(records) = serde_json::from_str::<Vec<T>>(&stored) {
            debug!(namespace, "reusing memoized parse result");
            return Ok(records);
        }
    }
    let records = parse(raw_text)?;
    let serialized = serde_json::to_string(&records)
        .map_err(|err| TaxonomyError::Filesystem(err.to_string()))?;
    cache.store(namespace, &key, &serialized)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SAMPLE: &str = "\
taxon,taxon_name,taxon_rank,taxon_rank_label,taxon_parent,parent_name
Q140,Panthera leo,Q7432,species,Q127960,Panthera
Q127960,Panthera,Q34740,genus,Q25306,Felidae
";

    #[test]
    fn parse_taxon_rows() {
        let records = parse_taxon_records(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].taxon, "Q140");
        assert_eq!(records[0].taxon_parent, "Q127960");
        assert_eq!(records[1].taxon_rank_label, "genus");
    }

    #[test]
    fn missing_column_is_malformed() {
        let err = parse_taxon_records("taxon,taxon_name\nQ140,lion\n").unwrap_err();
        assert_matches!(err, TaxonomyError::MalformedQueryResult(ref message) => {
            assert!(message.contains("taxon_rank"));
        });
    }
}
