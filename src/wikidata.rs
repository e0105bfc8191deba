use std::collections::{BTreeMap, BTreeSet};

use crate::cache::QueryCache;
use crate::error::TaxonomyError;
use crate::graph::TaxonomyGraph;
use crate::records::{
    OccurrenceRecord, cached_occurrence_records, cached_taxon_records,
};
use crate::sparql::{QLEVER_URL, QueryMethod, SparqlClient, cached_query_text};

/// Wikidata entity for the rank "subspecies".
pub const SUBSPECIES_RANK_ENTITY: &str = "Q68947";

const SUBSPECIES_RANK_LABEL: &str = "subspecies";

/// Query returning every taxon descending from `root_entity` together with
/// its direct parent, scientific name and rank. Without subspecies, taxa of
/// rank subspecies are filtered in the query itself.
pub fn taxonomy_query(root_entity: &str, with_subspecies: bool) -> String {
    let rank_filter = if with_subspecies {
        String::new()
    } else {
        format!("  FILTER (?taxon_rank != wd:{SUBSPECIES_RANK_ENTITY})\n")
    };
    format!(
        "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX wd: <http://www.wikidata.org/entity/>
SELECT ?taxon ?taxon_name ?taxon_rank ?taxon_rank_label ?taxon_parent ?parent_name WHERE {{
  ?taxon wdt:P225 ?taxon_name ;
         wdt:P105 ?taxon_rank ;
         wdt:P171* wd:{root_entity} ;
         wdt:P171 ?taxon_parent .
  ?taxon_rank rdfs:label ?taxon_rank_label .
  FILTER (LANG(?taxon_rank_label) = \"en\")
{rank_filter}  ?taxon_parent wdt:P225 ?parent_name .
}}"
    )
}

/// Query returning structures with the taxa they occur in and the reference
/// establishing the occurrence.
pub fn occurrences_query() -> &'static str {
    "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX p: <http://www.wikidata.org/prop/>
PREFIX ps: <http://www.wikidata.org/prop/statement/>
PREFIX pr: <http://www.wikidata.org/prop/reference/>
PREFIX prov: <http://www.w3.org/ns/prov#>
SELECT DISTINCT ?structure ?structure_inchikey ?taxon ?taxon_name ?reference ?reference_doi WHERE {
  ?structure wdt:P235 ?structure_inchikey ;
             p:P703 ?taxon_statement .
  ?taxon_statement ps:P703 ?taxon .
  ?taxon_statement prov:wasDerivedFrom ?ref_node .
  ?ref_node pr:P248 ?reference .
  ?taxon wdt:P225 ?taxon_name .
  ?reference wdt:P356 ?reference_doi .
}"
}

/// Fetch and assemble the taxonomy below `root_entity`, e.g. `Q7377` for
/// mammals. When `with_subspecies` is false, subspecies are both filtered in
/// the query and collapsed out of the assembled hierarchy.
pub fn taxonomy_from_root(
    cache: &QueryCache,
    client: &dyn SparqlClient,
    root_entity: &str,
    with_subspecies: bool,
) -> Result<TaxonomyGraph, TaxonomyError> {
    let query = taxonomy_query(root_entity, with_subspecies);
    let raw_text = cached_query_text(cache, client, &query, QLEVER_URL, QueryMethod::Get)?;
    let records = cached_taxon_records(cache, &raw_text)?;
    let exclude_ranks: BTreeSet<String> = if with_subspecies {
        BTreeSet::new()
    } else {
        [SUBSPECIES_RANK_LABEL.to_string()].into()
    };
    TaxonomyGraph::assemble(&records, &exclude_ranks)
}

/// Flat taxon-to-direct-parent mapping below `root_entity`.
pub fn taxon_parent_map(
    cache: &QueryCache,
    client: &dyn SparqlClient,
    root_entity: &str,
    with_subspecies: bool,
) -> Result<BTreeMap<String, String>, TaxonomyError> {
    Ok(taxonomy_from_root(cache, client, root_entity, with_subspecies)?.into_parent_map())
}

/// Fetch the LOTUS structure/taxon/reference occurrence table.
pub fn lotus_occurrences(
    cache: &QueryCache,
    client: &dyn SparqlClient,
) -> Result<Vec<OccurrenceRecord>, TaxonomyError> {
    let raw_text =
        cached_query_text(cache, client, occurrences_query(), QLEVER_URL, QueryMethod::Get)?;
    cached_occurrence_records(cache, &raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_subspecies_by_default() {
        let query = taxonomy_query("Q7377", false);
        assert!(query.contains("FILTER (?taxon_rank != wd:Q68947)"));
        assert!(query.contains("wdt:P171* wd:Q7377"));
    }

    #[test]
    fn query_keeps_subspecies_when_requested() {
        let query = taxonomy_query("Q7377", true);
        assert!(!query.contains("Q68947"));
    }
}
