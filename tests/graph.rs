use std::collections::BTreeSet;

use assert_matches::assert_matches;

use lotus_taxonomy::error::TaxonomyError;
use lotus_taxonomy::graph::TaxonomyGraph;
use lotus_taxonomy::records::TaxonRecord;

fn record(taxon: &str, parent: &str, rank_label: &str) -> TaxonRecord {
    TaxonRecord {
        taxon: taxon.to_string(),
        taxon_name: format!("{taxon} name"),
        taxon_rank: format!("rank-{rank_label}"),
        taxon_rank_label: rank_label.to_string(),
        taxon_parent: parent.to_string(),
        parent_name: format!("{parent} name"),
    }
}

#[test]
fn every_walk_terminates_at_a_root() {
    let records = vec![
        record("leo", "panthera", "species"),
        record("tigris", "panthera", "species"),
        record("panthera", "felidae", "genus"),
        record("lupus", "canis", "species"),
        record("canis", "canidae", "genus"),
    ];
    let graph = TaxonomyGraph::assemble(&records, &BTreeSet::new()).unwrap();

    assert_eq!(graph.roots(), ["canidae", "felidae"]);
    for taxon in ["leo", "tigris", "panthera", "lupus", "canis"] {
        let mut current = taxon;
        let mut steps = 0;
        while let Some(parent) = graph.parent_of(current) {
            current = parent;
            steps += 1;
            assert!(steps <= graph.len(), "walk from {taxon} does not terminate");
        }
        assert!(graph.roots().contains(&current));
    }
}

#[test]
fn assembly_is_order_independent() {
    let mut records = vec![
        record("leo", "panthera", "species"),
        record("panthera", "felidae", "genus"),
        record("felidae", "carnivora", "family"),
    ];
    let forward = TaxonomyGraph::assemble(&records, &BTreeSet::new()).unwrap();
    records.reverse();
    let backward = TaxonomyGraph::assemble(&records, &BTreeSet::new()).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn three_node_cycle_names_the_offenders() {
    let records = vec![
        record("A", "B", "species"),
        record("B", "C", "genus"),
        record("C", "A", "family"),
    ];
    let err = TaxonomyGraph::assemble(&records, &BTreeSet::new()).unwrap_err();
    assert_matches!(err, TaxonomyError::CyclicTaxonomy { ref cycle } => {
        assert_eq!(cycle.first(), cycle.last());
        for node in ["A", "B", "C"] {
            assert!(cycle.iter().any(|member| member == node));
        }
    });
}

#[test]
fn collapse_skips_chains_of_excluded_nodes() {
    let records = vec![
        record("A", "B", "species"),
        record("B", "C", "subspecies"),
        record("C", "D", "subspecies"),
        record("D", "E", "genus"),
    ];
    let exclude: BTreeSet<String> = ["subspecies".to_string()].into();
    let graph = TaxonomyGraph::assemble(&records, &exclude).unwrap();

    assert!(!graph.contains("B"));
    assert!(!graph.contains("C"));
    assert_eq!(graph.parent_of("A"), Some("D"));
    assert_eq!(graph.parent_of("D"), Some("E"));
    assert_eq!(graph.len(), 3);
}

#[test]
fn collapse_preserves_names_and_ranks_of_kept_nodes() {
    let records = vec![
        record("A", "B", "species"),
        record("B", "C", "subspecies"),
        record("C", "D", "genus"),
    ];
    let exclude: BTreeSet<String> = ["subspecies".to_string()].into();
    let graph = TaxonomyGraph::assemble(&records, &exclude).unwrap();

    assert_eq!(graph.name_of("A"), Some("A name"));
    assert_eq!(graph.rank_label_of("A"), Some("species"));
    assert!(graph.name_of("B").is_none());
}

#[test]
fn empty_input_gives_empty_graph() {
    let graph = TaxonomyGraph::assemble(&[], &BTreeSet::new()).unwrap();
    assert!(graph.is_empty());
    assert!(graph.roots().is_empty());
}
