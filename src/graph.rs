use std::collections::{BTreeMap, BTreeSet};

use crate::error::TaxonomyError;
use crate::records::TaxonRecord;

/// Directed taxon-to-parent hierarchy.
///
/// Forest invariant: every node carries at most one parent edge and no walk
/// along parent edges revisits a node. `assemble` is the only constructor and
/// refuses input violating either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyGraph {
    nodes: BTreeSet<String>,
    parents: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
    rank_labels: BTreeMap<String, String>,
}

impl TaxonomyGraph {
    /// Build the hierarchy from flat parent/child rows.
    ///
    /// Edge conflicts are rejected incrementally, first writer wins, so the
    /// offending pair of records is named the moment it appears. Nodes whose
    /// rank label is in `exclude_ranks` are removed after validation, with
    /// their children re-linked to the nearest remaining ancestor
    /// (rank-skipping collapse); children of a rootless excluded node become
    /// roots.
    pub fn assemble(
        records: &[TaxonRecord],
        exclude_ranks: &BTreeSet<String>,
    ) -> Result<Self, TaxonomyError> {
        let mut graph = Self::default();

        for record in records {
            graph.nodes.insert(record.taxon.clone());
            graph.nodes.insert(record.taxon_parent.clone());
            graph
                .names
                .entry(record.taxon.clone())
                .or_insert_with(|| record.taxon_name.clone());
            graph
                .names
                .entry(record.taxon_parent.clone())
                .or_insert_with(|| record.parent_name.clone());
            graph
                .rank_labels
                .entry(record.taxon.clone())
                .or_insert_with(|| record.taxon_rank_label.clone());

            match graph.parents.get(&record.taxon) {
                None => {
                    graph
                        .parents
                        .insert(record.taxon.clone(), record.taxon_parent.clone());
                }
                Some(existing) if *existing == record.taxon_parent => {}
                Some(existing) => {
                    return Err(TaxonomyError::MultipleParents {
                        taxon: record.taxon.clone(),
                        existing: existing.clone(),
                        conflicting: record.taxon_parent.clone(),
                    });
                }
            }
        }

        graph.check_acyclic()?;
        graph.collapse_excluded(exclude_ranks);
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), TaxonomyError> {
        for start in &self.nodes {
            let mut visited: BTreeSet<&str> = BTreeSet::new();
            let mut path: Vec<&str> = Vec::new();
            let mut current = start.as_str();
            loop {
                if !visited.insert(current) {
                    let offset = path
                        .iter()
                        .position(|node| *node == current)
                        .unwrap_or_default();
                    let mut cycle: Vec<String> =
                        path[offset..].iter().map(|node| node.to_string()).collect();
                    cycle.push(current.to_string());
                    return Err(TaxonomyError::CyclicTaxonomy { cycle });
                }
                path.push(current);
                match self.parents.get(current) {
                    Some(parent) => current = parent.as_str(),
                    None => break,
                }
            }
        }
        Ok(())
    }

    fn collapse_excluded(&mut self, exclude_ranks: &BTreeSet<String>) {
        if exclude_ranks.is_empty() {
            return;
        }
        let excluded: BTreeSet<String> = self
            .rank_labels
            .iter()
            .filter(|(_, label)| exclude_ranks.contains(*label))
            .map(|(taxon, _)| taxon.clone())
            .collect();
        if excluded.is_empty() {
            return;
        }

        // Relink targets come from the pre-collapse edge set.
        let mut relinked = BTreeMap::new();
        for (taxon, _) in &self.parents {
            if excluded.contains(taxon) {
                continue;
            }
            if let Some(ancestor) = self.nearest_remaining_ancestor(taxon, &excluded) {
                relinked.insert(taxon.clone(), ancestor);
            }
        }

        self.parents = relinked;
        for taxon in &excluded {
            self.nodes.remove(taxon);
            self.names.remove(taxon);
            self.rank_labels.remove(taxon);
        }
    }

    fn nearest_remaining_ancestor(
        &self,
        taxon: &str,
        excluded: &BTreeSet<String>,
    ) -> Option<String> {
        let mut current = self.parents.get(taxon)?;
        while excluded.contains(current) {
            current = self.parents.get(current)?;
        }
        Some(current.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, taxon: &str) -> bool {
        self.nodes.contains(taxon)
    }

    pub fn parent_of(&self, taxon: &str) -> Option<&str> {
        self.parents.get(taxon).map(String::as_str)
    }

    pub fn name_of(&self, taxon: &str) -> Option<&str> {
        self.names.get(taxon).map(String::as_str)
    }

    pub fn rank_label_of(&self, taxon: &str) -> Option<&str> {
        self.rank_labels.get(taxon).map(String::as_str)
    }

    /// Nodes without a parent edge, in sorted order.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| !self.parents.contains_key(*node))
            .map(String::as_str)
            .collect()
    }

    /// Flat taxon-to-parent mapping, consuming the graph.
    pub fn into_parent_map(self) -> BTreeMap<String, String> {
        self.parents
    }
}
