//! Per-term descendant statistics
//!
//! Recomputed from scratch between refinement passes: node deletion changes
//! reachability non-locally, so incremental updates are not safe.

use crate::ontology::Ontology;
use rustc_hash::{FxHashMap, FxHashSet};

pub struct TermStats {
    /// Genes reachable from the term through any path.
    pub genes: FxHashSet<u32>,
    /// Number of reachable genes.
    pub size: usize,
    /// Terms reachable from the term (genes excluded).
    pub descendant_terms: FxHashSet<u32>,
}

pub type TermStatsMap = FxHashMap<u32, TermStats>;

/// Compute descendant stats for every term of the current graph.
pub fn compute_term_stats(ont: &Ontology) -> TermStatsMap {
    let mut stats = TermStatsMap::default();
    for t in ont.term_ids() {
        let mut genes = FxHashSet::default();
        let mut descendant_terms = FxHashSet::default();
        for n in ont.descendants(t) {
            if ont.is_gene(n) {
                genes.insert(n);
            } else {
                descendant_terms.insert(n);
            }
        }
        let size = genes.len();
        stats.insert(
            t,
            TermStats {
                genes,
                size,
                descendant_terms,
            },
        );
    }
    stats
}

/// Fraction of the smaller gene set covered by the larger one.
pub fn containment_index(larger: &FxHashSet<u32>, smaller: &FxHashSet<u32>) -> f64 {
    if smaller.is_empty() {
        return 0.0;
    }
    let intersection = smaller.iter().filter(|g| larger.contains(g)).count();
    intersection as f64 / smaller.len() as f64
}

/// Jaccard index of two gene sets.
pub fn jaccard_index(a: &FxHashSet<u32>, b: &FxHashSet<u32>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hidef::{EdgeRecord, EdgeType, NodeRecord};

    fn set(ids: &[u32]) -> FxHashSet<u32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_containment_index() {
        assert_eq!(containment_index(&set(&[1, 2, 3, 4]), &set(&[1, 2, 3])), 1.0);
        assert_eq!(containment_index(&set(&[1, 2]), &set(&[3, 4])), 0.0);
        assert_eq!(containment_index(&set(&[1, 2, 3]), &set(&[2, 3, 5, 6])), 0.5);
        assert_eq!(containment_index(&set(&[1]), &set(&[])), 0.0);
    }

    #[test]
    fn test_jaccard_index() {
        assert_eq!(jaccard_index(&set(&[1, 2, 3]), &set(&[1, 2, 3])), 1.0);
        assert_eq!(jaccard_index(&set(&[1, 2]), &set(&[3, 4])), 0.0);
        // 9 shared of 10 total
        let a = set(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let b = set(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(jaccard_index(&a, &b) >= 0.9);
        assert_eq!(jaccard_index(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn test_stats_are_unions_over_descendants() {
        let nodes = vec![
            NodeRecord {
                term: "Root".to_string(),
                size: 4,
                genes: vec!["g1", "g2", "g3", "g4"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                stability: 1.0,
            },
            NodeRecord {
                term: "Child".to_string(),
                size: 2,
                genes: vec!["g1", "g2"].into_iter().map(String::from).collect(),
                stability: 1.0,
            },
        ];
        let edges = vec![EdgeRecord {
            parent: "Root".to_string(),
            child: "Child".to_string(),
            edge_type: EdgeType::Default,
        }];
        let ont = Ontology::build(&nodes, &edges, 1).unwrap();
        let stats = compute_term_stats(&ont);

        let root = ont.term_id("Root").unwrap();
        let child = ont.term_id("Child").unwrap();
        assert_eq!(stats[&root].size, 4);
        assert_eq!(stats[&child].size, 2);
        assert!(stats[&root].descendant_terms.contains(&child));
        assert!(stats[&child].descendant_terms.is_empty());
        // The child's genes are a subset of the root's
        assert!(stats[&child].genes.is_subset(&stats[&root].genes));
    }
}
