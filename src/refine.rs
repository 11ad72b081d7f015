//! Refinement passes and the driver that runs them to a global fixed point
//!
//! Pass order follows the reference pipeline: containment augmentation and
//! parent/child merging alternate until neither changes the graph, then
//! redundant parent/child pairs are collapsed once and shortcuts cleaned a
//! final time. Every pass snapshots its candidate edges before mutating and
//! re-derives them afterwards; nothing iterates a live view of the graph.

use crate::hidef::EdgeType;
use crate::ontology::{HierarchyError, Ontology};
use crate::termstats::{compute_term_stats, containment_index, jaccard_index};
use log::{debug, info};
use rustc_hash::FxHashSet;

/// Thresholds steering the refinement passes.
#[derive(Debug, Clone, Copy)]
pub struct RefineParams {
    /// Containment index at or above which a missing parent-child edge is added.
    pub ci_thre: f64,
    /// Jaccard index at or above which a child is merged into its parent.
    pub ji_thre: f64,
    /// Minimum gene-count difference a parent-child pair must show.
    pub min_diff: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        RefineParams {
            ci_thre: 0.75,
            ji_thre: 0.9,
            min_diff: 1,
        }
    }
}

/// Remove every edge whose endpoints stay connected through a longer path.
///
/// Loops until a full pass removes nothing. Reachability is unchanged; only
/// directly redundant edges disappear. Returns the number of removed edges.
pub fn clean_shortcuts(ont: &mut Ontology) -> usize {
    let mut removed = 0;
    loop {
        let snapshot = ont.edges();
        let mut removed_this_pass = 0;
        for (parent, child, _) in snapshot {
            if ont.count_paths(parent, child, 2) > 1 {
                debug!(
                    "Shortcut edge removed between {} and {}",
                    ont.name(parent),
                    ont.name(child)
                );
                ont.remove_edge(parent, child);
                removed_this_pass += 1;
            }
        }
        removed += removed_this_pass;
        if removed_this_pass == 0 {
            break;
        }
    }
    removed
}

/// Add structural edges implied by gene-set containment, to a fixed point.
///
/// Each pass scans terms by descending descendant size and compares every
/// term against the strictly smaller terms not already below it; qualifying
/// pairs get an edge, and shortcuts are cleaned before the next pass.
/// Returns true if any pass added an edge.
pub fn augment_containment(ont: &mut Ontology, ci_thre: f64) -> bool {
    let mut modified = false;
    let mut pass = 1;
    loop {
        debug!("Starting containment pass {}", pass);
        let stats = compute_term_stats(ont);
        // Larger terms first; ties keep interning order so runs are stable
        let mut order: Vec<u32> = stats.keys().copied().collect();
        order.sort_unstable_by(|a, b| stats[b].size.cmp(&stats[a].size).then(a.cmp(b)));

        let mut added = 0;
        for (i, &large) in order.iter().enumerate() {
            let mut reached: FxHashSet<u32> = stats[&large].descendant_terms.clone();
            for &small in &order[i + 1..] {
                if stats[&small].size >= stats[&large].size {
                    continue;
                }
                if reached.contains(&small) {
                    continue;
                }
                let ci = containment_index(&stats[&large].genes, &stats[&small].genes);
                if ci >= ci_thre {
                    info!(
                        "{} is contained in {} (ci = {:.3}), adding edge",
                        ont.name(small),
                        ont.name(large),
                        ci
                    );
                    ont.add_edge(large, small, EdgeType::Default);
                    reached.insert(small);
                    reached.extend(stats[&small].descendant_terms.iter().copied());
                    added += 1;
                }
            }
        }
        clean_shortcuts(ont);
        if added == 0 {
            break;
        }
        modified = true;
        pass += 1;
    }
    modified
}

/// Merge children that are near-duplicates of a parent, to a fixed point.
///
/// One collapse at a time: node deletion rewires edges non-locally, so the
/// scan restarts from fresh stats after every merge. Returns true if any
/// term was removed.
pub fn merge_similar(ont: &mut Ontology, ji_thre: f64) -> bool {
    let mut merged = false;
    loop {
        let stats = compute_term_stats(ont);
        let candidate = ont
            .structural_edges()
            .into_iter()
            .find(|&(parent, child)| {
                jaccard_index(&stats[&parent].genes, &stats[&child].genes) >= ji_thre
            });
        let Some((parent, child)) = candidate else {
            break;
        };
        info!(
            "Cluster pair {} -> {} highly similar (ji = {:.3}), removing {}",
            ont.name(parent),
            ont.name(child),
            jaccard_index(&stats[&parent].genes, &stats[&child].genes),
            ont.name(child)
        );
        ont.collapse_into_parents(child);
        clean_shortcuts(ont);
        merged = true;
    }
    merged
}

/// Collapse children whose descendant size is within `min_diff` of their
/// parent's. Candidates are re-derived after every collapse; among
/// simultaneous candidates the natural-order minimum (child, parent) pair
/// goes first. Returns the number of removed terms.
pub fn collapse_redundant(ont: &mut Ontology, min_diff: usize) -> usize {
    let mut removed = 0;
    loop {
        let stats = compute_term_stats(ont);
        let mut candidates: Vec<(u32, u32)> = ont
            .structural_edges()
            .into_iter()
            .filter(|&(parent, child)| stats[&parent].size < stats[&child].size + min_diff)
            .collect();
        if candidates.is_empty() {
            if removed == 0 {
                debug!("Nothing to collapse");
            }
            break;
        }
        candidates.sort_by(|&(pa, ca), &(pb, cb)| {
            natord::compare(ont.name(ca), ont.name(cb))
                .then_with(|| natord::compare(ont.name(pa), ont.name(pb)))
        });
        let (parent, child) = candidates[0];
        info!(
            "Cluster pair {} -> {} highly redundant, removing {}",
            ont.name(parent),
            ont.name(child),
            ont.name(child)
        );
        ont.collapse_into_parents(child);
        removed += 1;
    }
    removed
}

/// Run the full refinement pipeline to its global fixed point.
///
/// Fails fast if the structural input is cyclic; a cycle is a fatal input
/// error, never repaired.
pub fn refine(ont: &mut Ontology, params: &RefineParams) -> Result<(), HierarchyError> {
    if !ont.is_acyclic() {
        return Err(HierarchyError::NotADag);
    }
    info!(
        "Refining hierarchy: {} terms, {} genes, {} structural edges",
        ont.num_terms(),
        ont.num_genes(),
        ont.structural_edges().len()
    );

    let mut rounds = 1;
    loop {
        debug!("Starting refinement round {}", rounds);
        let modified = augment_containment(ont, params.ci_thre);
        let merged = merge_similar(ont, params.ji_thre);
        if !modified && !merged {
            break;
        }
        rounds += 1;
    }

    let collapsed = collapse_redundant(ont, params.min_diff);
    clean_shortcuts(ont);
    info!(
        "Refined hierarchy: {} terms, {} structural edges ({} rounds, {} redundant terms collapsed)",
        ont.num_terms(),
        ont.structural_edges().len(),
        rounds,
        collapsed
    );
    Ok(())
}
