//! Hierarchy statistics report

use crate::ontology::Ontology;
use crate::termstats::compute_term_stats;

/// Print a summary of the hierarchy to stdout.
pub fn print_stats(ont: &Ontology) {
    // Basic stats
    println!("Number of terms: {}", ont.num_terms());
    println!("Number of genes: {}", ont.num_genes());
    println!("Number of structural edges: {}", ont.structural_edges().len());
    println!("Number of membership edges: {}", ont.num_membership_edges());
    println!("Root terms: {}", ont.roots().len());
    println!("Leaf terms: {}", ont.term_leaves().len());

    let depths = ont.term_depths();
    let max_depth = depths.values().copied().max().unwrap_or(0);
    println!("Hierarchy depth: {}", max_depth);

    // Term size distribution
    let stats = compute_term_stats(ont);
    let mut sizes: Vec<usize> = stats.values().map(|s| s.size).collect();
    sizes.sort_unstable();

    if !sizes.is_empty() {
        let sum: usize = sizes.iter().sum();
        let mean = sum as f64 / sizes.len() as f64;

        let median = if sizes.len() % 2 == 0 {
            let mid = sizes.len() / 2;
            (sizes[mid - 1] + sizes[mid]) as f64 / 2.0
        } else {
            sizes[sizes.len() / 2] as f64
        };
        println!("\nMean term size: {:.2}", mean);
        println!("Median term size: {:.2}", median);

        let mut ranked: Vec<(u32, usize)> = stats.iter().map(|(&t, s)| (t, s.size)).collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| natord::compare(ont.name(a.0), ont.name(b.0)))
        });

        println!("\nLargest terms:");
        for (idx, (term, size)) in ranked.iter().take(5).enumerate() {
            println!("{}. {}: {} genes", idx + 1, ont.name(*term), size);
        }
    }
}
