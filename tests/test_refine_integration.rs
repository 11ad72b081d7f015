//! Integration test for the full hiref pipeline: read hidef tables, build
//! the hierarchy graph, refine it, write the pruned ontology tables, and
//! read them back.

use hiref::hidef;
use hiref::ontology::{HierarchyError, Ontology};
use hiref::refine::{refine, RefineParams};
use hiref::termstats::compute_term_stats;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use tempfile::TempDir;

const NODES: &str = "\
Cluster0-0\t12\tg1 g2 g3 g4 g5 g6 g7 g8 g9 g10 g11 g12\t1.0
Cluster1-0\t11\tg1 g2 g3 g4 g5 g6 g7 g8 g9 g10 g11\t0.9
Cluster1-1\t6\tg7 g8 g9 g10 g11 g12\t0.8
Cluster2-0\t4\tg1 g2 g3 g4\t0.7
";

const EDGES: &str = "\
Cluster0-0\tCluster1-0\tdefault
Cluster0-0\tCluster1-1\tdefault
Cluster1-0\tCluster2-0\tdefault
";

fn write_hierarchy(dir: &TempDir, name: &str) -> std::io::Result<String> {
    let prefix = dir.path().join(name).to_str().unwrap().to_string();
    fs::write(format!("{}.nodes", prefix), NODES)?;
    fs::write(format!("{}.edges", prefix), EDGES)?;
    Ok(prefix)
}

fn load_and_refine(prefix: &str, min_term_size: usize) -> std::io::Result<Ontology> {
    let nodes = hidef::read_nodes(&format!("{}.nodes", prefix))?;
    let edges = hidef::read_edges(&format!("{}.edges", prefix))?;
    let mut ont = Ontology::build(&nodes, &edges, min_term_size).unwrap();
    refine(&mut ont, &RefineParams::default()).unwrap();
    Ok(ont)
}

#[test]
fn test_full_pipeline() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let prefix = write_hierarchy(&temp_dir, "hier")?;

    // Step 1: Build and refine. Cluster1-0 covers Cluster1-1 (ci = 5/6) and
    // then duplicates the root (ji above 0.9), so it gets merged away.
    let ont = load_and_refine(&prefix, 4)?;
    assert!(ont.is_acyclic());
    assert_eq!(ont.num_terms(), 3);
    assert!(ont.term_id("Cluster1-0").is_none());

    // The root must still reach every input gene
    let root = ont.term_id("Cluster0-0").unwrap();
    let stats = compute_term_stats(&ont);
    assert_eq!(stats[&root].size, 12);

    // No surviving edge is implied by a longer path
    for (parent, child, _) in ont.edges() {
        assert_eq!(ont.count_paths(parent, child, 2), 1);
    }

    // Step 2: Write the pruned tables
    let out_prefix = format!("{}_pruned", prefix);
    let (node_rows, edge_rows) = hidef::ontology_rows(&ont);
    let mut writer = BufWriter::new(File::create(format!("{}.nodes", out_prefix))?);
    hidef::write_nodes(&mut writer, &node_rows)?;
    writer.flush()?;
    let mut writer = BufWriter::new(File::create(format!("{}.edges", out_prefix))?);
    hidef::write_edges(&mut writer, &edge_rows)?;
    writer.flush()?;

    let nodes_out = fs::read_to_string(format!("{}.nodes", out_prefix))?;
    let edges_out = fs::read_to_string(format!("{}.edges", out_prefix))?;
    assert_eq!(nodes_out.lines().count(), 3);
    assert_eq!(edges_out.lines().count(), 2);
    // Gene columns are sorted, sizes recomputed, log2 column appended
    assert!(nodes_out.contains("Cluster2-0\t4\tg1 g2 g3 g4\t2"));
    assert!(edges_out.contains("Cluster0-0\tCluster1-1\tdefault"));
    assert!(edges_out.contains("Cluster0-0\tCluster2-0\tdefault"));

    // Step 3: The pruned tables load back and refine to the same snapshot
    let reread_nodes = hidef::read_nodes(&format!("{}.nodes", out_prefix))?;
    let reread_edges = hidef::read_edges(&format!("{}.edges", out_prefix))?;
    let mut rebuilt = Ontology::build(&reread_nodes, &reread_edges, 4).unwrap();
    refine(&mut rebuilt, &RefineParams::default()).unwrap();
    let (rebuilt_node_rows, rebuilt_edge_rows) = hidef::ontology_rows(&rebuilt);
    assert_eq!(rebuilt_node_rows, node_rows);
    assert_eq!(rebuilt_edge_rows, edge_rows);

    Ok(())
}

#[test]
fn test_min_size_filter_prunes_terms_and_edges() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let prefix = write_hierarchy(&temp_dir, "hier")?;

    // Only the two largest terms survive a cutoff of 7, and the smaller one
    // duplicates the root closely enough (ji = 11/12) to be merged
    let ont = load_and_refine(&prefix, 7)?;
    assert_eq!(ont.num_terms(), 1);

    let root = ont.term_id("Cluster0-0").unwrap();
    let stats = compute_term_stats(&ont);
    assert_eq!(stats[&root].size, 12);

    Ok(())
}

#[test]
fn test_empty_hierarchy_is_reported() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let prefix = write_hierarchy(&temp_dir, "hier")?;

    let nodes = hidef::read_nodes(&format!("{}.nodes", prefix))?;
    let edges = hidef::read_edges(&format!("{}.edges", prefix))?;
    assert_eq!(
        Ontology::build(&nodes, &edges, 20).unwrap_err(),
        HierarchyError::EmptyHierarchy
    );

    Ok(())
}

#[test]
fn test_cyclic_input_is_fatal() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let prefix = temp_dir.path().join("cyclic").to_str().unwrap().to_string();
    fs::write(
        format!("{}.nodes", prefix),
        "A\t4\tg1 g2 g3 g4\t1.0\nB\t4\tg1 g2 g3 g4\t1.0\n",
    )?;
    fs::write(
        format!("{}.edges", prefix),
        "A\tB\tdefault\nB\tA\tdefault\n",
    )?;

    let nodes = hidef::read_nodes(&format!("{}.nodes", prefix))?;
    let edges = hidef::read_edges(&format!("{}.edges", prefix))?;
    let mut ont = Ontology::build(&nodes, &edges, 4).unwrap();
    assert_eq!(
        refine(&mut ont, &RefineParams::default()).unwrap_err(),
        HierarchyError::NotADag
    );

    Ok(())
}
