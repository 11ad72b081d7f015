//! Owned, mutable hierarchy graph
//!
//! Terms and genes are nodes of one directed graph. Structural (`default`)
//! edges connect terms; membership (`gene`) edges connect a term to a gene
//! it owns directly. All refinement passes mutate the graph through the
//! explicit methods here, and the structural subgraph must stay acyclic at
//! every step.

use crate::hidef::{EdgeRecord, EdgeType, NodeRecord};
use crate::nodeidx::NodeIndex;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum HierarchyError {
    /// The structural subgraph of the input contains a cycle.
    NotADag,
    /// No term survived the minimum-size filter.
    EmptyHierarchy,
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::NotADag => write!(f, "Input hierarchy is not a DAG"),
            HierarchyError::EmptyHierarchy => {
                write!(f, "No terms left after minimum-size filtering")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

#[derive(Debug)]
pub struct Ontology {
    index: NodeIndex,
    children: FxHashMap<u32, Vec<(u32, EdgeType)>>,
    parents: FxHashMap<u32, Vec<u32>>,
    terms: FxHashSet<u32>,
    genes: FxHashSet<u32>,
}

impl Ontology {
    /// Build the initial graph from the hidef tables.
    ///
    /// Terms below `min_term_size` are dropped together with every edge
    /// touching them. A leaf (a surviving term never appearing as a parent)
    /// owns its whole declared gene list; every other term owns only the
    /// declared genes that none of its children declare.
    pub fn build(
        nodes: &[NodeRecord],
        edges: &[EdgeRecord],
        min_term_size: usize,
    ) -> Result<Ontology, HierarchyError> {
        let surviving: FxHashMap<&str, &NodeRecord> = nodes
            .iter()
            .filter(|n| n.size >= min_term_size)
            .map(|n| (n.term.as_str(), n))
            .collect();
        if surviving.is_empty() {
            return Err(HierarchyError::EmptyHierarchy);
        }

        let kept_edges: Vec<&EdgeRecord> = edges
            .iter()
            .filter(|e| {
                surviving.contains_key(e.parent.as_str())
                    && surviving.contains_key(e.child.as_str())
            })
            .collect();
        let parent_terms: FxHashSet<&str> =
            kept_edges.iter().map(|e| e.parent.as_str()).collect();

        let mut ont = Ontology {
            index: NodeIndex::new(),
            children: FxHashMap::default(),
            parents: FxHashMap::default(),
            terms: FxHashSet::default(),
            genes: FxHashSet::default(),
        };

        // Intern terms in node-table order so ids are stable across runs
        for node in nodes.iter().filter(|n| surviving.contains_key(n.term.as_str())) {
            let id = ont.index.get_or_insert_id(&node.term);
            ont.terms.insert(id);
            ont.children.entry(id).or_default();
            ont.parents.entry(id).or_default();
        }

        for edge in &kept_edges {
            let parent = ont.index.get_or_insert_id(&edge.parent);
            let child = ont.index.get_or_insert_id(&edge.child);
            ont.add_edge(parent, child, edge.edge_type);
        }

        // Union of the declared gene lists of each parent's children, for
        // the direct-ownership rule below
        let mut child_union: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
        for edge in &kept_edges {
            let child_rec = surviving[edge.child.as_str()];
            let union = child_union.entry(edge.parent.as_str()).or_default();
            for gene in &child_rec.genes {
                union.insert(gene.as_str());
            }
        }

        for node in nodes.iter().filter(|n| surviving.contains_key(n.term.as_str())) {
            let term_id = ont.index.get_id(&node.term).unwrap();
            let is_leaf = !parent_terms.contains(node.term.as_str());
            let union = child_union.get(node.term.as_str());
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for gene in &node.genes {
                if !is_leaf && union.is_some_and(|u| u.contains(gene.as_str())) {
                    continue;
                }
                if !seen.insert(gene.as_str()) {
                    continue;
                }
                let gene_id = ont.index.get_or_insert_id(gene);
                ont.genes.insert(gene_id);
                ont.parents.entry(gene_id).or_default();
                ont.add_edge(term_id, gene_id, EdgeType::Gene);
            }
        }

        debug!(
            "Built hierarchy with {} terms, {} genes, {} edges",
            ont.num_terms(),
            ont.num_genes(),
            ont.edges().len()
        );
        Ok(ont)
    }

    pub fn name(&self, id: u32) -> &str {
        self.index.get_name(id).unwrap()
    }

    pub fn term_id(&self, name: &str) -> Option<u32> {
        self.index.get_id(name).filter(|id| self.terms.contains(id))
    }

    pub fn is_term(&self, id: u32) -> bool {
        self.terms.contains(&id)
    }

    pub fn is_gene(&self, id: u32) -> bool {
        self.genes.contains(&id)
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    /// Term ids in interning order.
    pub fn term_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.terms.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains_edge(&self, parent: u32, child: u32) -> bool {
        self.children
            .get(&parent)
            .is_some_and(|adj| adj.iter().any(|&(c, _)| c == child))
    }

    pub fn add_edge(&mut self, parent: u32, child: u32, edge_type: EdgeType) {
        if self.contains_edge(parent, child) {
            return;
        }
        self.children.entry(parent).or_default().push((child, edge_type));
        self.parents.entry(child).or_default().push(parent);
    }

    pub fn remove_edge(&mut self, parent: u32, child: u32) {
        if let Some(adj) = self.children.get_mut(&parent) {
            if let Some(pos) = adj.iter().position(|&(c, _)| c == child) {
                adj.remove(pos);
            }
        }
        if let Some(inc) = self.parents.get_mut(&child) {
            if let Some(pos) = inc.iter().position(|&p| p == parent) {
                inc.remove(pos);
            }
        }
    }

    /// Remove a term and every edge touching it.
    pub fn remove_node(&mut self, id: u32) {
        let ps = self.parents.get(&id).cloned().unwrap_or_default();
        for p in ps {
            self.remove_edge(p, id);
        }
        let cs = self.children.get(&id).cloned().unwrap_or_default();
        for (c, _) in cs {
            self.remove_edge(id, c);
        }
        self.children.remove(&id);
        self.parents.remove(&id);
        self.terms.remove(&id);
    }

    /// Delete `node`, reconnecting each of its parents to each of its
    /// children with the child edge's original type. Membership edges are
    /// rewired like structural ones, which is how a parent absorbs the
    /// deleted term's directly-owned genes.
    pub fn collapse_into_parents(&mut self, node: u32) {
        let ps: Vec<u32> = self.parents.get(&node).cloned().unwrap_or_default();
        let cs: Vec<(u32, EdgeType)> = self.children.get(&node).cloned().unwrap_or_default();
        for &p in &ps {
            self.remove_edge(p, node);
        }
        for &(c, edge_type) in &cs {
            self.remove_edge(node, c);
            for &p in &ps {
                self.add_edge(p, c, edge_type);
            }
        }
        self.remove_node(node);
    }

    /// All edges in deterministic order (terms in interning order,
    /// adjacency in insertion order).
    pub fn edges(&self) -> Vec<(u32, u32, EdgeType)> {
        let mut out = Vec::new();
        for t in self.term_ids() {
            if let Some(adj) = self.children.get(&t) {
                for &(c, edge_type) in adj {
                    out.push((t, c, edge_type));
                }
            }
        }
        out
    }

    /// Structural (term -> term) edges only.
    pub fn structural_edges(&self) -> Vec<(u32, u32)> {
        self.edges()
            .into_iter()
            .filter(|&(_, _, edge_type)| edge_type == EdgeType::Default)
            .map(|(p, c, _)| (p, c))
            .collect()
    }

    pub fn num_membership_edges(&self) -> usize {
        self.edges()
            .iter()
            .filter(|&&(_, _, edge_type)| edge_type == EdgeType::Gene)
            .count()
    }

    /// Terms with no structural parent.
    pub fn roots(&self) -> Vec<u32> {
        let mut roots: Vec<u32> = self
            .terms
            .iter()
            .copied()
            .filter(|t| self.parents.get(t).map_or(true, |p| p.is_empty()))
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Terms with no structural children (they may still own genes).
    pub fn term_leaves(&self) -> Vec<u32> {
        let mut leaves: Vec<u32> = self
            .terms
            .iter()
            .copied()
            .filter(|t| {
                self.children
                    .get(t)
                    .map_or(true, |adj| adj.iter().all(|&(_, ty)| ty != EdgeType::Default))
            })
            .collect();
        leaves.sort_unstable();
        leaves
    }

    /// All nodes reachable from `id` over structural and membership edges,
    /// excluding `id` itself.
    pub fn descendants(&self, id: u32) -> FxHashSet<u32> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<u32> = self
            .children
            .get(&id)
            .map(|adj| adj.iter().map(|&(c, _)| c).collect())
            .unwrap_or_default();
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            if let Some(adj) = self.children.get(&n) {
                stack.extend(adj.iter().map(|&(c, _)| c));
            }
        }
        seen
    }

    // Topological order of the subgraph reachable from `start`, start first.
    // Iterative DFS; reversed postorder is a topological order on a DAG.
    fn topo_order_from(&self, start: u32) -> Vec<u32> {
        let mut postorder: Vec<u32> = Vec::new();
        let mut visited: FxHashSet<u32> = FxHashSet::default();
        let mut stack: Vec<(u32, usize)> = vec![(start, 0)];
        visited.insert(start);
        while let Some(frame) = stack.last_mut() {
            let (node, idx) = *frame;
            let next = self.children.get(&node).and_then(|adj| adj.get(idx));
            match next {
                Some(&(child, _)) => {
                    frame.1 += 1;
                    if visited.insert(child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    postorder.push(node);
                    stack.pop();
                }
            }
        }
        postorder.reverse();
        postorder
    }

    /// Number of distinct directed paths from `from` to `to`, saturated at
    /// `cap`. Forward DP over a topological order of the reachable subgraph
    /// counts every path exactly once.
    pub fn count_paths(&self, from: u32, to: u32, cap: usize) -> usize {
        let order = self.topo_order_from(from);
        let mut counts: FxHashMap<u32, usize> = FxHashMap::default();
        counts.insert(from, 1);
        for n in order {
            let c = *counts.get(&n).unwrap_or(&0);
            if c == 0 {
                continue;
            }
            if let Some(adj) = self.children.get(&n) {
                for &(child, _) in adj {
                    let entry = counts.entry(child).or_insert(0);
                    *entry = (*entry + c).min(cap);
                }
            }
        }
        *counts.get(&to).unwrap_or(&0)
    }

    /// Kahn's algorithm over the whole graph. Genes are sinks, so a cycle
    /// can only involve structural edges.
    pub fn is_acyclic(&self) -> bool {
        let mut indegree: FxHashMap<u32, usize> = self
            .parents
            .iter()
            .map(|(&node, inc)| (node, inc.len()))
            .collect();
        for &t in &self.terms {
            indegree.entry(t).or_insert(0);
        }

        let total = indegree.len();
        let mut queue: Vec<u32> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut visited = 0usize;
        while let Some(n) = queue.pop() {
            visited += 1;
            if let Some(adj) = self.children.get(&n) {
                for &(c, _) in adj {
                    let d = indegree.get_mut(&c).unwrap();
                    *d -= 1;
                    if *d == 0 {
                        queue.push(c);
                    }
                }
            }
        }
        visited == total
    }

    /// Longest-path depth of every term from the hierarchy roots, computed
    /// iteratively over a topological order of the structural subgraph.
    pub fn term_depths(&self) -> FxHashMap<u32, usize> {
        let mut indegree: FxHashMap<u32, usize> =
            self.terms.iter().map(|&t| (t, 0)).collect();
        for &t in &self.terms {
            if let Some(adj) = self.children.get(&t) {
                for &(c, edge_type) in adj {
                    if edge_type == EdgeType::Default {
                        *indegree.get_mut(&c).unwrap() += 1;
                    }
                }
            }
        }

        let queue_init: Vec<u32> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&t, _)| t)
            .collect();
        let mut depths: FxHashMap<u32, usize> = FxHashMap::default();
        let mut queue = queue_init;
        for &t in &queue {
            depths.insert(t, 0);
        }
        while let Some(t) = queue.pop() {
            let d = depths[&t];
            if let Some(adj) = self.children.get(&t) {
                for &(c, edge_type) in adj {
                    if edge_type != EdgeType::Default {
                        continue;
                    }
                    let entry = depths.entry(c).or_insert(0);
                    if *entry < d + 1 {
                        *entry = d + 1;
                    }
                    let deg = indegree.get_mut(&c).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(c);
                    }
                }
            }
        }
        depths
    }
}
