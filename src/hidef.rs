//! hidef node/edge table parsing and writing
//!
//! hidef emits two tab-delimited, header-less tables per hierarchy:
//! `<prefix>.nodes` with `term  size  "space-delimited genes"  stability`,
//! and `<prefix>.edges` with `parent  child  type`. The refined ontology is
//! written back in the same shape, with the gene column sorted and a
//! `log2(size)` column replacing stability.

use crate::ontology::Ontology;
use crate::termstats::compute_term_stats;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Error as IoError, Write};
use std::num::{ParseFloatError, ParseIntError};

#[derive(Debug)]
pub enum ParseErr {
    NotEnoughFields,
    IoError(IoError),
    InvalidSize(ParseIntError),
    InvalidStability(ParseFloatError),
    InvalidEdgeType(String),
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErr::NotEnoughFields => write!(f, "Not enough fields in table row"),
            ParseErr::IoError(e) => write!(f, "IO error: {}", e),
            ParseErr::InvalidSize(e) => write!(f, "Invalid term size: {}", e),
            ParseErr::InvalidStability(e) => write!(f, "Invalid stability value: {}", e),
            ParseErr::InvalidEdgeType(t) => write!(f, "Invalid edge type '{}'", t),
        }
    }
}

impl std::error::Error for ParseErr {}

/// Edge types of the hierarchy: `default` connects two terms, `gene`
/// connects a term to a gene it owns directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Default,
    Gene,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Default => "default",
            EdgeType::Gene => "gene",
        }
    }

    fn from_field(field: &str) -> Result<Self, ParseErr> {
        match field {
            "default" => Ok(EdgeType::Default),
            "gene" => Ok(EdgeType::Gene),
            other => Err(ParseErr::InvalidEdgeType(other.to_string())),
        }
    }
}

/// One row of the hidef node table.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub term: String,
    pub size: usize,
    pub genes: Vec<String>,
    pub stability: f64,
}

/// One row of the hidef edge table.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub parent: String,
    pub child: String,
    pub edge_type: EdgeType,
}

/// Parse a single row of the hidef node table.
fn parse_node_line(line: &str) -> Result<NodeRecord, ParseErr> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(ParseErr::NotEnoughFields);
    }

    let term = fields[0].to_string();
    let size = fields[1].parse::<usize>().map_err(ParseErr::InvalidSize)?;
    let genes: Vec<String> = fields[2]
        .split_whitespace()
        .map(|g| g.to_string())
        .collect();
    let stability = fields[3]
        .parse::<f64>()
        .map_err(ParseErr::InvalidStability)?;

    Ok(NodeRecord {
        term,
        size,
        genes,
        stability,
    })
}

/// Parse a single row of the hidef edge table.
fn parse_edge_line(line: &str) -> Result<EdgeRecord, ParseErr> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(ParseErr::NotEnoughFields);
    }

    Ok(EdgeRecord {
        parent: fields[0].to_string(),
        child: fields[1].to_string(),
        edge_type: EdgeType::from_field(fields[2])?,
    })
}

pub fn parse_nodes<R: BufRead>(reader: R) -> Result<Vec<NodeRecord>, ParseErr> {
    let mut records = Vec::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(ParseErr::IoError)?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_node_line(&line)?);
    }
    Ok(records)
}

pub fn parse_edges<R: BufRead>(reader: R) -> Result<Vec<EdgeRecord>, ParseErr> {
    let mut records = Vec::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(ParseErr::IoError)?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_edge_line(&line)?);
    }
    Ok(records)
}

pub fn read_nodes(path: &str) -> io::Result<Vec<NodeRecord>> {
    let file = File::open(path)?;
    parse_nodes(BufReader::new(file)).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse node table {}: {}", path, e),
        )
    })
}

pub fn read_edges(path: &str) -> io::Result<Vec<EdgeRecord>> {
    let file = File::open(path)?;
    parse_edges(BufReader::new(file)).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse edge table {}: {}", path, e),
        )
    })
}

/// One row of the refined ontology node table.
#[derive(Debug, Clone, PartialEq)]
pub struct OntNodeRow {
    pub term: String,
    pub size: usize,
    pub genes: Vec<String>,
    pub log_size: f64,
}

/// One row of the refined ontology edge table. Only structural edges are
/// re-emitted; membership edges are internal and regenerable from the gene
/// column of the node table.
#[derive(Debug, Clone, PartialEq)]
pub struct OntEdgeRow {
    pub parent: String,
    pub child: String,
}

/// Snapshot the refined graph as output table rows.
///
/// Node rows carry each surviving term's recomputed descendant size and its
/// sorted gene list; rows are in natural order over term names so output is
/// stable across runs.
pub fn ontology_rows(ont: &Ontology) -> (Vec<OntNodeRow>, Vec<OntEdgeRow>) {
    let stats = compute_term_stats(ont);

    let mut node_rows: Vec<OntNodeRow> = stats
        .iter()
        .map(|(&term, s)| {
            let mut genes: Vec<String> = s.genes.iter().map(|&g| ont.name(g).to_string()).collect();
            genes.sort_unstable();
            OntNodeRow {
                term: ont.name(term).to_string(),
                size: s.size,
                genes,
                log_size: (s.size as f64).log2(),
            }
        })
        .collect();
    node_rows.sort_by(|a, b| natord::compare(&a.term, &b.term));

    let mut edge_rows: Vec<OntEdgeRow> = ont
        .structural_edges()
        .into_iter()
        .map(|(parent, child)| OntEdgeRow {
            parent: ont.name(parent).to_string(),
            child: ont.name(child).to_string(),
        })
        .collect();
    edge_rows.sort_by(|a, b| {
        natord::compare(&a.parent, &b.parent).then_with(|| natord::compare(&a.child, &b.child))
    });

    (node_rows, edge_rows)
}

pub fn write_nodes<W: Write>(writer: &mut W, rows: &[OntNodeRow]) -> io::Result<()> {
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            row.term,
            row.size,
            row.genes.join(" "),
            row.log_size
        )?;
    }
    Ok(())
}

pub fn write_edges<W: Write>(writer: &mut W, rows: &[OntEdgeRow]) -> io::Result<()> {
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}",
            row.parent,
            row.child,
            EdgeType::Default.as_str()
        )?;
    }
    Ok(())
}
