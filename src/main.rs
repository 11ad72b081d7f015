use clap::Parser;
use hiref::hidef;
use hiref::ontology::Ontology;
use hiref::refine::{refine, RefineParams};
use hiref::stats::print_stats;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter};

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path prefix of the hidef hierarchy; reads <prefix>.nodes and <prefix>.edges.
    #[clap(short = 'i', long, value_parser)]
    input_prefix: String,

    /// Minimum number of genes a term must have to enter the hierarchy.
    #[clap(short = 's', long, value_parser, default_value_t = 4)]
    min_term_size: usize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Command-line tool for refining hidef hierarchies into ontologies.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Refine the hierarchy into a minimal, non-redundant ontology
    Refine {
        #[clap(flatten)]
        common: CommonOpts,

        /// Containment index threshold for adding implied parent-child edges
        #[clap(long, value_parser, default_value_t = 0.75)]
        ci_thre: f64,

        /// Jaccard index threshold for merging near-identical parent-child pairs
        #[clap(long, value_parser, default_value_t = 0.9)]
        ji_thre: f64,

        /// Minimum difference in gene count for every parent-child pair
        #[clap(long, value_parser, default_value_t = 1)]
        min_diff: usize,

        /// Output prefix; writes <prefix>.nodes and <prefix>.edges [default: <input-prefix>_pruned]
        #[clap(short = 'o', long, value_parser)]
        output_prefix: Option<String>,
    },
    /// Print hierarchy statistics
    Stats {
        #[clap(flatten)]
        common: CommonOpts,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Refine {
            common,
            ci_thre,
            ji_thre,
            min_diff,
            output_prefix,
        } => {
            let mut ontology = initialize_ontology(&common)?;

            let params = RefineParams {
                ci_thre,
                ji_thre,
                min_diff,
            };
            refine(&mut ontology, &params).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Refinement failed: {}", e))
            })?;

            let output_prefix =
                output_prefix.unwrap_or_else(|| format!("{}_pruned", common.input_prefix));
            write_ontology(&ontology, &output_prefix)?;
        }
        Args::Stats { common } => {
            let ontology = initialize_ontology(&common)?;

            print_stats(&ontology);
        }
    }

    Ok(())
}

/// Initialize logging and build the hierarchy graph from the input tables
fn initialize_ontology(common: &CommonOpts) -> io::Result<Ontology> {
    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let nodes = hidef::read_nodes(&format!("{}.nodes", common.input_prefix))?;
    let edges = hidef::read_edges(&format!("{}.edges", common.input_prefix))?;
    info!(
        "Read {} terms and {} edges from prefix {}",
        nodes.len(),
        edges.len(),
        common.input_prefix
    );

    Ontology::build(&nodes, &edges, common.min_term_size).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to build hierarchy: {}", e),
        )
    })
}

fn write_ontology(ontology: &Ontology, output_prefix: &str) -> io::Result<()> {
    let (node_rows, edge_rows) = hidef::ontology_rows(ontology);

    let nodes_path = format!("{}.nodes", output_prefix);
    let mut writer = BufWriter::new(File::create(&nodes_path)?);
    hidef::write_nodes(&mut writer, &node_rows)?;

    let edges_path = format!("{}.edges", output_prefix);
    let mut writer = BufWriter::new(File::create(&edges_path)?);
    hidef::write_edges(&mut writer, &edge_rows)?;

    info!(
        "Number of edges is {}, number of nodes are {}",
        edge_rows.len(),
        node_rows.len()
    );
    Ok(())
}
