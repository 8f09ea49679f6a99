use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::Result;

use forest_exporter::logging;
use forest_exporter::write_forest::{Encoding, read_forest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Forest file, JSON or packed
    #[arg(short = 'i', long = "input", value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Also print every tree node by node
    #[arg(short, long)]
    dump: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    logging::init(args.verbose);

    analyze(&args.input, args.dump)
}

fn analyze(input: impl AsRef<Path>, dump: bool) -> Result<()> {
    let forest = read_forest(input)?;

    let mut node_cnt = 0;
    let mut leaf_cnt = 0;
    let mut max_depth = 0;
    for tree in forest.trees() {
        node_cnt += tree.num_nodes();
        leaf_cnt += tree.num_leaves();
        max_depth = max_depth.max(tree.depth());
    }

    println!(
        "Forest is a {}-class CLASSIFICATION problem over {} features.\n\n",
        forest.num_classes(),
        forest.num_features()
    );

    println!(
        "--- Structure ---\nTrees: {} | Nodes: {} | Branches: {} , leaves: {} | Max depth: {}\n--------------------------\n\n",
        forest.num_trees(),
        node_cnt,
        node_cnt - leaf_cnt,
        leaf_cnt,
        max_depth
    );

    println!("--- Feature usage ---");
    for (name, splits) in forest.feature_usage() {
        println!("{name}: {splits} splits");
    }
    println!("--------------------------\n\n");

    let degenerate: Vec<(usize, usize)> = forest
        .trees()
        .iter()
        .enumerate()
        .flat_map(|(t, tree)| tree.degenerate_leaves().map(move |n| (t, n)))
        .collect();
    if !degenerate.is_empty() {
        println!("--- Degenerate leaves ---");
        for (tree, node) in &degenerate {
            println!("tree {tree}, node {node}");
        }
        println!("--------------------------\n\n");
        tracing::warn!(
            count = degenerate.len(),
            "inputs reaching these leaves cannot be scored"
        );
    }

    let json_len = Encoding::Json.encode(&forest)?.len();
    let packed_len = Encoding::Packed.encode(&forest)?.len();
    println!(
        "--- Encodings ---\nJSON: {} bytes | Packed: {} bytes ({:.2}% of JSON)\n--------------------------\n\n",
        json_len,
        packed_len,
        packed_len as f64 / json_len as f64 * 100.0
    );

    if dump {
        println!("{forest}");
    }

    Ok(())
}
