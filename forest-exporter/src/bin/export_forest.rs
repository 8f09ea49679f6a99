use clap::Parser;
use color_eyre::Result;
use forest_exporter::logging;
use forest_exporter::write_forest::{Encoding, export};

use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Convert a trainer dump into a portable forest file", long_about = None)]
struct Cli {
    /// Trainer dump (CSV with a JSON header line)
    #[arg(short = 'i', long = "input", value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Output file
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    output: PathBuf,

    /// Output encoding, inferred from the output extension when omitted (`.afst` is packed)
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<Encoding>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    logging::init(args.verbose);

    let encoding = args.format.unwrap_or_else(|| Encoding::from_path(&args.output));
    let forest = export(&args.input, &args.output, encoding)?;

    tracing::info!(
        trees = forest.num_trees(),
        features = forest.num_features(),
        "exported forest"
    );
    Ok(())
}
