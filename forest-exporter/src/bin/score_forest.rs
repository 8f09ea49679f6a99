use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use forest_exporter::logging;
use forest_exporter::scoring::score_csv;
use forest_exporter::write_forest::read_forest;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Score feature rows with a forest", long_about = None)]
struct Cli {
    /// Forest file, JSON or packed
    #[arg(short = 'm', long = "model", value_name = "MODEL_FILE", env = "ANOMALY_FOREST_MODEL")]
    model: PathBuf,

    /// CSV with one column per feature
    #[arg(short = 'i', long = "input", value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Where to write the scored rows, stdout when omitted
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    logging::init(args.verbose);

    let forest = read_forest(&args.model)?;
    let input = File::open(&args.input)
        .wrap_err_with(|| format!("Could not open {}", args.input.display()))?;

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).wrap_err("Could not create output file")?),
        None => Box::new(io::stdout().lock()),
    };

    let rows = score_csv(&forest, input, output)?;
    tracing::info!(rows, "scored rows");
    Ok(())
}
