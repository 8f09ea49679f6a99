use clap::Parser;
use color_eyre::Result;
use anomaly_forest::PRODUCTION_FEATURES;
use forest_exporter::logging;
use forest_exporter::trainer::{ExternalTrainer, Trainer, read_samples};
use forest_exporter::write_forest::{Encoding, write_forest};

use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Train a forest with an external trainer and export it", long_about = None)]
struct Cli {
    /// Labeled samples (CSV with one column per feature and a `label` column)
    #[arg(short = 'i', long = "input", value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Output file
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    output: PathBuf,

    /// Output encoding, inferred from the output extension when omitted (`.afst` is packed)
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<Encoding>,

    /// Trainer program, called as `<trainer> [args...] <samples.csv> <dump.csv>`
    #[arg(long = "trainer", value_name = "PROGRAM", env = "ANOMALY_FOREST_TRAINER")]
    trainer: PathBuf,

    /// Extra argument passed to the trainer before the file paths
    #[arg(long = "trainer-arg", value_name = "ARG", allow_hyphen_values = true)]
    trainer_args: Vec<String>,

    /// Canonical feature ordering, comma separated
    #[arg(long = "features", value_delimiter = ',', default_values_t = PRODUCTION_FEATURES.map(String::from))]
    features: Vec<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    logging::init(args.verbose);

    let samples = read_samples(&args.input, &args.features)?;
    let trainer = ExternalTrainer::new(&args.trainer, &args.features).args(&args.trainer_args);
    let forest = trainer.train(&samples)?;

    let encoding = args.format.unwrap_or_else(|| Encoding::from_path(&args.output));
    write_forest(&forest, &args.output, encoding)?;
    Ok(())
}
