use color_eyre::{Result, eyre::WrapErr};

use std::{fs, io::Write, path::Path};

use anomaly_forest::{Forest, load_forest};
use clap::ValueEnum;

use crate::trainer_dump::TrainerDump;

/// On-disk encodings of a forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    /// Self-describing JSON with the feature ordering embedded
    Json,
    /// Compact little-endian binary
    Packed,
}

impl Encoding {
    /// Files ending in `.afst` are packed, everything else is JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("afst") => Self::Packed,
            _ => Self::Json,
        }
    }

    pub fn encode(self, forest: &Forest) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Json => forest.to_json()?,
            Self::Packed => forest.to_bytes()?,
        };
        Ok(bytes)
    }
}

/// Read a forest in either encoding.
pub fn read_forest(path: impl AsRef<Path>) -> Result<Forest> {
    let path = path.as_ref();
    let bytes = fs::read(path).wrap_err_with(|| format!("Could not read {}", path.display()))?;
    let forest = load_forest(&bytes)
        .wrap_err_with(|| format!("Could not load forest from {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        trees = forest.num_trees(),
        features = forest.num_features(),
        "loaded forest"
    );
    Ok(forest)
}

pub fn write_forest(forest: &Forest, output: impl AsRef<Path>, encoding: Encoding) -> Result<()> {
    let output = output.as_ref();
    let bytes = encoding.encode(forest)?;

    let mut output_file = fs::File::create(output).wrap_err("Could not create output file")?;
    output_file.write_all(&bytes)?;

    tracing::info!(
        path = %output.display(),
        ?encoding,
        bytes = bytes.len(),
        "wrote forest"
    );
    Ok(())
}

/// Convert a trainer dump at `input` into a forest file at `output`.
pub fn export(input: impl AsRef<Path>, output: impl AsRef<Path>, encoding: Encoding) -> Result<Forest> {
    let dump = TrainerDump::read(input).wrap_err("Could not read trainer dump (CSV).")?;
    if let Some(trainer) = &dump.header().trainer {
        tracing::info!(trainer = trainer.as_str(), nodes = dump.nodes().len(), "read trainer dump");
    }

    let forest = dump.into_forest()?;

    let degenerate: usize = forest
        .trees()
        .iter()
        .map(|tree| tree.degenerate_leaves().count())
        .sum();
    if degenerate > 0 {
        tracing::warn!(degenerate, "forest has leaves without training weight");
    }

    write_forest(&forest, output, encoding)?;
    Ok(forest)
}
