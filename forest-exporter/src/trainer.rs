//! Training adapters.
//!
//! Inference never depends on how a forest was grown. A [`Trainer`] only
//! has to turn labeled samples into a validated [`Forest`]; the bundled
//! [`ExternalTrainer`] shells out to any program that speaks the
//! [`TrainerDump`] format.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use anomaly_forest::Forest;
use color_eyre::eyre::{OptionExt, Report, WrapErr, bail, eyre};
use color_eyre::Result;

use crate::trainer_dump::TrainerDump;

/// Name of the label column in sample files
pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Normal,
    Anomaly,
}

impl Label {
    /// Class index of this label in a forest's class weights
    pub fn class(self) -> usize {
        match self {
            Label::Normal => 0,
            Label::Anomaly => 1,
        }
    }
}

impl FromStr for Label {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(Label::Normal),
            "1" => Ok(Label::Anomaly),
            other => Err(eyre!("Invalid label `{other}`, expected 0 or 1")),
        }
    }
}

/// One labeled training window
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Feature values in the trainer's canonical order
    pub features: Vec<f64>,
    pub label: Label,
}

pub trait Trainer {
    /// Grow a forest from `samples`.
    fn train(&self, samples: &[Sample]) -> Result<Forest>;
}

/// Check that `samples` can be trained on: non-empty, uniform width, finite
/// values and both labels present.
pub fn validate_samples(samples: &[Sample], num_features: usize) -> Result<()> {
    if samples.is_empty() {
        bail!("No training samples");
    }

    for (idx, sample) in samples.iter().enumerate() {
        if sample.features.len() != num_features {
            bail!(
                "Sample {idx} has {} features, expected {num_features}",
                sample.features.len()
            );
        }
        if let Some(pos) = sample.features.iter().position(|v| !v.is_finite()) {
            bail!("Sample {idx}: feature #{pos} is not finite");
        }
    }

    for label in [Label::Normal, Label::Anomaly] {
        if !samples.iter().any(|s| s.label == label) {
            bail!("Training samples contain no {label:?} windows");
        }
    }

    Ok(())
}

/// Read labeled samples from a CSV file with one column per feature and a
/// `label` column. Columns are matched by name.
pub fn read_samples(path: impl AsRef<Path>, features: &[String]) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .wrap_err_with(|| format!("Could not open samples {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| eyre!("{} has no `{name}` column", path.display()))
    };

    let feature_columns = features
        .iter()
        .map(|name| column(name.as_str()))
        .collect::<Result<Vec<_>>>()?;
    let label_column = column(LABEL_COLUMN)?;

    let mut samples = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = record.wrap_err_with(|| format!("Malformed row {row}"))?;

        let features = feature_columns
            .iter()
            .zip(features)
            .map(|(&pos, name)| {
                let cell = record.get(pos).unwrap_or_default();
                cell.parse::<f64>()
                    .wrap_err_with(|| format!("Row {row}: `{name}` is not a number: {cell:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let label = record
            .get(label_column)
            .ok_or_eyre("missing label")
            .and_then(Label::from_str)
            .wrap_err_with(|| format!("Row {row}"))?;

        samples.push(Sample { features, label });
    }

    tracing::debug!(path = %path.display(), samples = samples.len(), "read training samples");
    Ok(samples)
}

/// Write samples in the layout [`read_samples`] accepts.
pub fn write_samples<W: io::Write>(writer: W, features: &[String], samples: &[Sample]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(features.iter().map(String::as_str).chain([LABEL_COLUMN]))?;
    for sample in samples {
        let record = sample
            .features
            .iter()
            .map(f64::to_string)
            .chain([sample.label.class().to_string()]);
        wtr.write_record(record)?;
    }

    wtr.flush()?;
    Ok(())
}

static RUNS: AtomicUsize = AtomicUsize::new(0);

/// Removes a scratch file when dropped.
struct Scratch(PathBuf);

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

/// Trains by running an external program as
/// `program [args...] <samples.csv> <dump.csv>`.
///
/// The program reads the samples written by [`write_samples`] and must
/// leave a [`TrainerDump`] at the second path whose feature ordering
/// matches this trainer's.
#[derive(Debug, Clone)]
pub struct ExternalTrainer {
    program: OsString,
    args: Vec<OsString>,
    features: Vec<String>,
    work_dir: PathBuf,
}

impl ExternalTrainer {
    pub fn new<S: Into<String>>(
        program: impl Into<OsString>,
        features: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            features: features.into_iter().map(Into::into).collect(),
            work_dir: std::env::temp_dir(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Directory for the scratch files exchanged with the program
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

impl Trainer for ExternalTrainer {
    fn train(&self, samples: &[Sample]) -> Result<Forest> {
        validate_samples(samples, self.features.len())?;

        let run = RUNS.fetch_add(1, Ordering::Relaxed);
        let stem = format!("anomaly-forest-{}-{run}", std::process::id());
        let samples_file = Scratch(self.work_dir.join(format!("{stem}-samples.csv")));
        let dump_file = Scratch(self.work_dir.join(format!("{stem}-dump.csv")));

        let file = fs::File::create(&samples_file.0).wrap_err_with(|| {
            format!("Could not create {}", samples_file.0.display())
        })?;
        write_samples(file, &self.features, samples)?;

        tracing::info!(program = ?self.program, samples = samples.len(), "running trainer");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&samples_file.0)
            .arg(&dump_file.0)
            .status()
            .wrap_err_with(|| format!("Could not start trainer {:?}", self.program))?;
        if !status.success() {
            bail!("Trainer {:?} failed: {status}", self.program);
        }

        let dump = TrainerDump::read(&dump_file.0)
            .wrap_err("Trainer did not leave a readable dump")?;
        if dump.features() != self.features.as_slice() {
            bail!(
                "Trainer used feature ordering {:?}, expected {:?}",
                dump.features(),
                self.features
            );
        }

        let forest = dump.into_forest()?;
        tracing::info!(trees = forest.num_trees(), "trainer finished");
        Ok(forest)
    }
}
