use std::fs;

use color_eyre::Result;
use anomaly_forest::PRODUCTION_FEATURES;
use forest_exporter::trainer::{
    ExternalTrainer, Label, Sample, Trainer, read_samples, validate_samples, write_samples,
};

use crate::helpers::{get_forest, scratch_dir};

fn production_features() -> Vec<String> {
    PRODUCTION_FEATURES.map(String::from).to_vec()
}

fn samples() -> Result<Vec<Sample>> {
    read_samples("./tests/test-data/samples.csv", &production_features())
}

/// A trainer that ignores its samples and hands back the `anomaly_3` dump
fn canned_trainer(features: Vec<String>) -> ExternalTrainer {
    ExternalTrainer::new("sh", features)
        .arg("-c")
        .arg(r#"test -s "$1" && cp "$0" "$2""#)
        .arg("./tests/test-forests/anomaly_3.csv")
}

#[test]
fn reads_samples_by_column_name() -> Result<()> {
    let samples = samples()?;

    assert_eq!(samples.len(), 7);
    assert_eq!(
        samples[0],
        Sample {
            features: vec![62.0, 3.1, 0.1, 2.0, 0.05, 0.3, 0.2, 0.9],
            label: Label::Normal,
        }
    );
    assert_eq!(samples[1].label, Label::Anomaly);
    Ok(())
}

#[test]
fn written_samples_read_back() -> Result<()> {
    let dir = scratch_dir("samples")?;
    let path = dir.join("samples.csv");
    let features = production_features();
    let samples = samples()?;

    write_samples(fs::File::create(&path)?, &features, &samples)?;
    assert_eq!(read_samples(&path, &features)?, samples);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn external_trainer_produces_validated_forest() -> Result<()> {
    let dir = scratch_dir("train")?;
    let trainer = canned_trainer(production_features()).work_dir(&dir);

    let forest = trainer.train(&samples()?)?;
    assert_eq!(forest, get_forest("./tests/test-forests/anomaly_3.csv")?);

    // scratch files are cleaned up
    assert_eq!(fs::read_dir(&dir)?.count(), 0);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn failing_trainer_is_an_error() -> Result<()> {
    let dir = scratch_dir("train-fail")?;

    let trainer = ExternalTrainer::new("false", production_features()).work_dir(&dir);
    assert!(trainer.train(&samples()?).is_err());

    // exits cleanly but never writes a dump
    let trainer = ExternalTrainer::new("true", production_features()).work_dir(&dir);
    assert!(trainer.train(&samples()?).is_err());

    assert_eq!(fs::read_dir(&dir)?.count(), 0);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn trainer_feature_ordering_must_match() -> Result<()> {
    let dir = scratch_dir("train-order")?;
    let mut features = production_features();
    features.swap(0, 1);

    let err = canned_trainer(features).work_dir(&dir).train(&samples()?).unwrap_err();
    assert!(err.to_string().contains("feature ordering"));

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn rejects_untrainable_samples() -> Result<()> {
    let samples = samples()?;

    assert!(validate_samples(&[], 8).is_err());
    assert!(validate_samples(&samples, 2).is_err());

    let normal_only: Vec<Sample> = samples
        .iter()
        .filter(|s| s.label == Label::Normal)
        .cloned()
        .collect();
    assert!(validate_samples(&normal_only, 8).is_err());

    let mut non_finite = samples.clone();
    non_finite[3].features[6] = f64::NAN;
    assert!(validate_samples(&non_finite, 8).is_err());

    assert!(validate_samples(&samples, 8).is_ok());
    Ok(())
}

#[test]
fn labels_parse_from_class_indices() {
    assert_eq!("0".parse::<Label>().ok(), Some(Label::Normal));
    assert_eq!(" 1 ".parse::<Label>().ok(), Some(Label::Anomaly));
    assert!("2".parse::<Label>().is_err());
    assert!("anomaly".parse::<Label>().is_err());
    assert_eq!(Label::Anomaly.class(), 1);
}
