use color_eyre::Result;
use anomaly_forest::{Forest, PRODUCTION_FEATURES, TOY_FEATURES};

use crate::datasets::anomaly;
use crate::helpers::{assert_epsilon, get_forest, get_test_data};

#[test]
fn verify_forest_confidence_anomaly_3_trees() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let test_data: Vec<anomaly::DataPoint> = get_test_data("./tests/test-data/anomaly.csv")?;

    assert_eq!(forest.features(), PRODUCTION_FEATURES);
    assert_eq!(forest.num_trees(), 3);

    for data_point in test_data {
        let features = data_point.transform_features(forest.features());
        let confidence = forest.predict(&features)?;
        assert_epsilon(confidence, data_point.forest_confidence, 1e-12);
    }

    Ok(())
}

#[test]
fn named_and_positional_inputs_agree() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let test_data: Vec<anomaly::DataPoint> = get_test_data("./tests/test-data/anomaly.csv")?;

    for data_point in test_data {
        let positional = forest.predict(&data_point.transform_features(forest.features()))?;
        let named = forest.predict(&data_point.named_features())?;
        assert_eq!(positional.to_bits(), named.to_bits());
    }

    Ok(())
}

#[test]
fn equal_features_take_the_left_branch() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;

    // hr_mean, ppg_std and time_of_day sit exactly on their thresholds
    let features = [90.0, 5.0, 9.9, 10.0, 0.4, 0.9, 0.35, 0.5];
    assert_epsilon(forest.predict(&features)?, 47.0 / 462.0, 1e-12);

    Ok(())
}

#[test]
fn distribution_sums_to_one() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let test_data: Vec<anomaly::DataPoint> = get_test_data("./tests/test-data/anomaly.csv")?;

    for data_point in test_data {
        let proba = forest.predict_proba(&data_point.named_features())?;
        assert_eq!(proba.len(), 2);
        assert_epsilon(proba.iter().sum(), 1.0, 1e-12);
        assert_eq!(proba.positive(), forest.predict(&data_point.named_features())?);
    }

    Ok(())
}

#[test]
fn verify_legacy_toy_forest() -> Result<()> {
    let bytes = std::fs::read("./tests/test-forests/toy_legacy.json")?;
    let forest = Forest::from_json_with_features(&bytes, TOY_FEATURES)?;

    assert_eq!(forest.num_trees(), 2);
    assert_epsilon(forest.predict(&[70.0, 5.0])?, 159.0 / 6014.0, 1e-12);
    assert_epsilon(forest.predict(&[95.0, 3.0])?, 737.0 / 798.0, 1e-12);

    Ok(())
}
