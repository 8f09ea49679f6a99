use std::fs;

use color_eyre::Result;
use anomaly_forest::Forest;
use forest_exporter::write_forest::{Encoding, export, read_forest, write_forest};

use crate::datasets::anomaly;
use crate::helpers::{get_forest, get_test_data, scratch_dir};

#[test]
fn exported_json_matches_the_reference_file() -> Result<()> {
    let dir = scratch_dir("export-json")?;
    let output = dir.join("anomaly_3.json");

    export("./tests/test-forests/anomaly_3.csv", &output, Encoding::Json)?;

    let written = fs::read(&output)?;
    let reference = fs::read("./tests/test-forests/anomaly_3.json")?;
    assert_eq!(written, reference);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn exported_then_loaded_forest_scores_identically() -> Result<()> {
    let dir = scratch_dir("export-both")?;
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let test_data: Vec<anomaly::DataPoint> = get_test_data("./tests/test-data/anomaly.csv")?;

    for encoding in [Encoding::Json, Encoding::Packed] {
        let output = dir.join(format!("anomaly_3.{encoding:?}"));
        write_forest(&forest, &output, encoding)?;

        let loaded = read_forest(&output)?;
        assert_eq!(loaded, forest);

        for data_point in &test_data {
            let features = data_point.transform_features(forest.features());
            assert_eq!(
                loaded.predict(&features)?.to_bits(),
                forest.predict(&features)?.to_bits()
            );
        }
    }

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn exporting_twice_is_byte_identical() -> Result<()> {
    let dir = scratch_dir("export-twice")?;

    for encoding in [Encoding::Json, Encoding::Packed] {
        let first = dir.join("first");
        let second = dir.join("second");
        export("./tests/test-forests/anomaly_3.csv", &first, encoding)?;
        export("./tests/test-forests/anomaly_3.csv", &second, encoding)?;
        assert_eq!(fs::read(first)?, fs::read(second)?);
    }

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn reference_json_loads_directly() -> Result<()> {
    let bytes = fs::read("./tests/test-forests/anomaly_3.json")?;
    let forest = Forest::from_json(&bytes)?;
    assert_eq!(forest, get_forest("./tests/test-forests/anomaly_3.csv")?);
    Ok(())
}

#[test]
fn encoding_follows_the_extension() {
    assert_eq!(Encoding::from_path("model.afst"), Encoding::Packed);
    assert_eq!(Encoding::from_path("model.AFST"), Encoding::Packed);
    assert_eq!(Encoding::from_path("model.json"), Encoding::Json);
    assert_eq!(Encoding::from_path("model"), Encoding::Json);
}

#[test]
fn packed_is_smaller_than_json() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let json = Encoding::Json.encode(&forest)?;
    let packed = Encoding::Packed.encode(&forest)?;
    assert!(packed.len() < json.len());
    Ok(())
}
