use color_eyre::Result;
use anomaly_forest::Error;
use forest_exporter::scoring::{CONFIDENCE_COLUMN, score_csv};

use crate::datasets::anomaly;
use crate::helpers::{assert_epsilon, get_forest, get_test_data};

#[test]
fn scores_every_row_in_column_name_order() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let test_data: Vec<anomaly::DataPoint> = get_test_data("./tests/test-data/anomaly.csv")?;

    // Same rows with the confidence column dropped, columns reversed and an
    // identifier the forest doesn't know about
    let mut input = String::from("id,time_of_day,ppg_std,accel_peak,accel_rms,steps_20s,hr_slope,hr_std,hr_mean\n");
    for (idx, p) in test_data.iter().enumerate() {
        input.push_str(&format!(
            "row-{idx},{},{},{},{},{},{},{},{}\n",
            p.time_of_day, p.ppg_std, p.accel_peak, p.accel_rms, p.steps_20s, p.hr_slope, p.hr_std, p.hr_mean
        ));
    }

    let mut output = Vec::new();
    let rows = score_csv(&forest, input.as_bytes(), &mut output)?;
    assert_eq!(rows, test_data.len());

    let mut reader = csv::Reader::from_reader(output.as_slice());
    assert_eq!(reader.headers()?.get(9), Some(CONFIDENCE_COLUMN));

    for (record, p) in reader.records().zip(&test_data) {
        let record = record?;
        assert_eq!(record.len(), 10);
        assert!(record[0].starts_with("row-"));
        assert_epsilon(record[9].parse()?, p.forest_confidence, 1e-12);
    }

    Ok(())
}

#[test]
fn missing_feature_column_is_reported() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let input = "hr_mean,hr_std,hr_slope,steps_20s,accel_rms,accel_peak,time_of_day\n\
                 62.0,3.1,0.1,2,0.05,0.3,0.9\n";

    let err = score_csv(&forest, input.as_bytes(), Vec::new()).unwrap_err();
    let cause = err.downcast_ref::<Error>();
    assert_eq!(cause, Some(&Error::MissingFeature("ppg_std".into())));
    assert!(cause.is_some_and(Error::is_input_error));

    Ok(())
}

#[test]
fn non_numeric_cell_is_rejected() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let input = "hr_mean,hr_std,hr_slope,steps_20s,accel_rms,accel_peak,ppg_std,time_of_day\n\
                 62.0,3.1,0.1,two,0.05,0.3,0.2,0.9\n";

    let err = score_csv(&forest, input.as_bytes(), Vec::new()).unwrap_err();
    assert!(format!("{err:#}").contains("steps_20s"));

    Ok(())
}

#[test]
fn header_only_input_scores_nothing() -> Result<()> {
    let forest = get_forest("./tests/test-forests/anomaly_3.csv")?;
    let input = "hr_mean,hr_std,hr_slope,steps_20s,accel_rms,accel_peak,ppg_std,time_of_day\n";

    let mut output = Vec::new();
    assert_eq!(score_csv(&forest, input.as_bytes(), &mut output)?, 0);
    assert_eq!(
        String::from_utf8(output)?,
        "hr_mean,hr_std,hr_slope,steps_20s,accel_rms,accel_peak,ppg_std,time_of_day,confidence\n"
    );

    Ok(())
}
