//! Batch scoring of CSV rows.

use std::collections::HashMap;
use std::io;

use anomaly_forest::Forest;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;

/// Name of the column appended to every scored row
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// Score every row of `input` and write it back out with a trailing
/// [`CONFIDENCE_COLUMN`].
///
/// Features are looked up by column name, so columns may come in any order
/// and columns the forest doesn't use are passed through untouched.
/// Returns the number of rows scored.
pub fn score_csv<R: io::Read, W: io::Write>(forest: &Forest, input: R, output: W) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut wtr = csv::Writer::from_writer(output);

    let headers = rdr.headers().wrap_err("Could not read CSV header")?.clone();

    // A feature without a column is left out, so every row reports it missing
    let columns: Vec<(&str, usize)> = forest
        .features()
        .iter()
        .filter_map(|name| {
            headers
                .iter()
                .position(|h| h == name)
                .map(|pos| (name.as_str(), pos))
        })
        .collect();

    let mut out_headers = headers.clone();
    out_headers.push_field(CONFIDENCE_COLUMN);
    wtr.write_record(&out_headers)?;

    let mut scored = 0;
    for (idx, record) in rdr.records().enumerate() {
        let row = idx + 1;
        let mut record = record.wrap_err_with(|| format!("Malformed row {row}"))?;

        let mut features = HashMap::with_capacity(columns.len());
        for &(name, pos) in &columns {
            let cell = record.get(pos).unwrap_or_default();
            let value: f64 = cell
                .parse()
                .wrap_err_with(|| format!("Row {row}: `{name}` is not a number: {cell:?}"))?;
            features.insert(name, value);
        }

        let confidence = forest
            .predict(&features)
            .wrap_err_with(|| format!("Could not score row {row}"))?;
        tracing::trace!(row, confidence, "scored row");

        record.push_field(&confidence.to_string());
        wtr.write_record(&record)?;
        scored += 1;
    }

    wtr.flush()?;
    Ok(scored)
}
