use std::collections::HashMap;

/// Feature windows and the confidence the `anomaly_3` forest assigns them
#[derive(serde::Deserialize, Debug)]
pub(crate) struct DataPoint {
    pub hr_mean: f64,
    pub hr_std: f64,
    pub hr_slope: f64,
    pub steps_20s: f64,
    pub accel_rms: f64,
    pub accel_peak: f64,
    pub ppg_std: f64,
    pub time_of_day: f64,
    #[serde(rename = "confidence")]
    pub forest_confidence: f64,
}

impl DataPoint {
    pub fn named_features(&self) -> HashMap<&'static str, f64> {
        HashMap::from([
            ("hr_mean", self.hr_mean),
            ("hr_std", self.hr_std),
            ("hr_slope", self.hr_slope),
            ("steps_20s", self.steps_20s),
            ("accel_rms", self.accel_rms),
            ("accel_peak", self.accel_peak),
            ("ppg_std", self.ppg_std),
            ("time_of_day", self.time_of_day),
        ])
    }

    /// Lay the features out in the order `features` names them.
    pub fn transform_features(&self, features: &[String]) -> Vec<f64> {
        let named = self.named_features();
        features.iter().map(|name| named[name.as_str()]).collect()
    }
}
