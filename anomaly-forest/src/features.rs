//! Canonical feature orderings and the adaptation of caller input to them.
//!
//! A forest only understands an input vector laid out in the exact order of
//! its feature names. [`FeatureSource`] turns whatever the caller holds (an
//! already ordered slice, or a name → value map) into that layout, rejecting
//! incompatible input before any tree is walked.

use alloc::{borrow::Cow, collections::BTreeMap, string::String, vec::Vec};
use core::borrow::Borrow;

use crate::{Error, FeatureRef};

/// Feature ordering of the production wearable model.
pub const PRODUCTION_FEATURES: [&str; 8] = [
    "hr_mean",     // bpm
    "hr_std",      // bpm variability (RMSSD)
    "hr_slope",    // delta bpm / second
    "steps_20s",   // steps in the last 20 seconds
    "accel_rms",   // movement intensity
    "accel_peak",  // sudden motion
    "ppg_std",     // blood volume pulse variability
    "time_of_day", // normalized, 1.0 is 2:30 a.m.
];

/// Feature ordering of the two-feature demonstration model.
pub const TOY_FEATURES: [&str; 2] = ["hr_mean", "steps_20s"];

/// Something that can be laid out as a forest's input vector.
pub trait FeatureSource {
    /// Produce the values in the order given by `names`.
    ///
    /// Every returned value is finite.
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error>;
}

impl FeatureSource for [f64] {
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error> {
        if self.len() != names.len() {
            return Err(Error::FeatureCountMismatch {
                expected: names.len(),
                actual: self.len(),
            });
        }

        if let Some(idx) = self.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidFeatureValue(FeatureRef::Index(idx)));
        }

        Ok(Cow::Borrowed(self))
    }
}

impl<const N: usize> FeatureSource for [f64; N] {
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error> {
        self.as_slice().arrange(names)
    }
}

impl FeatureSource for Vec<f64> {
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error> {
        self.as_slice().arrange(names)
    }
}

impl<K: Borrow<str> + Ord> FeatureSource for BTreeMap<K, f64> {
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error> {
        arrange_named(names, |name| self.get(name).copied())
    }
}

#[cfg(feature = "std")]
impl<K, S> FeatureSource for std::collections::HashMap<K, f64, S>
where
    K: Borrow<str> + core::hash::Hash + Eq,
    S: core::hash::BuildHasher,
{
    fn arrange<'a>(&'a self, names: &[String]) -> Result<Cow<'a, [f64]>, Error> {
        arrange_named(names, |name| self.get(name).copied())
    }
}

/// Look every canonical name up, in order. Keys the forest doesn't know
/// about are ignored.
fn arrange_named<'a>(
    names: &[String],
    lookup: impl Fn(&str) -> Option<f64>,
) -> Result<Cow<'a, [f64]>, Error> {
    let mut values = Vec::with_capacity(names.len());

    for name in names {
        let value = lookup(name).ok_or_else(|| Error::MissingFeature(name.clone()))?;
        if !value.is_finite() {
            return Err(Error::InvalidFeatureValue(FeatureRef::Name(name.clone())));
        }
        values.push(value);
    }

    Ok(Cow::Owned(values))
}
