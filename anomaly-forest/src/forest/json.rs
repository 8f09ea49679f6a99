//! The portable JSON encoding.
//!
//! ```text
//! {
//!   "features": ["hr_mean", ...],
//!   "trees": [
//!     {"feature": [..], "threshold": [..], "left": [..], "right": [..], "value": [[..], ..]},
//!     ...
//!   ]
//! }
//! ```
//!
//! Each tree is a set of parallel arrays indexed by node, in the order the
//! trainer produced them (node 0 is the root).

use alloc::{format, string::String, vec::Vec};

use serde::{Deserialize, Serialize};

use crate::Error;

use super::{
    Forest,
    tree::{Tree, TreeArrays},
};

#[derive(Serialize)]
struct ForestRef<'a> {
    features: &'a [String],
    trees: &'a [Tree],
}

#[derive(Deserialize)]
struct OwnedForest {
    features: Vec<String>,
    trees: Vec<TreeArrays>,
}

impl Forest {
    /// Encode this forest as JSON.
    ///
    /// The output only depends on the forest's contents, so equal forests
    /// always encode to identical bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        let record = ForestRef {
            features: &self.features,
            trees: &self.trees,
        };
        serde_json::to_vec(&record).map_err(|e| Error::Encode(format!("{e}")))
    }

    /// Decode a forest that carries its own feature ordering.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let record: OwnedForest = serde_json::from_slice(bytes).map_err(parse_error)?;
        Self::new(record.features, record.trees)
    }

    /// Decode a bare array of tree records whose feature ordering was agreed
    /// out of band.
    pub fn from_json_with_features<S: Into<String>>(
        bytes: &[u8],
        features: impl IntoIterator<Item = S>,
    ) -> Result<Self, Error> {
        let trees: Vec<TreeArrays> = serde_json::from_slice(bytes).map_err(parse_error)?;
        Self::new(features, trees)
    }
}

fn parse_error(e: serde_json::Error) -> Error {
    Error::Parse(format!("{e}"))
}
