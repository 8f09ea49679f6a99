#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

extern crate alloc;

mod error;
pub mod features;
pub mod forest;

#[cfg(feature = "std")]
pub mod handle;

pub use error::{Error, FeatureRef, Malformation};
pub use features::{FeatureSource, PRODUCTION_FEATURES, TOY_FEATURES};
pub use forest::tree::{Branch, Node, Tree, TreeArrays};
pub use forest::{Distribution, Forest, NUM_CLASSES, POSITIVE_CLASS};

/// Load a forest from either of its portable encodings.
///
/// Buffers starting with the packed magic are decoded as packed binary,
/// everything else is treated as JSON.
pub fn load_forest(bytes: &[u8]) -> Result<Forest, Error> {
    if bytes.starts_with(&forest::packed::MAGIC) {
        log::debug!("decoding {} bytes as a packed forest", bytes.len());
        Forest::from_bytes(bytes)
    } else {
        log::debug!("decoding {} bytes as a JSON forest", bytes.len());
        Forest::from_json(bytes)
    }
}
