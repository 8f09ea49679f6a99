//! Compact binary encoding for targets without a JSON parser.
//!
//! All integers and floats are little-endian and every record is unaligned,
//! so a buffer can be decoded straight from flash or `include_bytes!`.
//!
//! ```text
//! header      24 bytes   magic "AFST", version, class count, 2 padding,
//!                        tree count, feature count, node count, name bytes
//! tree table  4 * trees  node count of each tree
//! nodes       20 * nodes feature: i32, threshold: f64, left: i32, right: i32
//! weights     8 * nodes * classes, node-major
//! names       newline-separated UTF-8 feature names
//! ```

use alloc::{format, string::String, vec::Vec};

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::little_endian::{F64, I32, U32},
};

use crate::{Error, Malformation};

use super::{
    Forest, NUM_CLASSES,
    tree::{Tree, TreeArrays},
};

pub const MAGIC: [u8; 4] = *b"AFST";
pub const VERSION: u8 = 1;

#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct Header {
    magic: [u8; 4],
    version: u8,
    num_classes: u8,
    _padding: [u8; 2],
    num_trees: U32,
    num_features: U32,
    num_nodes: U32,
    names_len: U32,
}

#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct PackedNode {
    feature: I32,
    threshold: F64,
    left: I32,
    right: I32,
}

impl Forest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let names = self.features.join("\n");
        let num_nodes: usize = self.trees.iter().map(Tree::num_nodes).sum();

        let header = Header {
            magic: MAGIC,
            version: VERSION,
            num_classes: NUM_CLASSES as u8,
            _padding: [0; 2],
            num_trees: count(self.trees.len(), "trees")?,
            num_features: count(self.features.len(), "features")?,
            num_nodes: count(num_nodes, "nodes")?,
            names_len: count(names.len(), "feature name bytes")?,
        };

        let mut bytes = Vec::with_capacity(
            size_of::<Header>()
                + self.trees.len() * size_of::<U32>()
                + num_nodes * (size_of::<PackedNode>() + NUM_CLASSES * size_of::<F64>())
                + names.len(),
        );

        bytes.extend_from_slice(header.as_bytes());

        for tree in &self.trees {
            bytes.extend_from_slice(count(tree.num_nodes(), "nodes")?.as_bytes());
        }

        for tree in &self.trees {
            let arrays = tree.arrays();
            for idx in 0..tree.num_nodes() {
                let node = PackedNode {
                    feature: I32::new(arrays.feature[idx]),
                    threshold: F64::new(arrays.threshold[idx]),
                    left: I32::new(arrays.left[idx]),
                    right: I32::new(arrays.right[idx]),
                };
                bytes.extend_from_slice(node.as_bytes());
            }
        }

        for tree in &self.trees {
            for weight in tree.arrays().value.iter().flatten() {
                bytes.extend_from_slice(F64::new(*weight).as_bytes());
            }
        }

        bytes.extend_from_slice(names.as_bytes());

        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (header, rest) =
            Header::read_from_prefix(bytes).map_err(|_| parse("truncated header"))?;

        if header.magic != MAGIC {
            return Err(parse("not a packed forest"));
        }
        if header.version != VERSION {
            return Err(Error::Parse(format!(
                "unsupported packed forest version {}",
                header.version
            )));
        }

        let num_classes = header.num_classes as usize;
        if num_classes != NUM_CLASSES {
            return Err(Malformation::ClassCount(num_classes).into());
        }
        let num_trees = header.num_trees.get() as usize;
        let num_nodes = header.num_nodes.get() as usize;
        let names_len = header.names_len.get() as usize;

        let (sizes, rest) = <[U32]>::ref_from_prefix_with_elems(rest, num_trees)
            .map_err(|_| parse("truncated tree table"))?;
        let total = sizes
            .iter()
            .try_fold(0usize, |acc, size| acc.checked_add(size.get() as usize));
        if total != Some(num_nodes) {
            return Err(parse("tree table does not add up to the node count"));
        }

        let (nodes, rest) = <[PackedNode]>::ref_from_prefix_with_elems(rest, num_nodes)
            .map_err(|_| parse("truncated node records"))?;
        let num_weights = num_nodes
            .checked_mul(num_classes)
            .ok_or_else(|| parse("class weight count overflows"))?;
        let (weights, rest) = <[F64]>::ref_from_prefix_with_elems(rest, num_weights)
            .map_err(|_| parse("truncated class weights"))?;

        if rest.len() < names_len {
            return Err(parse("truncated feature names"));
        }
        if rest.len() > names_len {
            return Err(parse("trailing bytes after feature names"));
        }
        let names = core::str::from_utf8(rest)
            .map_err(|e| Error::Parse(format!("feature names are not UTF-8: {e}")))?;
        let features: Vec<&str> = if names.is_empty() {
            Vec::new()
        } else {
            names.split('\n').collect()
        };
        if features.len() != header.num_features.get() as usize {
            return Err(parse("feature count does not match the name block"));
        }

        let mut trees = Vec::with_capacity(num_trees);
        let (mut nodes, mut weights) = (nodes, weights);
        for size in sizes {
            let size = size.get() as usize;
            let (tree_nodes, rest_nodes) = nodes.split_at(size);
            let (tree_weights, rest_weights) = weights.split_at(size * num_classes);
            nodes = rest_nodes;
            weights = rest_weights;

            trees.push(TreeArrays {
                feature: tree_nodes.iter().map(|n| n.feature.get()).collect(),
                threshold: tree_nodes.iter().map(|n| n.threshold.get()).collect(),
                left: tree_nodes.iter().map(|n| n.left.get()).collect(),
                right: tree_nodes.iter().map(|n| n.right.get()).collect(),
                value: tree_weights
                    .chunks(num_classes)
                    .map(|row| row.iter().map(|w| w.get()).collect())
                    .collect(),
            });
        }

        Self::new(features, trees)
    }
}

fn count(n: usize, what: &str) -> Result<U32, Error> {
    u32::try_from(n)
        .map(U32::new)
        .map_err(|_| Error::Encode(format!("too many {what} for the packed format: {n}")))
}

fn parse(msg: &str) -> Error {
    Error::Parse(String::from(msg))
}
