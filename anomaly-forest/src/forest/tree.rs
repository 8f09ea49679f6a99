use alloc::{vec, vec::Vec};
use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::{Error, Malformation};

use super::{Distribution, NUM_CLASSES};

/// `feature` marker of a node without a split.
pub const LEAF: i32 = -2;

/// `left`/`right` marker of an absent child.
pub const NO_CHILD: i32 = -1;

/// The per-node arrays of one tree, exactly as a trainer exports them.
///
/// This is the wire record. It is not validated; [`Forest::new`] turns a set
/// of these into validated [`Tree`]s.
///
/// [`Forest::new`]: super::Forest::new
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeArrays {
    /// Split feature per node, [`LEAF`] at leaves.
    pub feature: Vec<i32>,
    /// Split threshold per node. Trainers store a placeholder at leaves.
    pub threshold: Vec<f64>,
    /// Left child per node, [`NO_CHILD`] at leaves.
    pub left: Vec<i32>,
    /// Right child per node, [`NO_CHILD`] at leaves.
    pub right: Vec<i32>,
    /// Class weights of the training samples that reached each node.
    #[serde(deserialize_with = "value_rows")]
    pub value: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRow {
    Flat(Vec<f64>),
    /// Trainers with multi-output support nest the class vector once more.
    Nested(Vec<Vec<f64>>),
}

fn value_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<ValueRow>::deserialize(deserializer)?
        .into_iter()
        .map(|row| match row {
            ValueRow::Flat(weights) => Ok(weights),
            ValueRow::Nested(mut outputs) if outputs.len() == 1 => {
                Ok(outputs.pop().unwrap_or_default())
            }
            ValueRow::Nested(outputs) => Err(D::Error::custom(alloc::format!(
                "expected one output per node, found {}",
                outputs.len()
            ))),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    pub split_with: usize,
    pub split_at: f64,
    pub left: usize,
    pub right: usize,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Branch | split_with: {}, split_at: {}, left: {}, right: {}",
            self.split_with, self.split_at, self.left, self.right
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Branch(Branch),
    Leaf,
}

impl Node {
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }
}

/// A validated decision tree.
///
/// Every node is reachable from the root (node 0) along exactly one path,
/// so a walk from the root ends at a leaf in fewer steps than there are
/// nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Tree {
    arrays: TreeArrays,
}

impl Tree {
    /// Check `arrays` against every structural invariant. `tree` is only
    /// used to name the offending tree in errors.
    pub(crate) fn validate(
        tree: usize,
        arrays: TreeArrays,
        num_features: usize,
    ) -> Result<Self, Malformation> {
        let num_nodes = arrays.feature.len();
        if num_nodes == 0 {
            return Err(Malformation::EmptyTree { tree });
        }

        let lengths = [
            ("threshold", arrays.threshold.len()),
            ("left", arrays.left.len()),
            ("right", arrays.right.len()),
            ("value", arrays.value.len()),
        ];
        for (array, len) in lengths {
            if len != num_nodes {
                return Err(Malformation::LengthMismatch {
                    tree,
                    array,
                    len,
                    expected: num_nodes,
                });
            }
        }

        let mut has_parent = vec![false; num_nodes];

        for node in 0..num_nodes {
            let row = &arrays.value[node];
            if row.len() != NUM_CLASSES {
                return Err(Malformation::RaggedValue {
                    tree,
                    node,
                    len: row.len(),
                    expected: NUM_CLASSES,
                });
            }
            // the row sum is the leaf normalizer
            if row.iter().any(|w| !w.is_finite() || *w < 0.0)
                || !row.iter().sum::<f64>().is_finite()
            {
                return Err(Malformation::InvalidWeight { tree, node });
            }
            if !arrays.threshold[node].is_finite() {
                return Err(Malformation::NonFiniteThreshold { tree, node });
            }

            let (feature, left, right) = (arrays.feature[node], arrays.left[node], arrays.right[node]);
            let is_leaf = feature == LEAF;
            if is_leaf != (left == NO_CHILD) || is_leaf != (right == NO_CHILD) {
                return Err(Malformation::InconsistentLeaf {
                    tree,
                    node,
                    feature,
                    left,
                    right,
                });
            }
            if is_leaf {
                continue;
            }

            if feature < 0 || feature as usize >= num_features {
                return Err(Malformation::FeatureOutOfRange {
                    tree,
                    node,
                    feature,
                    num_features,
                });
            }

            for child in [left, right] {
                if child < 0 || child as usize >= num_nodes {
                    return Err(Malformation::DanglingChild { tree, node, child });
                }
                let child = child as usize;
                if child == 0 {
                    return Err(Malformation::ChildIsRoot { tree, node });
                }
                if has_parent[child] {
                    return Err(Malformation::SharedChild { tree, child });
                }
                has_parent[child] = true;
            }
        }

        // With at most one parent per node and none for the root, whatever
        // the root can reach is a proper tree. Anything left over is either
        // detached or sits on a cycle.
        let mut reached = vec![false; num_nodes];
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            reached[node] = true;
            if arrays.feature[node] != LEAF {
                stack.push(arrays.left[node] as usize);
                stack.push(arrays.right[node] as usize);
            }
        }
        if let Some(node) = reached.iter().position(|r| !r) {
            return Err(Malformation::Unreachable { tree, node });
        }

        Ok(Self { arrays })
    }

    /// Validate a standalone tree over `num_features` inputs. Errors name
    /// the tree as tree 0.
    pub fn new(arrays: TreeArrays, num_features: usize) -> Result<Self, Error> {
        check_class_count(&arrays)?;
        Ok(Self::validate(0, arrays, num_features)?)
    }

    pub fn num_nodes(&self) -> usize {
        self.arrays.feature.len()
    }

    pub fn node(&self, idx: usize) -> Node {
        if self.arrays.feature[idx] == LEAF {
            return Node::Leaf;
        }

        Node::Branch(Branch {
            split_with: self.arrays.feature[idx] as usize,
            split_at: self.arrays.threshold[idx],
            left: self.arrays.left[idx] as usize,
            right: self.arrays.right[idx] as usize,
        })
    }

    /// The class weights recorded at a node.
    pub fn weights(&self, idx: usize) -> &[f64] {
        &self.arrays.value[idx]
    }

    pub fn arrays(&self) -> &TreeArrays {
        &self.arrays
    }

    pub fn num_leaves(&self) -> usize {
        self.arrays.feature.iter().filter(|&&f| f == LEAF).count()
    }

    /// Leaves whose class weights sum to zero.
    pub fn degenerate_leaves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_nodes())
            .filter(|&idx| self.node(idx).is_leaf() && self.weights(idx).iter().sum::<f64>() == 0.0)
    }

    /// Number of splits on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];

        while let Some((idx, depth)) = stack.pop() {
            match self.node(idx) {
                Node::Branch(b) => {
                    stack.push((b.left, depth + 1));
                    stack.push((b.right, depth + 1));
                }
                Node::Leaf => deepest = deepest.max(depth),
            }
        }

        deepest
    }

    /// Walk from the root to the leaf selected by `features`.
    ///
    /// `features` must already be in canonical order; ties at a threshold go
    /// left. `None` if a split tests a feature past the end of `features`.
    pub fn leaf(&self, features: &[f64]) -> Option<usize> {
        let mut idx = 0;
        while let Node::Branch(b) = self.node(idx) {
            idx = if *features.get(b.split_with)? <= b.split_at {
                b.left
            } else {
                b.right
            };
        }
        Some(idx)
    }

    /// The class weights of node `idx` scaled to sum to one, or `None` if
    /// they sum to zero.
    pub fn distribution(&self, idx: usize) -> Option<Distribution> {
        let weights = self.weights(idx);
        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            return None;
        }

        let mut dist = heapless::Vec::<f64, NUM_CLASSES>::new();
        for weight in weights {
            dist.push(weight / total).ok()?;
        }
        Some(Distribution(dist))
    }
}

/// Check the width of the first class vector. The other rows are checked
/// node by node during validation.
pub(crate) fn check_class_count(arrays: &TreeArrays) -> Result<(), Malformation> {
    match arrays.value.first() {
        Some(row) if row.len() != NUM_CLASSES => Err(Malformation::ClassCount(row.len())),
        _ => Ok(()),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf => write!(f, "Leaf"),
            Node::Branch(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..self.num_nodes() {
            let node = self.node(idx);
            if node.is_leaf() {
                writeln!(f, "\t{idx}: {node}   | weights: {:?}", self.weights(idx))?;
            } else {
                writeln!(f, "\t{idx}: {node}")?;
            }
        }
        Ok(())
    }
}
