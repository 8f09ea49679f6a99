use alloc::string::String;
use core::fmt;

use crate::forest::NUM_CLASSES;

/// Everything that can go wrong while loading a forest or scoring an input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The serialized input is not well-formed or has the wrong shape.
    #[error("could not parse forest: {0}")]
    Parse(String),

    /// The input parsed, but describes a structurally invalid forest.
    #[error("malformed forest: {0}")]
    MalformedForest(#[from] Malformation),

    /// The forest could not be written out.
    #[error("could not encode forest: {0}")]
    Encode(String),

    #[error("missing feature `{0}`")]
    MissingFeature(String),

    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("feature {0} is not a finite number")]
    InvalidFeatureValue(FeatureRef),

    /// A leaf with no recorded class weight was reached.
    #[error("tree {tree} reached leaf {node}, which carries no class weight")]
    DegenerateLeaf { tree: usize, node: usize },
}

impl Error {
    /// Whether the caller supplied a bad feature vector, as opposed to the
    /// forest itself being broken.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MissingFeature(_)
                | Error::FeatureCountMismatch { .. }
                | Error::InvalidFeatureValue(_)
        )
    }
}

/// Identifies an input feature either by its canonical name or its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureRef {
    Name(String),
    Index(usize),
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureRef::Name(name) => write!(f, "`{name}`"),
            FeatureRef::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// The invariant a rejected forest violates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Malformation {
    #[error("forest has no trees")]
    NoTrees,

    #[error("forest has no features")]
    NoFeatures,

    #[error("feature `{0}` is listed more than once")]
    DuplicateFeature(String),

    #[error("feature name `{0}` is empty or contains a line break")]
    InvalidFeatureName(String),

    #[error("forest has {0} classes, expected {expected}", expected = NUM_CLASSES)]
    ClassCount(usize),

    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("tree {tree}: `{array}` has {len} entries, expected {expected}")]
    LengthMismatch {
        tree: usize,
        array: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("tree {tree}, node {node}: class vector has {len} entries, expected {expected}")]
    RaggedValue {
        tree: usize,
        node: usize,
        len: usize,
        expected: usize,
    },

    #[error("tree {tree}, node {node}: class weights must be non-negative with a finite sum")]
    InvalidWeight { tree: usize, node: usize },

    #[error("tree {tree}, node {node}: threshold is not finite")]
    NonFiniteThreshold { tree: usize, node: usize },

    #[error(
        "tree {tree}, node {node}: leaf markers disagree (feature {feature}, left {left}, right {right})"
    )]
    InconsistentLeaf {
        tree: usize,
        node: usize,
        feature: i32,
        left: i32,
        right: i32,
    },

    #[error("tree {tree}, node {node}: feature index {feature} is out of range for {num_features} features")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: i32,
        num_features: usize,
    },

    #[error("tree {tree}, node {node}: child index {child} does not exist")]
    DanglingChild { tree: usize, node: usize, child: i32 },

    #[error("tree {tree}, node {node}: child points back at the root")]
    ChildIsRoot { tree: usize, node: usize },

    #[error("tree {tree}: node {child} has more than one parent")]
    SharedChild { tree: usize, child: usize },

    #[error("tree {tree}: node {node} is not reachable from the root")]
    Unreachable { tree: usize, node: usize },
}
