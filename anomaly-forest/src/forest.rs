use alloc::{collections::BTreeSet, string::String, vec::Vec};
use core::{fmt, ops::Deref};

use crate::{Error, FeatureSource, Malformation};

use self::tree::{Node, Tree, TreeArrays};

pub mod json;
pub mod packed;
pub mod tree;

/// Number of classes every forest distinguishes: normal and anomaly.
pub const NUM_CLASSES: usize = 2;

/// Class index whose probability is reported as the confidence score.
pub const POSITIVE_CLASS: usize = 1;

/// A class distribution averaged over every tree of a forest.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution(heapless::Vec<f64, NUM_CLASSES>);

impl Distribution {
    /// Probability of the anomaly class.
    pub fn positive(&self) -> f64 {
        self.0[POSITIVE_CLASS]
    }
}

impl Deref for Distribution {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An immutable, validated random forest classifier.
///
/// Trees vote with equal weight: the output distribution is the plain mean
/// of every tree's normalized leaf distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    features: Vec<String>,
    trees: Vec<Tree>,
}

impl Forest {
    /// Validate a set of exported trees against a canonical feature ordering.
    ///
    /// Every node must carry exactly [`NUM_CLASSES`] class weights.
    pub fn new<S: Into<String>>(
        features: impl IntoIterator<Item = S>,
        trees: Vec<TreeArrays>,
    ) -> Result<Self, Error> {
        let features: Vec<String> = features.into_iter().map(Into::into).collect();

        if features.is_empty() {
            return Err(Malformation::NoFeatures.into());
        }
        let mut seen = BTreeSet::new();
        for name in &features {
            if name.is_empty() || name.contains(['\n', '\r']) {
                return Err(Malformation::InvalidFeatureName(name.clone()).into());
            }
            if !seen.insert(name.as_str()) {
                return Err(Malformation::DuplicateFeature(name.clone()).into());
            }
        }

        let first = trees.first().ok_or(Malformation::NoTrees)?;
        tree::check_class_count(first)?;

        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(idx, arrays)| Tree::validate(idx, arrays, features.len()))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "loaded forest: {} trees, {} nodes, {} features, {} classes",
            trees.len(),
            trees.iter().map(Tree::num_nodes).sum::<usize>(),
            features.len(),
            NUM_CLASSES
        );

        Ok(Self { features, trees })
    }

    /// The canonical feature ordering every input is laid out in.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// How many splits test each feature, in canonical order.
    pub fn feature_usage(&self) -> Vec<(&str, usize)> {
        let mut counts = alloc::vec![0; self.features.len()];
        for tree in &self.trees {
            for idx in 0..tree.num_nodes() {
                if let Node::Branch(b) = tree.node(idx) {
                    counts[b.split_with] += 1;
                }
            }
        }

        self.features
            .iter()
            .map(String::as_str)
            .zip(counts)
            .collect()
    }

    /// Probability that `input` is an anomaly.
    pub fn predict<S: FeatureSource + ?Sized>(&self, input: &S) -> Result<f64, Error> {
        Ok(self.predict_proba(input)?.positive())
    }

    /// Mean class distribution over all trees.
    ///
    /// The input is checked in full before any tree is walked.
    pub fn predict_proba<S: FeatureSource + ?Sized>(
        &self,
        input: &S,
    ) -> Result<Distribution, Error> {
        let features = input.arrange(&self.features)?;

        let mut sums = heapless::Vec::<f64, NUM_CLASSES>::new();
        sums.resize(NUM_CLASSES, 0.0)
            .map_err(|_| Malformation::ClassCount(NUM_CLASSES))?;

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let leaf = tree
                .leaf(&features)
                .ok_or(Error::FeatureCountMismatch {
                    expected: self.features.len(),
                    actual: features.len(),
                })?;
            let dist = tree.distribution(leaf).ok_or(Error::DegenerateLeaf {
                tree: tree_idx,
                node: leaf,
            })?;

            for (sum, p) in sums.iter_mut().zip(dist.iter()) {
                *sum += p;
            }
        }

        let num_trees = self.trees.len() as f64;
        for sum in sums.iter_mut() {
            *sum /= num_trees;
        }

        log::trace!("forest distribution: {:?}", sums.as_slice());

        Ok(Distribution(sums))
    }
}

impl fmt::Display for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Classification Forest: {} trees, size {}, {} features, {} classes\n------------",
            self.trees.len(),
            self.trees.iter().map(Tree::num_nodes).sum::<usize>(),
            self.features.len(),
            NUM_CLASSES,
        )?;
        for (i, tree) in self.trees.iter().enumerate() {
            writeln!(f, "Tree {i}:")?;
            write!(f, "{tree}")?;
        }
        writeln!(f, "------------")?;

        writeln!(f, "Features: ")?;
        for (i, name) in self.features.iter().enumerate() {
            writeln!(f, "\t{i}: {name}")?;
        }
        writeln!(f, "------------")?;

        Ok(())
    }
}
