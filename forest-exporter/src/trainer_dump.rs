//! Reader for the per-node CSV dump a forest trainer writes after fitting.
//!
//! The first line is `#` followed by a JSON header carrying the canonical
//! feature ordering. Every following row describes one node:
//!
//! ```text
//! # {"features": ["hr_mean", "steps_20s"], "trainer": "RandomForestClassifier(n_estimators=30)"}
//! tree,node,feature,threshold,left,right,value_0,value_1
//! 0,0,hr_mean,80.0,1,2,213,74
//! 0,1,NA,-2.0,-1,-1,120,4
//! ...
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anomaly_forest::forest::tree::LEAF;
use anomaly_forest::{Forest, TreeArrays};
use color_eyre::Result;
use color_eyre::eyre::{OptionExt, WrapErr, bail, eyre};
use serde::{Deserialize, Deserializer};

/// Metadata carried on the first line of a dump.
#[derive(Debug, Clone, Deserialize)]
pub struct DumpHeader {
    /// Canonical feature ordering the trainer was fed.
    pub features: Vec<String>,
    /// Free-form description of the trainer and its parameters.
    #[serde(default)]
    pub trainer: Option<String>,
}

/// A single node of a [`TrainerDump`]
#[derive(Debug, Clone, Deserialize)]
pub struct DumpNode {
    /// Tree index. 0-indexed.
    pub tree: usize,
    /// Node index within its tree. 0-indexed, the root is 0.
    pub node: usize,
    /// The feature on which to split, `NA` at leaves
    #[serde(deserialize_with = "string_or_na")]
    pub feature: Option<String>,
    /// The split point
    pub threshold: f64,
    /// Pointer to the left child, -1 at leaves
    pub left: i32,
    /// Pointer to the right child, -1 at leaves
    pub right: i32,
    /// Weight of normal training samples that reached this node
    pub value_0: f64,
    /// Weight of anomalous training samples that reached this node
    pub value_1: f64,
}

#[derive(Debug)]
pub struct TrainerDump {
    header: DumpHeader,
    nodes: Vec<DumpNode>,
}

impl TrainerDump {
    pub fn header(&self) -> &DumpHeader {
        &self.header
    }

    /// Get the feature ordering of this dump
    pub fn features(&self) -> &[String] {
        &self.header.features
    }

    pub fn nodes(&self) -> &[DumpNode] {
        &self.nodes
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .wrap_err_with(|| format!("Could not open trainer dump {}", path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(rdr: R) -> Result<Self> {
        let mut rdr = BufReader::new(rdr);
        let header = Self::read_header(&mut rdr)?;

        let mut rdr = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let nodes = rdr
            .deserialize()
            .collect::<Result<Vec<DumpNode>, _>>()
            .wrap_err("Malformed node row in trainer dump")?;

        Ok(Self { header, nodes })
    }

    fn read_header(rdr: &mut impl BufRead) -> Result<DumpHeader> {
        let mut line = String::new();
        rdr.read_line(&mut line)?;

        let header = line
            .trim()
            .strip_prefix('#')
            .ok_or_eyre("Malformed trainer dump. First line doesn't start with '#'.")?;

        serde_json::from_str(header)
            .wrap_err("Malformed trainer dump. First line doesn't contain a valid JSON header.")
    }

    /// Convert the dump into a validated [`Forest`].
    ///
    /// Trees and the nodes within each tree must be numbered without gaps.
    /// Split features are resolved against the header's feature ordering.
    pub fn into_forest(self) -> Result<Forest> {
        let feature_ids = self
            .header
            .features
            .iter()
            .enumerate()
            .map(|(i, name)| Ok((name.as_str(), i32::try_from(i)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let mut grouped: BTreeMap<usize, Vec<DumpNode>> = BTreeMap::new();
        for node in self.nodes {
            grouped.entry(node.tree).or_default().push(node);
        }

        // Check that all trees are numbered sequentially
        for (expected, &tree) in grouped.keys().enumerate() {
            if tree != expected {
                bail!("Mismatch within tree indices: expected tree {expected}, found tree {tree}");
            }
        }

        let mut trees = Vec::with_capacity(grouped.len());
        for (tree, mut nodes) in grouped {
            nodes.sort_by_key(|n| n.node);

            let mut arrays = TreeArrays {
                feature: Vec::with_capacity(nodes.len()),
                threshold: Vec::with_capacity(nodes.len()),
                left: Vec::with_capacity(nodes.len()),
                right: Vec::with_capacity(nodes.len()),
                value: Vec::with_capacity(nodes.len()),
            };

            for (expected, node) in nodes.into_iter().enumerate() {
                if node.node != expected {
                    bail!(
                        "Mismatch within node indices of tree {tree}: expected node {expected}, found node {}",
                        node.node
                    );
                }

                let feature = match &node.feature {
                    Some(name) => *feature_ids.get(name.as_str()).ok_or_else(|| {
                        eyre!("Tree {tree}, node {expected} splits on unknown feature `{name}`")
                    })?,
                    None => LEAF,
                };

                arrays.feature.push(feature);
                arrays.threshold.push(node.threshold);
                arrays.left.push(node.left);
                arrays.right.push(node.right);
                arrays.value.push(vec![node.value_0, node.value_1]);
            }

            trees.push(arrays);
        }

        let forest = Forest::new(self.header.features, trees)?;
        Ok(forest)
    }
}

/// Deserialize a string into an `Option<String>`, returning `None` if the
/// string is empty or the literal "NA".
fn string_or_na<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;

    if s == "NA" || s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(s))
    }
}
