//! LightGBM text model parser
//!
//! Reads the line-based `key=value` format written by `Booster.save_model()`:
//! a header block, one block per `Tree=N`, then an `end of trees` marker
//! followed by importances and parameters, which are ignored.

use std::collections::HashMap;
use std::str::FromStr;

use super::{DecisionType, Objective, ParseError, Tree};

/// Header fields needed for scoring
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    /// Format version (e.g. "v4")
    pub version: String,
    /// Number of classes (1 for regression and binary)
    pub num_class: usize,
    /// Trees per boosting iteration
    pub num_tree_per_iteration: usize,
    /// Highest feature index the model may read
    pub max_feature_idx: usize,
    /// Output transform
    pub objective: Objective,
    /// Average tree outputs instead of summing (random forest mode)
    pub average_output: bool,
    /// Column names recorded at training time
    pub feature_names: Vec<String>,
}

type Lines<'a> = std::iter::Peekable<std::str::Lines<'a>>;

/// Parse a complete model into its header and trees
pub(crate) fn parse_model(content: &str) -> Result<(ModelHeader, Vec<Tree>), ParseError> {
    let mut lines = content.lines().peekable();
    let header = parse_header(&mut lines)?;
    let num_features = header.max_feature_idx + 1;

    let mut trees = Vec::new();
    while let Some(line) = lines.next() {
        let line = line.trim_end();
        if line == "end of trees" {
            break;
        }
        if line.starts_with("Tree=") {
            let block = read_block(&mut lines);
            let tree = parse_tree(&block, trees.len(), num_features)?;
            trees.push(tree);
        }
    }

    if trees.is_empty() {
        return Err(ParseError::NoTrees);
    }
    Ok((header, trees))
}

/// Collect `key=value` lines until a blank line or the next section
fn read_block(lines: &mut Lines<'_>) -> HashMap<String, String> {
    let mut kv = HashMap::new();
    while let Some(line) = lines.peek() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with("Tree=") || line == "end of trees" {
            break;
        }
        if let Some((key, value)) = line.split_once('=') {
            kv.insert(key.to_string(), value.to_string());
        }
        lines.next();
    }
    kv
}

fn parse_header(lines: &mut Lines<'_>) -> Result<ModelHeader, ParseError> {
    let mut kv = HashMap::new();
    let mut average_output = false;

    while let Some(line) = lines.peek() {
        let line = line.trim_end();
        if line.starts_with("Tree=") {
            break;
        }
        if let Some((key, value)) = line.split_once('=') {
            kv.insert(key.to_string(), value.to_string());
        } else if line == "average_output" {
            average_output = true;
        }
        lines.next();
    }

    let num_class: usize = required(&kv, "num_class")?;
    let num_tree_per_iteration = optional(&kv, "num_tree_per_iteration")?.unwrap_or(num_class);
    let objective = kv
        .get("objective")
        .map_or(Ok(Objective::Identity), |s| Objective::parse(s))?;

    if num_class > 1 || num_tree_per_iteration > 1 {
        return Err(ParseError::UnsupportedObjective(format!(
            "{num_class} classes; a single scalar output is required"
        )));
    }

    Ok(ModelHeader {
        version: kv.get("version").cloned().unwrap_or_default(),
        num_class,
        num_tree_per_iteration,
        max_feature_idx: required(&kv, "max_feature_idx")?,
        objective,
        average_output,
        feature_names: kv
            .get("feature_names")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

fn parse_tree(
    kv: &HashMap<String, String>,
    index: usize,
    num_features: usize,
) -> Result<Tree, ParseError> {
    let num_leaves: usize = required(kv, "num_leaves")?;
    if num_leaves == 0 {
        return Err(ParseError::InvalidTree {
            tree: index,
            reason: "num_leaves is zero".to_string(),
        });
    }
    if optional::<i32>(kv, "is_linear")?.unwrap_or(0) != 0 {
        return Err(ParseError::LinearTree(index));
    }

    let leaf_value: Vec<f64> = array(kv, "leaf_value")?;
    check_len(index, "leaf_value", leaf_value.len(), num_leaves)?;

    if num_leaves == 1 {
        return Ok(Tree::single_leaf(leaf_value[0]));
    }

    let num_splits = num_leaves - 1;
    let split_feature: Vec<usize> = array(kv, "split_feature")?;
    let threshold: Vec<f64> = array(kv, "threshold")?;
    let left_child: Vec<i32> = array(kv, "left_child")?;
    let right_child: Vec<i32> = array(kv, "right_child")?;
    let decision_type: Vec<i8> = if kv.contains_key("decision_type") {
        array(kv, "decision_type")?
    } else {
        vec![0; num_splits]
    };

    check_len(index, "split_feature", split_feature.len(), num_splits)?;
    check_len(index, "threshold", threshold.len(), num_splits)?;
    check_len(index, "left_child", left_child.len(), num_splits)?;
    check_len(index, "right_child", right_child.len(), num_splits)?;
    check_len(index, "decision_type", decision_type.len(), num_splits)?;

    let num_cat: usize = optional(kv, "num_cat")?.unwrap_or(0);
    let (cat_boundaries, cat_threshold): (Vec<usize>, Vec<u32>) = if num_cat > 0 {
        (array(kv, "cat_boundaries")?, array(kv, "cat_threshold")?)
    } else {
        (Vec::new(), Vec::new())
    };

    let tree = Tree {
        split_feature,
        threshold,
        decision: decision_type.into_iter().map(DecisionType::from_i8).collect(),
        left_child,
        right_child,
        leaf_value,
        cat_boundaries,
        cat_threshold,
    };
    tree.validate(index, num_features)?;
    Ok(tree)
}

fn required<T: FromStr>(kv: &HashMap<String, String>, field: &'static str) -> Result<T, ParseError> {
    optional(kv, field)?.ok_or(ParseError::MissingField(field))
}

fn optional<T: FromStr>(
    kv: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<T>, ParseError> {
    kv.get(field)
        .map(|v| {
            v.trim().parse().map_err(|_| ParseError::InvalidValue {
                field,
                value: v.clone(),
            })
        })
        .transpose()
}

fn array<T: FromStr>(kv: &HashMap<String, String>, field: &'static str) -> Result<Vec<T>, ParseError> {
    kv.get(field)
        .ok_or(ParseError::MissingField(field))?
        .split_whitespace()
        .map(|v| {
            v.parse().map_err(|_| ParseError::InvalidValue {
                field,
                value: v.to_string(),
            })
        })
        .collect()
}

fn check_len(tree: usize, field: &'static str, actual: usize, expected: usize) -> Result<(), ParseError> {
    if actual != expected {
        return Err(ParseError::ArraySizeMismatch {
            tree,
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
