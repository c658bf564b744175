//! Locates the nodes a [`ParameterAddress`] refers to.

use std::collections::HashSet;

use tracing::instrument;

use crate::domain::{
    ConfigNode, ConfigTree, CrossFilePolicy, ParameterAddress, Qualifier, RawValue, Segment,
};

/// Resolves `address` against a single tree.
///
/// The result is in document order and free of duplicates. It is empty as
/// soon as one segment matches nothing; partial matches are never returned.
/// When a segment matches several same-named children they are all carried
/// forward, so the caller decides what to do about ambiguity.
#[must_use]
pub fn resolve<'a>(tree: &'a ConfigTree, address: &ParameterAddress) -> Vec<ConfigNode<'a>> {
    let mut current = vec![tree.root()];

    for segment in address.segments() {
        current = step(&current, segment);
        if current.is_empty() {
            break;
        }
    }

    current.retain(|node| !node.is_root());
    current
}

/// Resolves `address` against several trees in priority order.
///
/// With [`CrossFilePolicy::FirstMatch`] the first non-empty result wins. With
/// [`CrossFilePolicy::Merge`] the results of all trees are concatenated in
/// tree order.
#[instrument(level = "trace", skip(trees, address), fields(%address))]
#[must_use]
pub fn resolve_in_order<'a>(
    trees: &'a [ConfigTree],
    address: &ParameterAddress,
    policy: CrossFilePolicy,
) -> Vec<ConfigNode<'a>> {
    match policy {
        CrossFilePolicy::FirstMatch => trees
            .iter()
            .map(|tree| resolve(tree, address))
            .find(|nodes| !nodes.is_empty())
            .unwrap_or_default(),
        CrossFilePolicy::Merge => trees
            .iter()
            .flat_map(|tree| resolve(tree, address))
            .collect(),
    }
}

fn step<'a>(current: &[ConfigNode<'a>], segment: &Segment) -> Vec<ConfigNode<'a>> {
    let mut next = Vec::new();

    for &node in current {
        match segment {
            Segment::Named { name, qualifier } => {
                let matching = node.children().filter(|child| child.name() == name.as_str());
                match qualifier {
                    None => next.extend(matching),
                    Some(Qualifier::Index(index)) => next.extend(matching.skip(*index).take(1)),
                    Some(Qualifier::Field { key, value }) => next.extend(
                        matching.filter(|child| has_field(*child, key.as_str(), value)),
                    ),
                }
            }
            Segment::AnyChild => next.extend(node.children()),
            Segment::AnyDepth => {
                next.push(node);
                next.extend(node.descendants());
            }
        }
    }

    let mut next = dedup(next);
    next.sort_by_key(|node| node.position());
    next
}

fn has_field(node: ConfigNode<'_>, key: &str, expected: &str) -> bool {
    node.children()
        .filter(|child| child.name() == key)
        .any(|child| matches!(child.value(), Some(RawValue::Scalar(v)) if v.trim() == expected))
}

/// Removes repeated nodes, keeping the first occurrence.
///
/// Overlapping `**` segments can reach the same node more than once.
fn dedup(nodes: Vec<ConfigNode<'_>>) -> Vec<ConfigNode<'_>> {
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes
        .into_iter()
        .filter(|node| seen.insert((std::ptr::from_ref(node.tree()), node.id())))
        .collect()
}
