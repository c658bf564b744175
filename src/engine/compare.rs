//! Classification of resolved nodes against a requirement's expectation.

use crate::{
    domain::{Comparison, Config, ConfigNode, RawValue, Requirement, SelectionRule, Verdict},
    engine::normalize::{equivalent, normalize},
};

/// Compares the nodes an address resolved to with what the requirement
/// expects.
///
/// Rules, in priority order:
///
/// 0. a requirement expecting absence matches only when nothing resolved
/// 1. nothing resolved: [`Verdict::NotFound`]
/// 2. several nodes and no selection rule: [`Verdict::Ambiguous`]
/// 3. either side fails to normalize: [`Verdict::TypeIncompatible`]
/// 4. otherwise [`Verdict::Matched`] or [`Verdict::Mismatched`]
///
/// The requirement's own selection rule takes precedence over
/// [`Config::default_selection`].
#[must_use]
pub fn compare(resolved: &[ConfigNode<'_>], requirement: &Requirement, config: &Config) -> Comparison {
    let expected = match requirement.expected() {
        Some(expected) if !requirement.expects_absence() => expected,
        _ => return compare_absence(resolved),
    };

    let selection = requirement.selection().or(config.default_selection);
    let node = match (resolved, selection) {
        ([], _) => return Comparison::new(Verdict::NotFound),
        ([node], _)
        | ([node, ..], Some(SelectionRule::First))
        | ([.., node], Some(SelectionRule::Last)) => *node,
        (nodes, Some(SelectionRule::AllAgree)) => {
            return compare_agreeing(nodes, expected, requirement, config);
        }
        (nodes, None) => {
            return Comparison::new(Verdict::Ambiguous)
                .with_actual(describe(nodes))
                .with_detail(format!("{} candidates and no selection rule", nodes.len()));
        }
    };

    compare_node(node, expected, requirement, config)
}

fn compare_absence(resolved: &[ConfigNode<'_>]) -> Comparison {
    if resolved.is_empty() {
        Comparison::new(Verdict::Matched).with_detail("absent as required")
    } else {
        Comparison::new(Verdict::Mismatched)
            .with_actual(describe(resolved))
            .with_detail("parameter should be absent")
    }
}

fn compare_node(
    node: ConfigNode<'_>,
    expected: &RawValue,
    requirement: &Requirement,
    config: &Config,
) -> Comparison {
    let Some(raw) = node.value() else {
        return container_without_value(node);
    };
    let comparison = Comparison::new(Verdict::TypeIncompatible).with_actual(raw.to_string());

    let actual = match normalize(raw, requirement.kind(), config) {
        Ok(actual) => actual,
        Err(e) => return comparison.with_detail(format!("configured value: {e}")),
    };
    let expected = match normalize(expected, requirement.kind(), config) {
        Ok(expected) => expected,
        Err(e) => return comparison.with_detail(format!("expected value: {e}")),
    };

    match equivalent(&actual, &expected, requirement.is_ordered(), config) {
        Ok(true) => Comparison {
            verdict: Verdict::Matched,
            ..comparison
        },
        Ok(false) => Comparison {
            verdict: Verdict::Mismatched,
            ..comparison
        },
        Err(e) => comparison.with_detail(e.to_string()),
    }
}

/// Handles [`SelectionRule::AllAgree`]: every candidate must hold an
/// equivalent value, which is then compared like a single match.
fn compare_agreeing(
    nodes: &[ConfigNode<'_>],
    expected: &RawValue,
    requirement: &Requirement,
    config: &Config,
) -> Comparison {
    let mut values = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let Some(raw) = node.value() else {
            return container_without_value(node);
        };
        match normalize(raw, requirement.kind(), config) {
            Ok(value) => values.push(value),
            Err(e) => {
                return Comparison::new(Verdict::TypeIncompatible)
                    .with_actual(raw.to_string())
                    .with_detail(format!("configured value in {}: {e}", node.tree().source()));
            }
        }
    }

    let agree = values.split_first().is_none_or(|(first, rest)| {
        rest.iter()
            .all(|value| matches!(equivalent(value, first, requirement.is_ordered(), config), Ok(true)))
    });

    match nodes.first() {
        Some(&first) if agree => compare_node(first, expected, requirement, config),
        _ => Comparison::new(Verdict::Ambiguous)
            .with_actual(describe(nodes))
            .with_detail("candidates hold different values"),
    }
}

fn container_without_value(node: ConfigNode<'_>) -> Comparison {
    Comparison::new(Verdict::TypeIncompatible)
        .with_detail(format!("'{}' is a container without a value", node.path()))
}

/// The distinct values held by `nodes`, in resolution order.
fn describe(nodes: &[ConfigNode<'_>]) -> String {
    let mut values: Vec<String> = Vec::new();
    for node in nodes {
        let value = node
            .value()
            .map_or_else(|| "<container>".to_string(), ToString::to_string);
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values.join(" | ")
}
