use std::collections::HashMap;

use thiserror::Error;

use crate::model::{CallTree, Cost, CostCentre, CostCentreNo, FunctionKey, NodeId};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot merge {left} with {right}: not the same function")]
    NotSameFunction {
        left: FunctionKey,
        right: FunctionKey,
    },
}

pub fn is_same_function(tree: &CallTree, a: NodeId, b: NodeId) -> bool {
    tree[a].centre().is_same_function(tree[b].centre())
}

/// Merge two occurrences of the same function into a new sum node.
///
/// The sum records every contributing node keyed by its number; when both
/// sides contribute the same number the first one seen is kept. If that
/// leaves a single contributor, `a` is returned unchanged. Children are
/// grouped by function in first-seen order, and same-function pairs are
/// merged recursively. Scalar metrics stay zero until [`flatten`].
pub fn add(tree: &mut CallTree, a: NodeId, b: NodeId) -> Result<NodeId, MergeError> {
    if !is_same_function(tree, a, b) {
        return Err(MergeError::NotSameFunction {
            left: tree[a].centre().function(),
            right: tree[b].centre().function(),
        });
    }

    let mut summands = summands_of(tree, a);
    for (no, summand) in summands_of(tree, b) {
        if !summands.iter().any(|(key, _)| *key == no) {
            summands.push((no, summand));
        }
    }
    if summands.len() == 1 && !tree[a].is_sum() {
        return Ok(a);
    }

    let numbers: Vec<u64> = summands
        .iter()
        .flat_map(|(key, _)| key.numbers().iter().copied())
        .collect();
    let template = tree[a].centre();
    let centre = CostCentre {
        no: CostCentreNo::from_numbers(numbers),
        name: template.name.clone(),
        module: template.module.clone(),
        source: template.source.clone(),
        entries: 0,
        individual: Cost::ZERO,
    };
    let sum = tree.alloc(centre);
    tree.node_mut(sum).summands = summands;

    let candidates: Vec<NodeId> = tree[a]
        .children()
        .iter()
        .chain(tree[b].children())
        .copied()
        .collect();
    let mut merged: Vec<NodeId> = Vec::with_capacity(candidates.len());
    let mut slots: HashMap<FunctionKey, usize> = HashMap::new();
    for child in candidates {
        let key = tree[child].centre().function();
        match slots.get(&key) {
            Some(&slot) => merged[slot] = add(tree, merged[slot], child)?,
            None => {
                slots.insert(key, merged.len());
                merged.push(child);
            }
        }
    }
    for child in merged {
        tree.append_child(sum, child);
    }

    Ok(sum)
}

/// A sum contributes its recorded summands; any other node contributes itself.
fn summands_of(tree: &CallTree, id: NodeId) -> Vec<(CostCentreNo, NodeId)> {
    let node = &tree[id];
    if node.is_sum() {
        node.summands.clone()
    } else {
        vec![(node.no().clone(), id)]
    }
}

/// Resolve every sum node under `id` (inclusive) into a plain node.
///
/// Entries and individual costs are summed over the summands, the node's
/// number becomes the spliced list of contributing numbers, and the summand
/// map is dropped. Children are left as built by [`add`]. All cached
/// aggregates are cleared afterwards, so inherited and relative values are
/// re-derived from the resulting children on next read.
///
/// Returns the numbers that `id` now stands for.
pub fn flatten(tree: &mut CallTree, id: NodeId) -> Vec<u64> {
    let numbers = flatten_node(tree, id);
    tree.invalidate();
    numbers
}

fn flatten_node(tree: &mut CallTree, id: NodeId) -> Vec<u64> {
    let children = tree[id].children().to_vec();
    for child in children {
        flatten_node(tree, child);
    }

    if !tree[id].is_sum() {
        return tree[id].no().numbers().to_vec();
    }

    let summands = std::mem::take(&mut tree.node_mut(id).summands);
    let mut numbers = Vec::new();
    let mut entries = 0;
    let mut individual = Cost::ZERO;
    for (_, summand) in summands {
        numbers.extend(flatten_node(tree, summand));
        let centre = tree[summand].centre();
        entries += centre.entries;
        individual += centre.individual;
    }

    let centre = &mut tree.node_mut(id).centre;
    centre.no = CostCentreNo::from_numbers(numbers.clone());
    centre.entries = entries;
    centre.individual = individual;
    numbers
}
