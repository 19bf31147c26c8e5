use super::filter::NameQuery;
use crate::model::{CallTree, CostCentre, FunctionKey, NodeId};

/// Ordered name matches with a cyclic cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    matches: Vec<NodeId>,
    cursor: usize,
}

impl SearchResults {
    pub fn matches(&self) -> &[NodeId] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.matches.get(self.cursor).copied()
    }

    /// Step to the following match, wrapping to the first after the last.
    pub fn next_match(&mut self) -> Option<NodeId> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.matches.len();
        self.current()
    }

    /// Step to the preceding match, wrapping to the last before the first.
    pub fn previous_match(&mut self) -> Option<NodeId> {
        if self.matches.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + self.matches.len() - 1) % self.matches.len();
        self.current()
    }
}

/// Collect nodes whose name matches `query`, in tree order starting at
/// `start` (inclusive) and wrapping around to just before it. Without a
/// start, or with one not in the tree, the scan begins at the first root.
pub fn search_names(tree: &CallTree, query: &NameQuery, start: Option<NodeId>) -> SearchResults {
    let order = tree.preorder();
    let offset = start
        .and_then(|start| order.iter().position(|&id| id == start))
        .unwrap_or(0);
    let (head, tail) = order.split_at(offset);
    let matches = tail
        .iter()
        .chain(head)
        .copied()
        .filter(|&id| query.matches(tree[id].name()))
        .collect();
    SearchResults { matches, cursor: 0 }
}

/// Resolve a function by name, optionally narrowed by module and source,
/// to the identity of the first matching node in tree order.
pub fn find_function(
    tree: &CallTree,
    name: &str,
    module: Option<&str>,
    source: Option<&str>,
) -> Option<FunctionKey> {
    tree.preorder()
        .into_iter()
        .map(|id| tree[id].centre())
        .find(|centre| {
            centre.name == name
                && module.is_none_or(|module| centre.module == module)
                && source.is_none_or(|source| centre.source == source)
        })
        .map(CostCentre::function)
}
