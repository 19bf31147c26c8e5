use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CallTree, NodeId};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// How a name query is compared against node names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Contains,
    Exact,
    /// Regular expression anchored at the start of the name.
    Regex,
}

/// A compiled name predicate.
#[derive(Debug, Clone)]
pub struct NameQuery {
    text: String,
    mode: MatchMode,
    regex: Option<Regex>,
}

impl NameQuery {
    pub fn new(text: impl Into<String>, mode: MatchMode) -> Result<Self, FilterError> {
        let text = text.into();
        let regex = match mode {
            MatchMode::Regex => Some(Regex::new(&format!("^(?:{text})"))?),
            MatchMode::Contains | MatchMode::Exact => None,
        };
        Ok(Self { text, mode, regex })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn matches(&self, name: &str) -> bool {
        match (&self.mode, &self.regex) {
            (MatchMode::Exact, _) => name == self.text,
            (MatchMode::Contains, _) => name.contains(self.text.as_str()),
            (MatchMode::Regex, Some(regex)) => regex.is_match(name),
            (MatchMode::Regex, None) => false,
        }
    }
}

/// Inclusive lower bounds on a node's costs. Unset bounds never reject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_individual_time: Option<f64>,
    pub min_individual_alloc: Option<f64>,
    pub min_inherited_time: Option<f64>,
    pub min_inherited_alloc: Option<f64>,
}

impl Thresholds {
    pub fn is_empty(&self) -> bool {
        *self == Thresholds::default()
    }
}

/// Row filter over a call tree: cost thresholds plus an optional name query.
#[derive(Debug, Clone, Default)]
pub struct TreeFilter {
    thresholds: Thresholds,
    name: Option<NameQuery>,
}

impl TreeFilter {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            name: None,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    pub fn name_query(&self) -> Option<&NameQuery> {
        self.name.as_ref()
    }

    /// Replace the name query. An empty `text` clears it. On an invalid
    /// pattern the previous query stays active.
    pub fn set_name_query(&mut self, text: &str, mode: MatchMode) -> Result<(), FilterError> {
        if text.is_empty() {
            self.name = None;
            return Ok(());
        }
        self.name = Some(NameQuery::new(text, mode)?);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.thresholds.is_empty() || self.name.is_some()
    }

    /// Whether the node itself passes every configured bound and the name query.
    pub fn check(&self, tree: &CallTree, id: NodeId) -> bool {
        let node = &tree[id];
        let individual = node.individual();
        let t = &self.thresholds;
        if !at_least(individual.time, t.min_individual_time)
            || !at_least(individual.alloc, t.min_individual_alloc)
        {
            return false;
        }
        if t.min_inherited_time.is_some() || t.min_inherited_alloc.is_some() {
            let inherited = tree.inherited(id);
            if !at_least(inherited.time, t.min_inherited_time)
                || !at_least(inherited.alloc, t.min_inherited_alloc)
            {
                return false;
            }
        }
        self.name
            .as_ref()
            .is_none_or(|query| query.matches(node.name()))
    }

    /// Whether the node stays visible: it passes, or an ancestor passes, or
    /// any descendant passes.
    pub fn accept(&self, tree: &CallTree, id: NodeId) -> bool {
        self.check(tree, id)
            || tree.ancestors(id).any(|ancestor| self.check(tree, ancestor))
            || tree
                .descendants(id)
                .into_iter()
                .skip(1)
                .any(|descendant| self.check(tree, descendant))
    }

    /// The set of nodes [`TreeFilter::accept`] keeps, computed in two passes
    /// over the tree instead of one walk per node.
    pub fn visible(&self, tree: &CallTree) -> HashSet<NodeId> {
        let order = tree.preorder();
        let passes: HashSet<NodeId> = order
            .iter()
            .copied()
            .filter(|&id| self.check(tree, id))
            .collect();

        // Bottom-up: nodes with a passing node somewhere at or below them.
        let mut has_match_below: HashSet<NodeId> = HashSet::new();
        for &id in order.iter().rev() {
            if passes.contains(&id)
                || tree
                    .children(id)
                    .iter()
                    .any(|child| has_match_below.contains(child))
            {
                has_match_below.insert(id);
            }
        }

        // Top-down: nodes below a passing ancestor.
        let mut under_match: HashSet<NodeId> = HashSet::new();
        for &id in &order {
            if tree
                .parent(id)
                .is_some_and(|parent| passes.contains(&parent) || under_match.contains(&parent))
            {
                under_match.insert(id);
            }
        }

        has_match_below.union(&under_match).copied().collect()
    }
}

fn at_least(value: f64, bound: Option<f64>) -> bool {
    bound.is_none_or(|bound| value >= bound)
}
