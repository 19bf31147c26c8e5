use super::merge::{MergeError, add};
use crate::model::{CallTree, FunctionKey, NodeId, PathNode};

/// Every root-to-leaf chain below `id` (inclusive), as detached copies.
pub fn get_all_paths(tree: &CallTree, id: NodeId) -> Vec<Vec<PathNode>> {
    let head = tree.copy(id, false);
    let children = tree.children(id);
    if children.is_empty() {
        return vec![vec![head]];
    }
    children
        .iter()
        .flat_map(|&child| get_all_paths(tree, child))
        .map(|tail| prepend(&head, tail))
        .collect()
}

/// Chains from `id` down to each occurrence of `needle`.
///
/// The search stops at the first occurrence on each branch; that last
/// element carries a copy of its subtree when `copy_children` is set.
pub fn search_paths(
    tree: &CallTree,
    id: NodeId,
    needle: &FunctionKey,
    copy_children: bool,
) -> Vec<Vec<PathNode>> {
    if tree[id].centre().is_function(needle) {
        return vec![vec![tree.copy(id, copy_children)]];
    }
    let children = tree.children(id);
    if children.is_empty() {
        return Vec::new();
    }
    let head = tree.copy(id, false);
    children
        .iter()
        .flat_map(|&child| search_paths(tree, child, needle, copy_children))
        .map(|tail| prepend(&head, tail))
        .collect()
}

/// Every live node under `id` (inclusive) that is `needle`, in depth-first
/// order. Occurrences nested inside other occurrences are included.
pub fn search(tree: &CallTree, id: NodeId, needle: &FunctionKey) -> Vec<NodeId> {
    tree.descendants(id)
        .into_iter()
        .filter(|&node| tree[node].centre().is_function(needle))
        .collect()
}

/// Graft a chain below `at`, merging into existing same-function children
/// level by level. A merged child takes the place of the one it replaces.
pub fn insert(tree: &mut CallTree, at: NodeId, path: Vec<PathNode>) -> Result<(), MergeError> {
    let mut parent = at;
    for path_node in path {
        let incoming = tree.alloc_path_node(path_node);
        let existing = tree
            .children(parent)
            .iter()
            .position(|&child| tree[child].centre().is_same_function(tree[incoming].centre()));
        parent = match existing {
            Some(index) => {
                let current = tree.children(parent)[index];
                let merged = add(tree, current, incoming)?;
                tree.replace_child(parent, index, merged);
                merged
            }
            None => {
                tree.append_child(parent, incoming);
                incoming
            }
        };
    }
    Ok(())
}

fn prepend(head: &PathNode, tail: Vec<PathNode>) -> Vec<PathNode> {
    let mut path = Vec::with_capacity(tail.len() + 1);
    path.push(head.clone());
    path.extend(tail);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cost, CostCentre, CostCentreNo};
    use crate::views::merge::flatten;

    fn centre(no: u64, name: &str, entries: u64) -> CostCentre {
        CostCentre {
            no: CostCentreNo::Original(no),
            name: name.into(),
            module: "M".into(),
            source: "m.hs".into(),
            entries,
            individual: Cost::new(1.0, 1.0),
        }
    }

    fn key(name: &str) -> FunctionKey {
        FunctionKey::new(name, "M", "m.hs")
    }

    fn names(path: &[PathNode]) -> Vec<&str> {
        path.iter().map(|node| node.centre.name.as_str()).collect()
    }

    /// main -> { a -> { foo -> foo -> x, y }, foo -> z }
    fn sample() -> (CallTree, NodeId) {
        let mut tree = CallTree::new();
        let main = tree.push(centre(1, "main", 1), None);
        let a = tree.push(centre(2, "a", 1), Some(main));
        let foo_outer = tree.push(centre(3, "foo", 2), Some(a));
        let foo_inner = tree.push(centre(4, "foo", 5), Some(foo_outer));
        tree.push(centre(5, "x", 1), Some(foo_inner));
        tree.push(centre(6, "y", 1), Some(a));
        let foo = tree.push(centre(7, "foo", 3), Some(main));
        tree.push(centre(8, "z", 1), Some(foo));
        (tree, main)
    }

    #[test]
    fn all_paths_reach_every_leaf() {
        let (tree, main) = sample();
        let paths = get_all_paths(&tree, main);
        let paths: Vec<Vec<&str>> = paths.iter().map(|p| names(p)).collect();
        assert_eq!(
            paths,
            vec![
                vec!["main", "a", "foo", "foo", "x"],
                vec!["main", "a", "y"],
                vec!["main", "foo", "z"],
            ]
        );
    }

    #[test]
    fn leaf_yields_single_path() {
        let (tree, _) = sample();
        let x = NodeId(4);
        assert_eq!(tree[x].name(), "x");
        let paths = get_all_paths(&tree, x);
        assert_eq!(paths.len(), 1);
        assert_eq!(names(&paths[0]), vec!["x"]);
        assert!(paths[0][0].children.is_empty());
    }

    #[test]
    fn search_paths_stop_at_first_match() {
        let (tree, main) = sample();
        let paths = search_paths(&tree, main, &key("foo"), false);
        let shapes: Vec<Vec<&str>> = paths.iter().map(|p| names(p)).collect();
        assert_eq!(shapes, vec![vec!["main", "a", "foo"], vec!["main", "foo"]]);
        assert!(paths[0][2].children.is_empty());

        let with_children = search_paths(&tree, main, &key("foo"), true);
        assert_eq!(with_children[0][2].children.len(), 1);
        assert_eq!(with_children[0][2].children[0].children[0].centre.name, "x");
    }

    #[test]
    fn search_finds_nested_occurrences() {
        let (tree, main) = sample();
        let found: Vec<u64> = search(&tree, main, &key("foo"))
            .into_iter()
            .map(|id| tree[id].no().numbers()[0])
            .collect();
        assert_eq!(found, vec![3, 4, 7]);
        assert!(search(&tree, main, &key("missing")).is_empty());
    }

    #[test]
    fn insert_merges_matching_prefix() {
        let (source, main) = sample();
        let (mut target, root) = CallTree::with_synthetic_root();
        for path in get_all_paths(&source, main) {
            insert(&mut target, root, path).unwrap();
        }
        flatten(&mut target, root);

        // One copy of `main`, whose two children keep first-seen order.
        assert_eq!(target.child_count(root), 1);
        let main_copy = target.children(root)[0];
        assert_eq!(target[main_copy].entries(), 1);
        let children: Vec<_> = target
            .children(main_copy)
            .iter()
            .map(|&c| target[c].name().to_string())
            .collect();
        assert_eq!(children, vec!["a", "foo"]);
        let a = target.children(main_copy)[0];
        assert_eq!(target.child_count(a), 2);
        assert_eq!(target[a].entries(), 1);
    }

    #[test]
    fn insert_into_empty_level_appends() {
        let (mut target, root) = CallTree::with_synthetic_root();
        let path = vec![PathNode::leaf(centre(1, "p", 1)), PathNode::leaf(centre(2, "q", 1))];
        insert(&mut target, root, path).unwrap();
        let p = target.children(root)[0];
        assert_eq!(target.parent(p), Some(root));
        let q = target.children(p)[0];
        assert_eq!(target[q].name(), "q");
        assert_eq!(target.parent(q), Some(p));
    }

    #[test]
    fn source_tree_is_untouched() {
        let (source, main) = sample();
        let before: Vec<_> = source.preorder();
        let (mut target, root) = CallTree::with_synthetic_root();
        for path in search_paths(&source, main, &key("foo"), true) {
            insert(&mut target, root, path).unwrap();
        }
        assert_eq!(source.preorder(), before);
        assert_eq!(source.len(), 8);
    }
}
