use log::debug;

use super::merge::{MergeError, flatten};
use super::paths::{get_all_paths, insert, search, search_paths};
use crate::model::{CallTree, FunctionKey, NodeId};

/// Build the "who calls `needle`" tree.
///
/// Every call chain leading to `needle` is reversed, so the synthetic
/// root's children are the direct callers, their children the callers'
/// callers, and so on, aggregated across every call site. The source tree
/// is not modified.
///
/// Inherited values in the result follow the caller chain: a caller's
/// inherited cost is its summed individual cost plus that of its own
/// callers, not its inherited total at the original call sites.
pub fn reverse_tree(
    tree: &CallTree,
    root: NodeId,
    needle: &FunctionKey,
) -> Result<CallTree, MergeError> {
    let (mut inverted, top) = CallTree::with_synthetic_root();
    let paths = search_paths(tree, root, needle, false);
    let call_sites = paths.len();
    for mut path in paths {
        path.pop();
        path.reverse();
        insert(&mut inverted, top, path)?;
    }
    flatten(&mut inverted, top);
    debug!(
        "callers of {needle}: {call_sites} call sites, {} direct callers",
        inverted.child_count(top)
    );
    Ok(inverted)
}

/// Build the "what does `needle` call" tree.
///
/// Every occurrence of `needle`, including nested ones, contributes all of
/// its call chains; the result has `needle` itself below the synthetic
/// root with its outgoing calls aggregated across every call site.
pub fn forward_tree(
    tree: &CallTree,
    root: NodeId,
    needle: &FunctionKey,
) -> Result<CallTree, MergeError> {
    let (mut forward, top) = CallTree::with_synthetic_root();
    let occurrences = search(tree, root, needle);
    for &occurrence in &occurrences {
        for path in get_all_paths(tree, occurrence) {
            insert(&mut forward, top, path)?;
        }
    }
    flatten(&mut forward, top);
    debug!("callees of {needle}: {} occurrences", occurrences.len());
    Ok(forward)
}
