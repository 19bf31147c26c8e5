use log::{debug, warn};

use super::ParseMode;
use super::report::{ReportLayout, ReportLine, ReportParseError, parse_fields};
use crate::model::{CallTree, NodeId};

/// Rebuild the nested call tree from indented report lines.
///
/// A line indented deeper than its predecessor becomes that line's last
/// child. Otherwise the builder climbs `previous_indent - indent` levels
/// above the predecessor's parent; running out of ancestors makes the line
/// a new root. Node ids follow line order.
pub fn build_tree<'a, I>(
    lines: I,
    layout: ReportLayout,
    mode: ParseMode,
) -> Result<CallTree, ReportParseError>
where
    I: IntoIterator<Item = ReportLine<'a>>,
{
    let mut tree = CallTree::new();
    let mut previous: Option<(usize, NodeId)> = None;
    let mut skipped = 0usize;

    for line in lines {
        let centre = match parse_fields(&line.fields, layout) {
            Ok(centre) => centre,
            Err(reason) => match mode {
                ParseMode::Strict => {
                    return Err(ReportParseError::Malformed {
                        line: line.line_no,
                        reason,
                    });
                }
                ParseMode::Lenient => {
                    warn!("skipping line {}: {reason}", line.line_no);
                    skipped += 1;
                    continue;
                }
            },
        };

        let parent = match previous {
            None => None,
            Some((previous_indent, previous_node)) if line.indent > previous_indent => {
                Some(previous_node)
            }
            Some((previous_indent, previous_node)) => {
                let mut parent = tree.parent(previous_node);
                for _ in 0..previous_indent - line.indent {
                    parent = parent.and_then(|p| tree.parent(p));
                }
                parent
            }
        };

        let id = tree.push(centre, parent);
        previous = Some((line.indent, id));
    }

    debug!(
        "built call tree: {} nodes, {} roots, {skipped} lines skipped",
        tree.len(),
        tree.roots().len()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CostCentreNo;

    fn line(line_no: usize, indent: usize, text: &'static str) -> ReportLine<'static> {
        ReportLine {
            line_no,
            indent,
            fields: text.split_whitespace().collect(),
        }
    }

    fn names(tree: &CallTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree[id].name().to_string()).collect()
    }

    #[test]
    fn nests_by_indentation() {
        let lines = vec![
            line(1, 1, "MAIN MAIN <built-in> 1 0 0.0 0.0 100.0 100.0"),
            line(2, 2, "main Main a.hs 2 1 10.0 5.0 90.0 90.0"),
            line(3, 3, "go Main a.hs 3 10 40.0 40.0 80.0 85.0"),
            line(4, 4, "step Main a.hs 4 90 40.0 45.0 40.0 45.0"),
            line(5, 2, "CAF Main <entire-module> 5 0 0.0 0.0 10.0 10.0"),
            line(6, 3, "go Main a.hs 6 1 10.0 10.0 10.0 10.0"),
        ];
        let tree = build_tree(lines, ReportLayout::WithSource, ParseMode::Strict).unwrap();

        assert_eq!(tree.len(), 6);
        assert_eq!(tree.roots().len(), 1);
        let root = tree.roots()[0];
        assert_eq!(names(&tree, tree.children(root)), vec!["main", "CAF"]);
        let main = tree.children(root)[0];
        let go = tree.children(main)[0];
        assert_eq!(names(&tree, tree.children(go)), vec!["step"]);
        let caf = tree.children(root)[1];
        assert_eq!(tree[tree.children(caf)[0]].no(), &CostCentreNo::Original(6));

        let order: Vec<u64> = tree
            .preorder()
            .into_iter()
            .map(|id| tree[id].no().numbers()[0])
            .collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn dedent_past_top_level_starts_new_root() {
        let lines = vec![
            line(1, 2, "a M s 1 1 1.0 1.0 2.0 2.0"),
            line(2, 3, "b M s 2 1 1.0 1.0 1.0 1.0"),
            line(3, 0, "c M s 3 1 1.0 1.0 1.0 1.0"),
        ];
        let tree = build_tree(lines, ReportLayout::WithSource, ParseMode::Strict).unwrap();
        assert_eq!(names(&tree, tree.roots()), vec!["a", "c"]);
    }

    #[test]
    fn strict_mode_reports_line_number() {
        let lines = vec![
            line(10, 1, "a M s 1 1 1.0 1.0 2.0 2.0"),
            line(11, 2, "b M s two 1 1.0 1.0 1.0 1.0"),
        ];
        let err = build_tree(lines, ReportLayout::WithSource, ParseMode::Strict).unwrap_err();
        assert!(matches!(err, ReportParseError::Malformed { line: 11, .. }));
    }

    #[test]
    fn lenient_mode_skips_without_moving_indent() {
        let lines = vec![
            line(1, 1, "a M s 1 1 1.0 1.0 3.0 3.0"),
            line(2, 2, "b M s 2 1 1.0 1.0 2.0 2.0"),
            line(3, 3, "broken"),
            line(4, 3, "c M s 3 1 1.0 1.0 1.0 1.0"),
        ];
        let tree = build_tree(lines, ReportLayout::WithSource, ParseMode::Lenient).unwrap();
        assert_eq!(tree.len(), 3);
        let a = tree.roots()[0];
        let b = tree.children(a)[0];
        assert_eq!(names(&tree, tree.children(b)), vec!["c"]);
    }
}
