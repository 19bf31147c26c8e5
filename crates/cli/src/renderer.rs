use std::collections::HashSet;
use std::io::Write;

use anyhow::Result;
use costtree_core::model::{CallTree, NodeFields, NodeId};
use serde::Serialize;

/// Which rows to print and how deep.
pub struct RenderOptions<'a> {
    /// Rows outside this set are skipped along with their subtrees.
    pub visible: Option<&'a HashSet<NodeId>>,
    pub max_depth: Option<usize>,
}

impl RenderOptions<'_> {
    fn shows(&self, id: NodeId, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
            && self.visible.is_none_or(|visible| visible.contains(&id))
    }
}

#[derive(Serialize)]
struct JsonNode {
    #[serde(flatten)]
    fields: NodeFields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode>,
}

const HEADER: &str = "COST CENTRE";

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

/// Print the tree as an indented table, one row per node.
pub fn render_text(out: &mut impl Write, tree: &CallTree, options: &RenderOptions) -> Result<()> {
    let mut rows = Vec::new();
    for &root in tree.roots() {
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if !options.shows(id, depth) {
                continue;
            }
            rows.push((depth, tree.fields(id)));
            stack.extend(tree.children(id).iter().rev().map(|&c| (c, depth + 1)));
        }
    }

    let label = |depth: usize, fields: &NodeFields| format!("{}{}", " ".repeat(depth), fields.name);
    let name_width = rows
        .iter()
        .map(|(depth, fields)| label(*depth, fields).len())
        .chain(std::iter::once(HEADER.len()))
        .max()
        .unwrap_or_default();
    let module_width = rows
        .iter()
        .map(|(_, fields)| fields.module.len())
        .chain(std::iter::once("MODULE".len()))
        .max()
        .unwrap_or_default();

    writeln!(
        out,
        "{HEADER:<name_width$}  {:<module_width$}  {:>10}  {:>10}  {:>6} {:>6}  {:>6} {:>6}  {:>6} {:>6}",
        "MODULE", "no.", "entries", "%time", "%alloc", "%time", "%alloc", "%rel-t", "%rel-a"
    )?;
    for (depth, fields) in &rows {
        writeln!(
            out,
            "{:<name_width$}  {:<module_width$}  {:>10}  {:>10}  {:>6.1} {:>6.1}  {:>6.1} {:>6.1}  {:>6} {:>6}",
            label(*depth, fields),
            fields.module,
            fields.no,
            fields.entries,
            fields.individual_time,
            fields.individual_alloc,
            fields.inherited_time,
            fields.inherited_alloc,
            percent(fields.relative_time),
            percent(fields.relative_alloc),
        )?;
    }
    Ok(())
}

fn json_node(tree: &CallTree, id: NodeId, depth: usize, options: &RenderOptions) -> JsonNode {
    JsonNode {
        fields: tree.fields(id),
        children: tree
            .children(id)
            .iter()
            .filter(|&&child| options.shows(child, depth + 1))
            .map(|&child| json_node(tree, child, depth + 1, options))
            .collect(),
    }
}

/// Print the tree as a JSON array of nested nodes, one entry per root.
pub fn render_json(out: &mut impl Write, tree: &CallTree, options: &RenderOptions) -> Result<()> {
    let roots: Vec<JsonNode> = tree
        .roots()
        .iter()
        .filter(|&&root| options.shows(root, 0))
        .map(|&root| json_node(tree, root, 0, options))
        .collect();
    serde_json::to_writer_pretty(&mut *out, &roots)?;
    writeln!(out)?;
    Ok(())
}

/// Print each match with the chain of callers leading to it.
pub fn render_matches(out: &mut impl Write, tree: &CallTree, matches: &[NodeId]) -> Result<()> {
    writeln!(out, "{} matches", matches.len())?;
    for &id in matches {
        let mut chain: Vec<String> = tree
            .ancestors(id)
            .map(|ancestor| tree[ancestor].name().to_string())
            .collect();
        chain.reverse();
        chain.push(tree[id].name().to_string());
        writeln!(out, "{:>10}  {}", tree[id].no().to_string(), chain.join(" > "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use costtree_core::model::{Cost, CostCentre, CostCentreNo};

    fn centre(no: u64, name: &str, time: f64) -> CostCentre {
        CostCentre {
            no: CostCentreNo::Original(no),
            name: name.into(),
            module: "Main".into(),
            source: "m.hs".into(),
            entries: 1,
            individual: Cost::new(time, time),
        }
    }

    fn sample() -> (CallTree, Vec<NodeId>) {
        let mut tree = CallTree::new();
        let main = tree.push(centre(1, "main", 10.0), None);
        let run = tree.push(centre(2, "run", 30.0), Some(main));
        let step = tree.push(centre(3, "step", 60.0), Some(run));
        (tree, vec![main, run, step])
    }

    fn text(tree: &CallTree, options: &RenderOptions) -> String {
        let mut out = Vec::new();
        render_text(&mut out, tree, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_rows_are_indented_by_depth() {
        let (tree, _) = sample();
        let output = text(
            &tree,
            &RenderOptions {
                visible: None,
                max_depth: None,
            },
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("COST CENTRE"));
        assert!(lines[1].starts_with("main "));
        assert!(lines[2].starts_with(" run "));
        assert!(lines[3].starts_with("  step "));
        assert!(lines[1].contains("100.0"));
    }

    #[test]
    fn max_depth_and_visibility_prune_rows() {
        let (tree, ids) = sample();
        let output = text(
            &tree,
            &RenderOptions {
                visible: None,
                max_depth: Some(1),
            },
        );
        assert_eq!(output.lines().count(), 3);

        let visible: HashSet<NodeId> = [ids[0]].into_iter().collect();
        let output = text(
            &tree,
            &RenderOptions {
                visible: Some(&visible),
                max_depth: None,
            },
        );
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn json_nests_children() {
        let (tree, _) = sample();
        let mut out = Vec::new();
        render_json(
            &mut out,
            &tree,
            &RenderOptions {
                visible: None,
                max_depth: None,
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["name"], "main");
        assert_eq!(value[0]["inherited_time"], 100.0);
        assert_eq!(value[0]["children"][0]["children"][0]["name"], "step");
        assert_eq!(value[0]["relative_time"], serde_json::Value::Null);
    }

    #[test]
    fn matches_show_caller_chain() {
        let (tree, ids) = sample();
        let mut out = Vec::new();
        render_matches(&mut out, &tree, &[ids[2]]).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("1 matches\n"));
        assert!(output.contains("main > run > step"));
    }
}
