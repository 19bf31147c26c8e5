mod args;
mod renderer;

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Parser;
use costtree_core::config::AnalysisConfig;
use costtree_core::model::{CallTree, FunctionKey, NodeId};
use costtree_core::parsers::{ParseMode, parse_report};
use costtree_core::views::{
    MatchMode, NameQuery, TreeFilter, find_function, forward_tree, reverse_tree, search,
    search_names,
};
use log::{info, warn};

use args::Args;
use renderer::RenderOptions;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = AnalysisConfig::discover(args.config.as_deref())?;

    let mode = if args.lenient {
        ParseMode::Lenient
    } else {
        config.parse_mode
    };
    let data = std::fs::read(&args.report)
        .with_context(|| format!("failed to read {}", args.report.display()))?;
    let mut tree = parse_report(&data, mode)
        .with_context(|| format!("failed to parse {}", args.report.display()))?;
    info!("loaded {} cost centres", tree.len());

    if let Some(no) = args.narrow {
        let id = tree
            .preorder()
            .into_iter()
            .find(|&id| tree[id].no().numbers().contains(&no))
            .with_context(|| format!("no cost centre numbered {no}"))?;
        tree = tree.narrow(id);
    }

    let inverted = match (&args.callers, &args.callees) {
        (Some(name), _) => Some((name, true)),
        (None, Some(name)) => Some((name, false)),
        (None, None) => None,
    };
    if let Some((name, callers)) = inverted {
        let root = primary_root(&tree)?;
        let needle = resolve_needle(
            &tree,
            root,
            name,
            args.module.as_deref(),
            args.source.as_deref(),
        )?;
        tree = if callers {
            reverse_tree(&tree, root, &needle)?
        } else {
            forward_tree(&tree, root, &needle)?
        };
    }

    let match_mode: MatchMode = args.mode.map_or(config.match_mode, MatchMode::from);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Some(text) = &args.search {
        let query = NameQuery::new(text.as_str(), match_mode)?;
        let results = search_names(&tree, &query, None);
        renderer::render_matches(&mut out, &tree, results.matches())?;
        out.flush()?;
        return Ok(());
    }

    let mut filter = TreeFilter::new(args.thresholds(config.thresholds));
    if let Some(name) = &args.name {
        filter.set_name_query(name, match_mode)?;
    }
    let visible = filter.is_active().then(|| filter.visible(&tree));
    let options = RenderOptions {
        visible: visible.as_ref(),
        max_depth: args.max_depth,
    };

    if args.json {
        renderer::render_json(&mut out, &tree, &options)?;
    } else {
        renderer::render_text(&mut out, &tree, &options)?;
    }
    out.flush()?;
    Ok(())
}

/// The root the inversions start from. Reports have a single `MAIN` root;
/// anything after the first root is left out of the inverted view.
fn primary_root(tree: &CallTree) -> Result<NodeId> {
    let Some(&root) = tree.roots().first() else {
        bail!("the report has no cost centres");
    };
    if tree.roots().len() > 1 {
        warn!(
            "report has {} top-level cost centres; only the first is inverted",
            tree.roots().len()
        );
    }
    Ok(root)
}

/// Resolve `name` to a function that occurs below `root`, the subtree the
/// inversions walk.
fn resolve_needle(
    tree: &CallTree,
    root: NodeId,
    name: &str,
    module: Option<&str>,
    source: Option<&str>,
) -> Result<FunctionKey> {
    let Some(needle) = find_function(tree, name, module, source) else {
        bail!("function `{name}` does not occur in the report");
    };
    if search(tree, root, &needle).is_empty() {
        bail!("function `{needle}` does not occur under the first top-level cost centre");
    }
    Ok(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use costtree_core::model::{Cost, CostCentre, CostCentreNo};

    fn centre(no: u64, name: &str) -> CostCentre {
        CostCentre {
            no: CostCentreNo::Original(no),
            name: name.into(),
            module: "Main".into(),
            source: "m.hs".into(),
            entries: 1,
            individual: Cost::new(1.0, 1.0),
        }
    }

    #[test]
    fn needle_must_occur_under_the_inverted_root() {
        let mut tree = CallTree::new();
        let main = tree.push(centre(1, "main"), None);
        tree.push(centre(2, "run"), Some(main));
        let other = tree.push(centre(3, "other"), None);
        tree.push(centre(4, "helper"), Some(other));

        let root = primary_root(&tree).unwrap();
        assert_eq!(root, main);
        assert_eq!(
            resolve_needle(&tree, root, "run", None, None).unwrap().name,
            "run"
        );
        let err = resolve_needle(&tree, root, "helper", None, None).unwrap_err();
        assert!(err.to_string().contains("first top-level"));
        assert!(resolve_needle(&tree, root, "missing", None, None).is_err());
    }
}
