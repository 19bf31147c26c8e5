use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use costtree_core::views::{MatchMode, Thresholds};

#[derive(Parser)]
#[command(
    name = "costtree",
    about = "Explore the call tree of a cost-centre profiling report",
    after_help = "\
EXAMPLES:
    costtree prog.prof                          Print the whole call tree
    costtree prog.prof --callers step           Who calls `step`, aggregated
    costtree prog.prof --callees step --json    What `step` calls, as JSON
    costtree prog.prof --min-individual-time 1  Rows costing at least 1% time"
)]
pub struct Args {
    /// Profiling report to read
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Skip malformed lines instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// JSON file with analysis defaults (defaults to ./.costtree.json if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restrict the tree to the subtree of the cost centre with this number
    #[arg(long, value_name = "NO")]
    pub narrow: Option<u64>,

    /// Show the inverted tree of every caller of FUNCTION
    #[arg(long, value_name = "FUNCTION", conflicts_with = "callees")]
    pub callers: Option<String>,

    /// Show everything FUNCTION calls, merged across its call sites
    #[arg(long, value_name = "FUNCTION")]
    pub callees: Option<String>,

    /// Module of the --callers/--callees function, when the name is ambiguous
    #[arg(long)]
    pub module: Option<String>,

    /// Source location of the --callers/--callees function
    #[arg(long)]
    pub source: Option<String>,

    /// Minimum individual %time for a row to match
    #[arg(long, value_name = "PERCENT")]
    pub min_individual_time: Option<f64>,

    /// Minimum individual %alloc for a row to match
    #[arg(long, value_name = "PERCENT")]
    pub min_individual_alloc: Option<f64>,

    /// Minimum inherited %time for a row to match
    #[arg(long, value_name = "PERCENT")]
    pub min_inherited_time: Option<f64>,

    /// Minimum inherited %alloc for a row to match
    #[arg(long, value_name = "PERCENT")]
    pub min_inherited_alloc: Option<f64>,

    /// Only keep rows whose name matches, plus their context
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    /// How --name and --search compare against names
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// List the rows whose name matches TEXT instead of printing the tree
    #[arg(long, value_name = "TEXT", conflicts_with = "name")]
    pub search: Option<String>,

    /// Emit JSON instead of an indented table
    #[arg(long)]
    pub json: bool,

    /// Stop printing below this depth
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Contains,
    Exact,
    Regex,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Contains => MatchMode::Contains,
            Mode::Exact => MatchMode::Exact,
            Mode::Regex => MatchMode::Regex,
        }
    }
}

impl Args {
    /// Threshold flags layered over the configured defaults.
    pub fn thresholds(&self, defaults: Thresholds) -> Thresholds {
        Thresholds {
            min_individual_time: self.min_individual_time.or(defaults.min_individual_time),
            min_individual_alloc: self.min_individual_alloc.or(defaults.min_individual_alloc),
            min_inherited_time: self.min_inherited_time.or(defaults.min_inherited_time),
            min_inherited_alloc: self.min_inherited_alloc.or(defaults.min_inherited_alloc),
        }
    }
}
