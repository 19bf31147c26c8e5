pub mod report;
pub mod tree_builder;

use serde::{Deserialize, Serialize};

use crate::model::CallTree;

pub use report::{FieldError, ReportLayout, ReportLine, ReportParseError, read_report};
pub use tree_builder::build_tree;

/// What to do with a data line that cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Abort the whole parse on the first malformed line.
    #[default]
    Strict,
    /// Skip malformed lines, keeping indentation tracking on the last good line.
    Lenient,
}

/// Parse a complete profiling report into its call tree.
pub fn parse_report(data: &[u8], mode: ParseMode) -> Result<CallTree, ReportParseError> {
    let text = std::str::from_utf8(data)?;
    let (layout, lines) = read_report(text)?;
    build_tree(lines, layout, mode)
}
