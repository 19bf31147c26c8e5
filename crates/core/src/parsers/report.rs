use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

use crate::model::{Cost, CostCentre, CostCentreNo, NO_SOURCE};

const HEADER_WITH_SOURCE: [&str; 10] = [
    "COST", "CENTRE", "MODULE", "SRC", "no.", "entries", "%time", "%alloc", "%time", "%alloc",
];
const HEADER_WITHOUT_SOURCE: [&str; 9] = [
    "COST", "CENTRE", "MODULE", "no.", "entries", "%time", "%alloc", "%time", "%alloc",
];

/// Raw tick and byte counts appended to each row by `+RTS -P`.
const DETAILED_COLUMNS: [&str; 2] = ["ticks", "bytes"];

/// First token of the three-token `<no location info>` source spelling.
const NO_LOCATION_PREFIX: &str = "<no";

#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("no cost-centre tree header found")]
    MissingHeader,
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: FieldError },
}

/// Why a single data line could not be turned into a cost centre.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("invalid {column} `{value}`: {source}")]
    Integer {
        column: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("invalid {column} `{value}`: {source}")]
    Number {
        column: &'static str,
        value: String,
        source: ParseFloatError,
    },
}

/// Column layout announced by the tree header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    WithSource,
    WithoutSource,
}

impl ReportLayout {
    /// Recognise a header row from its whitespace-split tokens. Detailed
    /// (`-P`) reports carry a trailing `ticks bytes` pair.
    pub fn detect(tokens: &[&str]) -> Option<Self> {
        let known = tokens.strip_suffix(&DETAILED_COLUMNS).unwrap_or(tokens);
        if known == HEADER_WITH_SOURCE {
            Some(ReportLayout::WithSource)
        } else if known == HEADER_WITHOUT_SOURCE {
            Some(ReportLayout::WithoutSource)
        } else {
            None
        }
    }
}

/// One non-blank data line of the tree section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine<'a> {
    /// 1-based line number in the input.
    pub line_no: usize,
    /// Count of leading spaces.
    pub indent: usize,
    pub fields: Vec<&'a str>,
}

/// Split a report into its tree layout and data lines.
///
/// Everything before the first recognised header is ignored; blank lines
/// after it are dropped.
pub fn read_report(text: &str) -> Result<(ReportLayout, Vec<ReportLine<'_>>), ReportParseError> {
    let mut lines = text.lines().enumerate();

    let layout = lines
        .by_ref()
        .find_map(|(_, line)| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            ReportLayout::detect(&tokens)
        })
        .ok_or(ReportParseError::MissingHeader)?;

    let data = lines
        .filter_map(|(index, line)| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                return None;
            }
            Some(ReportLine {
                line_no: index + 1,
                indent: line.chars().take_while(|&c| c == ' ').count(),
                fields,
            })
        })
        .collect();

    Ok((layout, data))
}

/// Parse the fields of one data line.
///
/// Columns past the known ones (`ticks`, `bytes`, ...) are ignored. The
/// inherited percentages are validated but not kept; the tree derives them.
pub fn parse_fields(fields: &[&str], layout: ReportLayout) -> Result<CostCentre, FieldError> {
    let (source, base) = match layout {
        ReportLayout::WithoutSource => (NO_SOURCE, 2),
        ReportLayout::WithSource => match fields.get(2) {
            Some(&NO_LOCATION_PREFIX) => (NO_SOURCE, 5),
            Some(&source) => (source, 3),
            None => (NO_SOURCE, 3),
        },
    };

    let expected = base + 6;
    if fields.len() < expected {
        return Err(FieldError::TooFewFields {
            expected,
            found: fields.len(),
        });
    }
    let column = |offset: usize| fields.get(base + offset).copied().unwrap_or_default();

    let no = integer("no.", column(0))?;
    let entries = integer("entries", column(1))?;
    let individual = Cost::new(number("%time", column(2))?, number("%alloc", column(3))?);
    number("inherited %time", column(4))?;
    number("inherited %alloc", column(5))?;

    Ok(CostCentre {
        no: CostCentreNo::Original(no),
        name: fields.first().copied().unwrap_or_default().into(),
        module: fields.get(1).copied().unwrap_or_default().into(),
        source: source.into(),
        entries,
        individual,
    })
}

fn integer(column: &'static str, value: &str) -> Result<u64, FieldError> {
    value.parse().map_err(|source| FieldError::Integer {
        column,
        value: value.to_string(),
        source,
    })
}

fn number(column: &'static str, value: &str) -> Result<f64, FieldError> {
    value.parse().map_err(|source| FieldError::Number {
        column,
        value: value.to_string(),
        source,
    })
}
