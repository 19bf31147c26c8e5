use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;

/// Source location recorded when the report carries none.
pub const NO_SOURCE: &str = "<no>";

/// Name given to the artificial root of merged and inverted trees.
pub const SYNTHETIC_ROOT_NAME: &str = "Root";

/// A pair of time/allocation percentages, in the report's own scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub time: f64,
    pub alloc: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        time: 0.0,
        alloc: 0.0,
    };

    pub fn new(time: f64, alloc: f64) -> Self {
        Self { time, alloc }
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            time: self.time + rhs.time,
            alloc: self.alloc + rhs.alloc,
        }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.time += rhs.time;
        self.alloc += rhs.alloc;
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::ZERO, Add::add)
    }
}

/// Cost-centre number(s) a node stands for.
///
/// Parsed entries carry the single number printed in the report. Merged
/// nodes carry every original number they summarise, in discovery order.
/// Synthetic roots carry none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostCentreNo {
    Synthetic,
    Original(u64),
    Merged(Vec<u64>),
}

impl CostCentreNo {
    /// Collapse a list of contributing numbers into the matching variant.
    pub fn from_numbers(mut numbers: Vec<u64>) -> Self {
        match numbers.len() {
            0 => CostCentreNo::Synthetic,
            1 => CostCentreNo::Original(numbers.remove(0)),
            _ => CostCentreNo::Merged(numbers),
        }
    }

    pub fn numbers(&self) -> &[u64] {
        match self {
            CostCentreNo::Synthetic => &[],
            CostCentreNo::Original(no) => std::slice::from_ref(no),
            CostCentreNo::Merged(nos) => nos,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, CostCentreNo::Synthetic)
    }
}

impl fmt::Display for CostCentreNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostCentreNo::Synthetic => Ok(()),
            CostCentreNo::Original(no) => write!(f, "{no}"),
            CostCentreNo::Merged(nos) => {
                for (i, no) in nos.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{no}")?;
                }
                Ok(())
            }
        }
    }
}

/// Identity of a function: two nodes are "the same function" when their
/// keys are equal, regardless of numbers, ids or metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionKey {
    pub name: SharedStr,
    pub module: SharedStr,
    pub source: SharedStr,
}

impl FunctionKey {
    pub fn new(
        name: impl Into<SharedStr>,
        module: impl Into<SharedStr>,
        source: impl Into<SharedStr>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.module, self.source)
    }
}

/// The scalar payload of one call-tree entry, without any tree structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCentre {
    pub no: CostCentreNo,
    pub name: SharedStr,
    pub module: SharedStr,
    pub source: SharedStr,
    /// Call count.
    pub entries: u64,
    /// Self cost, excluding children.
    pub individual: Cost,
}

impl CostCentre {
    pub fn synthetic_root() -> Self {
        Self {
            no: CostCentreNo::Synthetic,
            name: SYNTHETIC_ROOT_NAME.into(),
            module: "".into(),
            source: NO_SOURCE.into(),
            entries: 0,
            individual: Cost::ZERO,
        }
    }

    pub fn function(&self) -> FunctionKey {
        FunctionKey {
            name: self.name.clone(),
            module: self.module.clone(),
            source: self.source.clone(),
        }
    }

    pub fn is_function(&self, key: &FunctionKey) -> bool {
        self.name == key.name && self.module == key.module && self.source == key.source
    }

    pub fn is_same_function(&self, other: &CostCentre) -> bool {
        self.is_function(&other.function())
    }
}
