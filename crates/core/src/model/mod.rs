pub mod call_tree;
pub mod cost_centre;

pub use call_tree::{CallTree, Node, NodeFields, NodeId, PathNode, Relative};
pub use cost_centre::{Cost, CostCentre, CostCentreNo, FunctionKey, NO_SOURCE, SYNTHETIC_ROOT_NAME};
