pub mod filter;
pub mod invert;
pub mod merge;
pub mod paths;
pub mod search;

pub use filter::{FilterError, MatchMode, NameQuery, Thresholds, TreeFilter};
pub use invert::{forward_tree, reverse_tree};
pub use merge::{MergeError, add, flatten, is_same_function};
pub use paths::{get_all_paths, insert, search, search_paths};
pub use search::{SearchResults, find_function, search_names};
