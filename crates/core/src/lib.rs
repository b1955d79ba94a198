pub mod error;
pub mod export;
pub mod files;
pub mod human;
pub mod model;
pub mod query;
pub mod record;
pub mod search;
pub mod tree;

pub use error::{Error, Result};
pub use model::*;
pub use query::{query, RecordQuery, SortDirection, SortField};
pub use record::{derive_confidence, Activity, HistoryRecord, Report};
pub use tree::build_tree;
