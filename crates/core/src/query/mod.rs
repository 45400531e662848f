//! List-query translation: request parameters → typed filter, selection,
//! sort order and page window.
//!
//! The translator never touches storage; executing a [`ListQuery`] is the
//! store's job.

mod expand;
mod filter;
mod params;
mod sort;

use thiserror::Error;

pub use expand::Expand;
pub use filter::{Condition, Filter, FilterValue, Operator, compare_values};
pub use params::{CONTROL_KEYS, DEFAULT_LIMIT, DEFAULT_PAGE, ListQuery};
pub use sort::{SortKey, sort_documents};

/// A request query that cannot be translated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown query field '{0}'")]
    UnknownField(String),

    #[error("unsupported operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}
