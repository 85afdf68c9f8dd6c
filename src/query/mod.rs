//! Query-string translation for catalog listings.
//!
//! A listing request arrives as a [`RawQuery`] (keys to one or more values).
//! [`QueryTranslator::translate`] validates every key against the allow-list
//! and produces a [`QuerySpec`]: a filter predicate, a sort order, a
//! projection and a pagination window. Nothing here touches the database;
//! [`sql`] renders a spec into PostgreSQL for the repository layer.
//!
//! ```
//! use marquee::query::{QueryTranslator, RawQuery, SortKey};
//!
//! let raw: RawQuery = [("genres", "Action,Comedy"), ("price[lte]", "20"), ("sort", "-ratings")]
//!     .into_iter()
//!     .collect();
//! let spec = QueryTranslator::movies().translate(&raw).unwrap();
//!
//! assert_eq!(spec.filter.len(), 2);
//! assert_eq!(spec.sort_keys, vec![SortKey::descending("ratings")]);
//! assert_eq!(spec.pagination.skip, 0);
//! ```

mod error;
pub mod filter;
mod raw;
pub mod sql;
mod translator;

pub use error::QueryError;
pub use filter::{ComparisonOp, FieldPredicate, FilterPredicate, FilterValue, RangeBounds};
pub use raw::RawQuery;
pub use translator::{
    CONTROL_KEYS, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD, INTERNAL_FIELDS,
    Pagination, Preset, Projection, QuerySpec, QueryTranslator, SortDirection, SortKey,
    check_page_bounds,
};
