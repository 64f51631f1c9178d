//! Declarative feed compilation for the Nordlys feed generator.
//!
//! A feed is described in TOML as a set of filters plus a stack of scoring
//! layers. This crate compiles that description once at startup into a
//! [`Feed`] holding a query builder, and at request time compiles
//! `(limit, cursor)` into a single parameterized SQL statement the store
//! executes verbatim.
//!
//! Compilation is pure: nothing here touches the database.

mod builder;
mod filter;
mod keyword;
mod pagination;
mod registry;
mod scoring;

use thiserror::Error;

pub use builder::FeedQueryBuilder;
pub use filter::FilterClause;
pub use keyword::{prepare_list, prepare_token};
pub use pagination::{paginate, parse_cursor};
pub use registry::{Feed, Registry};
pub use scoring::ScoringLayer;

/// Result type alias for feed compilation.
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Errors raised while compiling the feeds configuration.
///
/// All of these are fatal at startup: a config that references unknown
/// types or keyword lists must not come up half-working.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FeedError {
    /// A filter entry used a `type` this build does not know.
    #[error("feed '{feed_id}': unknown filter type '{kind}'")]
    UnknownFilterType { feed_id: String, kind: String },

    /// A scoring entry used a `type` this build does not know.
    #[error("feed '{feed_id}': unknown scoring type '{kind}'")]
    UnknownScoringType { feed_id: String, kind: String },

    /// A filter or scoring layer referenced a keyword list that is not in
    /// `[keywords]`.
    #[error("feed '{feed_id}': unknown keyword list '{name}'")]
    UnknownKeywordList { feed_id: String, name: String },

    /// Two feeds share the same id.
    #[error("duplicate feed id '{feed_id}'")]
    DuplicateFeedId { feed_id: String },
}
