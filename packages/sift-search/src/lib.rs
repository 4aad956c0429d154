pub mod client;
pub mod excerpt;
pub mod model;
pub mod outcome;
pub mod registry;
pub mod state;

mod error;
mod materialize;

pub use client::SearchClient;
pub use error::{Error, Result};
pub use excerpt::{render_snippets_call, strip_tags};
pub use model::{Relation, TableModel};
pub use outcome::{SearchEnvelope, SearchOutcome};
pub use registry::Registry;
pub use sift_daemon::{
	BoxFuture, ExcerptOptions, GroupFunc, Limits, Match, MatchMode, RankingMode, SearchDaemon,
	SearchQuery, SearchResponse, SortMode,
};
pub use sift_storage::{Driver, Record, Storage, WhereIn};
pub use state::{EagerLoad, FilterValue, FilterValues, QueryState, RelationQuery};

/// Bulk fetch by a named repository, called with the mapping's column and the matched ids.
pub trait Repository
where
	Self: Send + Sync,
{
	fn find_in_range<'a>(
		&'a self,
		column: &'a str,
		ids: &'a [u64],
	) -> BoxFuture<'a, Result<Vec<Record>>>;
}

/// Bulk fetch by a named model, with eager loads or ad-hoc constraints.
pub trait Model
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self, query: &'a ModelQuery) -> BoxFuture<'a, Result<Vec<Record>>>;
}

/// What a model is asked to load. `where_in` is empty whenever `eager_loads` is not.
#[derive(Debug, Clone)]
pub struct ModelQuery {
	pub column: String,
	pub ids: Vec<u64>,
	pub eager_loads: Vec<EagerLoad>,
	pub where_in: Vec<WhereIn>,
}
