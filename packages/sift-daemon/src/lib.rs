pub mod http;
pub mod query;
pub mod response;
pub mod sphinxql;

mod error;

pub use error::{Error, Result};
pub use http::HttpDaemon;
pub use query::{
	ExcerptOptions, Filter, FilterKind, GeoAnchor, GroupBy, GroupFunc, Limits, MatchMode,
	RankingMode, SearchQuery, SortMode,
};
pub use response::{Match, SearchResponse};

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The search daemon as seen by the client: one query per call, plus highlighting.
pub trait SearchDaemon
where
	Self: Send + Sync,
{
	fn query<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<SearchResponse>>;

	fn build_excerpts<'a>(
		&'a self,
		docs: &'a [String],
		index: &'a str,
		words: &'a str,
		opts: &'a ExcerptOptions,
	) -> BoxFuture<'a, Result<Vec<String>>>;

	fn escape_string(&self, text: &str) -> String {
		sphinxql::escape_query(text)
	}
}
