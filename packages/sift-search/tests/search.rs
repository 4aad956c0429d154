use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use serde_json::{Map, json};

use sift_config::{Config, Daemon, Database, Index, IndexMapping};
use sift_daemon::{Filter, FilterKind};
use sift_search::{
	BoxFuture, EagerLoad, Error, ExcerptOptions, GroupFunc, Limits, Match, Model, ModelQuery,
	Record, Registry, Repository, Result, SearchClient, SearchDaemon, SearchQuery, SearchResponse,
	SortMode,
};

enum Reply {
	Ids(Vec<u64>),
	Fail(&'static str),
}

struct SpyDaemon {
	reply: Mutex<Reply>,
	queries: Mutex<Vec<SearchQuery>>,
	excerpt_calls: Mutex<Vec<(Vec<String>, String, String)>>,
}
impl SpyDaemon {
	fn new(reply: Reply) -> Arc<Self> {
		Arc::new(Self {
			reply: Mutex::new(reply),
			queries: Mutex::new(Vec::new()),
			excerpt_calls: Mutex::new(Vec::new()),
		})
	}

	fn set_reply(&self, reply: Reply) {
		*self.reply.lock().expect("lock") = reply;
	}

	fn last_query(&self) -> SearchQuery {
		self.queries.lock().expect("lock").last().cloned().expect("No query was sent.")
	}
}
impl SearchDaemon for SpyDaemon {
	fn query<'a>(
		&'a self,
		query: &'a SearchQuery,
	) -> BoxFuture<'a, sift_daemon::Result<SearchResponse>> {
		self.queries.lock().expect("lock").push(query.clone());

		let reply = match &*self.reply.lock().expect("lock") {
			Reply::Ids(ids) => Ok(SearchResponse {
				total: ids.len() as u64,
				total_found: if ids.is_empty() { 0 } else { ids.len() as u64 + 40 },
				time: 0.004,
				matches: ids
					.iter()
					.map(|id| Match { id: *id, weight: 1.0, attrs: Map::new() })
					.collect(),
				warning: None,
			}),
			Reply::Fail(message) =>
				Err(sift_daemon::Error::Daemon { message: message.to_string() }),
		};

		Box::pin(async move { reply })
	}

	fn build_excerpts<'a>(
		&'a self,
		docs: &'a [String],
		index: &'a str,
		words: &'a str,
		_opts: &'a ExcerptOptions,
	) -> BoxFuture<'a, sift_daemon::Result<Vec<String>>> {
		self.excerpt_calls.lock().expect("lock").push((
			docs.to_vec(),
			index.to_string(),
			words.to_string(),
		));

		let snippets = docs.iter().map(|doc| format!("<b>{doc}</b>")).collect();

		Box::pin(async move { Ok(snippets) })
	}
}

struct SpyRepository {
	rows: Vec<Record>,
	calls: AtomicUsize,
}
impl SpyRepository {
	fn new(ids: &[u64]) -> Arc<Self> {
		let rows = ids.iter().map(|id| product(*id)).collect();

		Arc::new(Self { rows, calls: AtomicUsize::new(0) })
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Repository for SpyRepository {
	fn find_in_range<'a>(
		&'a self,
		column: &'a str,
		ids: &'a [u64],
	) -> BoxFuture<'a, Result<Vec<Record>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let rows = self
			.rows
			.iter()
			.filter(|row| row.key(column).map(|key| ids.contains(&key)).unwrap_or(false))
			.cloned()
			.collect();

		Box::pin(async move { Ok(rows) })
	}
}

#[derive(Default)]
struct SpyModel {
	queries: Mutex<Vec<ModelQuery>>,
}
impl Model for SpyModel {
	fn fetch<'a>(&'a self, query: &'a ModelQuery) -> BoxFuture<'a, Result<Vec<Record>>> {
		self.queries.lock().expect("lock").push(query.clone());

		let rows = query
			.ids
			.iter()
			.map(|id| {
				Record::from_serialize(&json!({ "article_id": id })).expect("Record must build.")
			})
			.collect();

		Box::pin(async move { Ok(rows) })
	}
}

fn product(id: u64) -> Record {
	Record::from_serialize(&json!({ "id": id, "title": format!("product-{id}") }))
		.expect("Record must build.")
}

fn repository_mapping(name: &str) -> IndexMapping {
	IndexMapping {
		table: None,
		column: "id".to_string(),
		primary_key: "id".to_string(),
		repository: Some(name.to_string()),
		model: None,
	}
}

fn test_config() -> Config {
	Config {
		daemon: Daemon { host: "192.0.2.1".to_string(), port: 9308, timeout: 1 },
		indexes: vec![
			Index { name: "products".to_string(), mapping: repository_mapping("ProductRepository") },
			Index {
				name: "articles".to_string(),
				mapping: IndexMapping {
					table: None,
					column: "article_id".to_string(),
					primary_key: "article_id".to_string(),
					repository: None,
					model: Some("Article".to_string()),
				},
			},
			Index { name: "stock".to_string(), mapping: IndexMapping::table("stock") },
		],
		default_index: None,
		mapping: None,
		driver: Some("pgsql".to_string()),
		database: Some(Database {
			host: Some("127.0.0.1".to_string()),
			port: Some(5432),
			dbname: Some("shop".to_string()),
			user: Some("shop".to_string()),
			password: Some("secret".to_string()),
			pool_max_conns: 1,
		}),
	}
}

fn client_with(cfg: Config, daemon: Arc<SpyDaemon>, registry: Registry) -> SearchClient {
	SearchClient::with_parts(cfg, daemon, None, registry).expect("Failed to build client.")
}

fn product_registry(repository: Arc<SpyRepository>) -> Registry {
	Registry::new().register_repository("ProductRepository", repository)
}

fn record_ids(records: &[Record], key: &str) -> Vec<u64> {
	records.iter().filter_map(|record| record.key(key)).collect()
}

#[tokio::test]
async fn connect_rejects_missing_password_before_any_network() {
	let mut cfg = test_config();

	if let Some(database) = cfg.database.as_mut() {
		database.password = None;
	}

	let err = SearchClient::connect(cfg, Registry::new())
		.await
		.err()
		.expect("Expected a configuration error.");

	assert!(err.is_config());
	assert!(err.to_string().contains("database.password"), "Unexpected error: {err}");
}

#[tokio::test]
async fn get_follows_daemon_ranking_and_skips_missing_records() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![5, 2, 9]));
	let repository = SpyRepository::new(&[9, 5]);
	let mut client = client_with(test_config(), daemon, product_registry(repository.clone()))
		.search("tea", Some("products"));
	let outcome = client.get(true).await.expect("Search should succeed.");

	assert!(!outcome.is_failure());
	assert_eq!(record_ids(&outcome.records, "id"), vec![5, 9]);
	assert_eq!(outcome.total_found(), 43);
	assert_eq!(client.total_count(), 43);
	assert_eq!(client.time(), Some(0.004));
	assert_eq!(repository.count(), 1);

	let unordered = client.get(false).await.expect("Search should succeed.");

	assert_eq!(record_ids(&unordered.records, "id"), vec![9, 5]);
}

#[tokio::test]
async fn zero_matches_skip_the_fetch() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let repository = SpyRepository::new(&[1, 2]);
	let mut client = client_with(test_config(), daemon, product_registry(repository.clone()))
		.search("nothing", None);
	let outcome = client.get(true).await.expect("Search should succeed.");

	assert!(outcome.records.is_empty());
	assert!(outcome.envelope.is_some());
	assert_eq!(repository.count(), 0);
	assert_eq!(client.total_count(), 0);
	assert!(client.error_message().is_none());
}

#[tokio::test]
async fn successful_search_clears_the_previous_error() {
	let daemon = SpyDaemon::new(Reply::Fail("connection refused"));
	let repository = SpyRepository::new(&[4]);
	let mut client =
		client_with(test_config(), daemon.clone(), product_registry(repository)).search("tea", None);
	let failed = client.get(true).await.expect("Daemon failures are not errors.");

	assert!(failed.is_failure());
	assert_eq!(client.error_message(), Some("connection refused"));

	daemon.set_reply(Reply::Ids(vec![4]));

	let outcome = client.get(true).await.expect("Search should succeed.");

	assert!(!outcome.is_failure());
	assert_eq!(record_ids(&outcome.records, "id"), vec![4]);
	assert!(client.error_message().is_none());
	assert_eq!(client.total_count(), 41);
}

#[tokio::test]
async fn daemon_failure_is_reported_in_the_outcome() {
	let daemon = SpyDaemon::new(Reply::Fail("index products: syntax error"));
	let repository = SpyRepository::new(&[1]);
	let mut client = client_with(test_config(), daemon, product_registry(repository.clone()))
		.search("tea", None);
	let outcome = client.get(true).await.expect("Daemon failures are not errors.");

	assert!(outcome.is_failure());
	assert!(outcome.records.is_empty());
	assert!(outcome.envelope.is_none());
	assert_eq!(client.error_message(), Some("index products: syntax error"));
	assert_eq!(client.total_count(), 0);
	assert_eq!(repository.count(), 0);
	assert!(client.query().await.is_err());
}

#[tokio::test]
async fn multi_index_search_uses_the_mapping_override() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![2, 1]));
	let repository = SpyRepository::new(&[1, 2]);
	let mut cfg = test_config();

	cfg.mapping = Some(repository_mapping("ProductRepository"));

	let mut client = client_with(cfg, daemon.clone(), product_registry(repository))
		.search("tea", Some("products_main, products_delta"));

	assert!(client.state().mapping_override_expected());

	let outcome = client.get(true).await.expect("Search should succeed.");

	assert_eq!(record_ids(&outcome.records, "id"), vec![2, 1]);
	assert_eq!(daemon.last_query().index, "products_main, products_delta");
}

#[tokio::test]
async fn multi_index_search_without_mapping_is_unmapped() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![1]));
	let mut client =
		client_with(test_config(), daemon, Registry::new()).search("tea", Some("a,b"));

	assert!(client.state().mapping_override_expected());
	assert!(matches!(client.get(true).await, Err(Error::UnmappedIndex { index }) if index == "a,b"));
}

#[tokio::test]
async fn unregistered_repository_is_an_error() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![1]));
	let mut client = client_with(test_config(), daemon, Registry::new()).search("tea", None);

	assert!(matches!(
		client.get(true).await,
		Err(Error::UnknownRepository { name }) if name == "ProductRepository"
	));
}

#[tokio::test]
async fn table_mapping_without_storage_session_fails() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![1]));
	let mut client =
		client_with(test_config(), daemon, Registry::new()).search("tea", Some("stock"));

	assert!(matches!(client.get(true).await, Err(Error::NoStorageSession)));
}

#[tokio::test]
async fn eager_loads_accumulate_and_are_consumed_by_get() {
	let daemon = SpyDaemon::new(Reply::Ids(vec![7, 3]));
	let model = Arc::new(SpyModel::default());
	let registry = Registry::new().register_model("Article", model.clone());
	let mut client = client_with(test_config(), daemon, registry)
		.search("rust", Some("articles"))
		.where_in("status", ["published"])
		.with(["author"])
		.with([EagerLoad::scoped("comments", |q| {
			q.limit(5);
		})]);

	assert_eq!(client.state().eager_loads().len(), 2);

	let outcome = client.get(true).await.expect("Search should succeed.");

	assert_eq!(record_ids(&outcome.records, "article_id"), vec![7, 3]);
	assert!(client.state().eager_loads().is_empty());

	client.get(true).await.expect("Search should succeed.");

	let queries = model.queries.lock().expect("lock");
	let relations =
		queries[0].eager_loads.iter().map(|load| load.relation().to_string()).collect::<Vec<_>>();

	assert_eq!(relations, vec!["author", "comments"]);
	assert_eq!(queries[0].column, "article_id");
	assert!(queries[0].where_in.is_empty());
	assert!(queries[1].eager_loads.is_empty());
	assert_eq!(queries[1].where_in.len(), 1);
	assert_eq!(queries[1].where_in[0].column, "status");
}

#[tokio::test]
async fn search_resets_filters_and_grouping_but_keeps_where_in() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let mut client = client_with(test_config(), daemon.clone(), Registry::new())
		.where_in("status", ["live"])
		.search("first", None)
		.filter("brand_id", vec!["12abc", "abc"], false)
		.range("price", 10, 20, true)
		.set_geo_anchor("lat", "long", 0.1, 0.2)
		.group_by("created_at", GroupFunc::Day);

	client.query().await.expect("Query should succeed.");

	let sent = daemon.last_query();

	assert_eq!(sent.filters.len(), 2);
	assert_eq!(
		sent.filters[0],
		Filter {
			attribute: "brand_id".to_string(),
			kind: FilterKind::Values(vec![12, 0]),
			exclude: false,
		}
	);
	assert_eq!(sent.group_by.as_ref().map(|group| group.sort.as_str()), Some("@group desc"));

	let mut client = client.search("second", None);

	client.query().await.expect("Query should succeed.");

	let sent = daemon.last_query();

	assert_eq!(sent.text, "second");
	assert_eq!(sent.index, "products");
	assert!(sent.filters.is_empty());
	assert!(sent.geo_anchor.is_none());
	assert!(sent.group_by.is_none());
	assert_eq!(client.state().where_in().len(), 1);
}

#[tokio::test]
async fn setters_shape_the_query() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let mut client = client_with(test_config(), daemon.clone(), Registry::new())
		.search("tea", None)
		.limit(5)
		.set_sort_mode(SortMode::AttrDesc("created_at".to_string()))
		.set_field_weights([("title", 10), ("body", 1)])
		.filter("in_stock", true, false)
		.filter("tags", Vec::<u32>::new(), false)
		.set_filter_float_range("rating", 3.5, 5.0, false);

	client.query().await.expect("Query should succeed.");

	let sent = daemon.last_query();

	assert_eq!(sent.limits, Limits { offset: 0, limit: 5, max_matches: 1_000, cutoff: 1_000 });
	assert_eq!(sent.sort_mode, SortMode::AttrDesc("created_at".to_string()));
	assert_eq!(sent.field_weights.get("title"), Some(&10));
	assert_eq!(sent.filters.len(), 2);
	assert_eq!(sent.filters[0].kind, FilterKind::Values(vec![1]));
	assert_eq!(sent.filters[1].kind, FilterKind::FloatRange { min: 3.5, max: 5.0 });
}

#[tokio::test]
async fn excerpts_use_the_current_text_and_index() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let client =
		client_with(test_config(), daemon.clone(), Registry::new()).search("green tea", None);
	let snippets = client
		.excerpt("Green tea is calming.", &ExcerptOptions::default())
		.await
		.expect("Excerpt should succeed.");

	assert_eq!(snippets, vec!["<b>Green tea is calming.</b>".to_string()]);

	let calls = daemon.excerpt_calls.lock().expect("lock");

	assert_eq!(calls[0].1, "products");
	assert_eq!(calls[0].2, "green tea");
}

#[tokio::test]
async fn snippets_over_storage_need_a_session() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let client = client_with(test_config(), daemon, Registry::new());
	let result = client.snippets_ql(&["<b>hi</b>"], "products", "q's", &[]).await;

	assert!(matches!(result, Err(Error::NoStorageSession)));
}

#[test]
fn escape_string_ql_escapes_query_syntax() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let client = client_with(test_config(), daemon, Registry::new());

	assert_eq!(client.escape_string_ql("a-b (c)"), r"a\-b \(c\)");
}

#[test]
fn default_index_is_the_first_configured_index() {
	let daemon = SpyDaemon::new(Reply::Ids(Vec::new()));
	let client = client_with(test_config(), daemon, Registry::new());

	assert_eq!(client.state().index(), "products");
	assert!(!client.state().mapping_override_expected());
}
