use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use sift_config::{Config, IndexMapping};
use sift_daemon::{
	Filter, FilterKind, GeoAnchor, GroupBy, GroupFunc, HttpDaemon, Limits, MatchMode, RankingMode,
	SearchDaemon, SearchResponse, SortMode, query::is_multi_index,
};
use sift_storage::{Driver, Storage, WhereIn};

use crate::{
	Error, Registry, Result,
	materialize::{self, Strategy},
	outcome::{SearchEnvelope, SearchOutcome},
	state::{EagerLoad, FilterValues, QueryState},
};

const DEFAULT_GROUP_SORT: &str = "@group desc";

/// Fluent search builder over one daemon and one optional storage session.
///
/// Setters consume and return the client. `query()` and `get()` run the accumulated state and
/// leave it in place for the next call, except for eager loads, which `get()` consumes.
pub struct SearchClient {
	cfg: Config,
	daemon: Arc<dyn SearchDaemon>,
	storage: Option<Arc<Storage>>,
	registry: Registry,
	state: QueryState,
	envelope: Option<SearchEnvelope>,
	last_error: Option<String>,
}
impl SearchClient {
	/// Validates `cfg`, then opens the HTTP daemon client and, when a driver is configured, the
	/// storage session. Validation failures are raised before any network traffic.
	pub async fn connect(cfg: Config, registry: Registry) -> Result<Self> {
		sift_config::validate(&cfg)?;

		let driver = resolve_driver(&cfg)?;
		let daemon = HttpDaemon::new(&cfg.daemon)?;
		let storage = match (driver, cfg.database.as_ref()) {
			(Some(driver), Some(database)) => Some(Arc::new(Storage::connect(driver, database).await?)),
			_ => None,
		};

		tracing::info!(endpoint = daemon.endpoint(), "Search client ready.");

		Ok(Self::assemble(cfg, Arc::new(daemon), storage, registry))
	}

	/// Builds a client around collaborators the caller already owns.
	pub fn with_parts(
		cfg: Config,
		daemon: Arc<dyn SearchDaemon>,
		storage: Option<Arc<Storage>>,
		registry: Registry,
	) -> Result<Self> {
		sift_config::validate(&cfg)?;

		Ok(Self::assemble(cfg, daemon, storage, registry))
	}

	fn assemble(
		cfg: Config,
		daemon: Arc<dyn SearchDaemon>,
		storage: Option<Arc<Storage>>,
		registry: Registry,
	) -> Self {
		let index = cfg.default_index_name().unwrap_or_default().to_string();
		let mut state = QueryState::new(index);

		state.mapping_override_expected = is_multi_index(&state.query.index);

		Self { cfg, daemon, storage, registry, state, envelope: None, last_error: None }
	}

	pub fn set_field_weights<I, K>(mut self, weights: I) -> Self
	where
		I: IntoIterator<Item = (K, u32)>,
		K: Into<String>,
	{
		self.state.query.field_weights = collect_weights(weights);

		self
	}

	pub fn set_index_weights<I, K>(mut self, weights: I) -> Self
	where
		I: IntoIterator<Item = (K, u32)>,
		K: Into<String>,
	{
		self.state.query.index_weights = collect_weights(weights);

		self
	}

	pub fn set_match_mode(mut self, mode: MatchMode) -> Self {
		self.state.query.match_mode = mode;

		self
	}

	pub fn set_ranking_mode(mut self, mode: RankingMode) -> Self {
		self.state.query.ranking_mode = mode;

		self
	}

	pub fn set_sort_mode(mut self, mode: SortMode) -> Self {
		self.state.query.sort_mode = mode;

		self
	}

	pub fn set_filter_float_range(
		mut self,
		attribute: impl Into<String>,
		min: f64,
		max: f64,
		exclude: bool,
	) -> Self {
		self.state.query.filters.push(Filter {
			attribute: attribute.into(),
			kind: FilterKind::FloatRange { min, max },
			exclude,
		});

		self
	}

	/// Anchor point for `@geodist`. Coordinates are in radians.
	pub fn set_geo_anchor(
		mut self,
		lat_attr: impl Into<String>,
		long_attr: impl Into<String>,
		lat: f64,
		long: f64,
	) -> Self {
		self.state.query.geo_anchor =
			Some(GeoAnchor { lat_attr: lat_attr.into(), long_attr: long_attr.into(), lat, long });

		self
	}

	pub fn set_group_by(
		mut self,
		attribute: impl Into<String>,
		func: GroupFunc,
		sort: impl Into<String>,
	) -> Self {
		self.state.query.group_by =
			Some(GroupBy { attribute: attribute.into(), func, sort: sort.into() });

		self
	}

	/// Groups with the default `@group desc` ordering.
	pub fn group_by(self, attribute: impl Into<String>, func: GroupFunc) -> Self {
		self.set_group_by(attribute, func, DEFAULT_GROUP_SORT)
	}

	pub fn set_select(mut self, select: impl Into<String>) -> Self {
		self.state.query.select = Some(select.into());

		self
	}

	/// First `limit` matches; max-matches and cutoff are both set to 1000.
	pub fn limit(mut self, limit: u32) -> Self {
		self.state.query.limits = Limits::first(limit);

		self
	}

	pub fn limits(mut self, limits: Limits) -> Self {
		self.state.query.limits = limits;

		self
	}

	/// Keeps matches whose `attribute` is one of `values`, or none of them when `exclude` is set.
	/// Non-integer values are coerced; an empty collection adds no filter.
	pub fn filter(
		mut self,
		attribute: impl Into<String>,
		values: impl FilterValues,
		exclude: bool,
	) -> Self {
		let values = values.into_filter_values();

		if values.is_empty() {
			return self;
		}

		self.state.query.filters.push(Filter {
			attribute: attribute.into(),
			kind: FilterKind::Values(values),
			exclude,
		});

		self
	}

	pub fn range(mut self, attribute: impl Into<String>, min: i64, max: i64, exclude: bool) -> Self {
		self.state.query.filters.push(Filter {
			attribute: attribute.into(),
			kind: FilterKind::Range { min, max },
			exclude,
		});

		self
	}

	/// Extra `column IN (values)` constraint on the record fetch. Replaces an earlier constraint
	/// on the same column and survives later searches.
	pub fn where_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		self.state.set_where_in(WhereIn::new(column, values));

		self
	}

	/// Relations to load with the next `get()`. Repeated calls accumulate.
	pub fn with<I>(mut self, loads: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<EagerLoad>,
	{
		self.state.eager_loads.extend(loads.into_iter().map(Into::into));

		self
	}

	/// Starts a new search: sets the text, optionally switches index, and clears filters,
	/// ranges, the geo anchor and grouping.
	pub fn search(mut self, text: impl Into<String>, index: Option<&str>) -> Self {
		self.state.query.text = text.into();

		if let Some(index) = index {
			self.state.mapping_override_expected = is_multi_index(index);

			if self.state.mapping_override_expected && self.cfg.mapping.is_none() {
				tracing::warn!(
					index,
					"Searching several indexes without a [mapping] section. Fetches will fail."
				);
			}

			self.state.query.index = index.to_string();
		}

		self.state.query.reset_filters();
		self.state.query.reset_group_by();

		self
	}

	/// Runs the search and returns the daemon's raw response.
	pub async fn query(&mut self) -> sift_daemon::Result<SearchResponse> {
		match self.daemon.query(&self.state.query).await {
			Ok(response) => {
				self.last_error = None;

				Ok(response)
			},
			Err(err) => {
				tracing::warn!(index = %self.state.query.index, error = %err, "Search failed.");

				self.last_error = Some(err.to_string());

				Err(err)
			},
		}
	}

	/// Runs the search and loads the matched records. With `respect_sort_order` the records
	/// follow the daemon's ranking; otherwise they come in fetch order.
	///
	/// A daemon failure is returned inside the outcome. Mapping and fetch failures are `Err`.
	pub async fn get(&mut self, respect_sort_order: bool) -> Result<SearchOutcome> {
		let eager_loads = std::mem::take(&mut self.state.eager_loads);
		let response = match self.query().await {
			Ok(response) => response,
			Err(err) => {
				self.envelope = None;

				return Ok(SearchOutcome::failed(err));
			},
		};
		let envelope = SearchEnvelope::from(response);
		let ids = envelope.ids();

		self.envelope = Some(envelope.clone());

		if ids.is_empty() {
			return Ok(SearchOutcome { records: Vec::new(), envelope: Some(envelope), error: None });
		}

		let index = self.state.query.index.as_str();
		let mapping = self.active_mapping()?;
		let strategy =
			Strategy::resolve(index, mapping, &self.registry, self.storage.as_deref())?;
		let records = strategy.fetch(&ids, eager_loads, &self.state.where_in).await?;

		if records.len() < ids.len() {
			tracing::debug!(
				strategy = strategy.name(),
				matched = ids.len(),
				fetched = records.len(),
				"Some matched documents have no record."
			);
		}

		let records = if respect_sort_order {
			materialize::resort(&ids, records, &mapping.primary_key)
		} else {
			records
		};

		Ok(SearchOutcome { records, envelope: Some(envelope), error: None })
	}

	/// `[mapping]` when configured, otherwise the active index's own entry.
	fn active_mapping(&self) -> Result<&IndexMapping> {
		if let Some(mapping) = self.cfg.mapping.as_ref() {
			return Ok(mapping);
		}

		self.cfg
			.index(&self.state.query.index)
			.ok_or_else(|| Error::UnmappedIndex { index: self.state.query.index.clone() })
	}

	/// Total matches of the last successful search, 0 before any.
	pub fn total_count(&self) -> u64 {
		self.envelope.as_ref().map(|envelope| envelope.total_found).unwrap_or_default()
	}

	/// Daemon time of the last successful search, in seconds.
	pub fn time(&self) -> Option<f64> {
		self.envelope.as_ref().map(|envelope| envelope.elapsed_secs)
	}

	pub fn error_message(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	pub fn warning_message(&self) -> Option<&str> {
		self.envelope.as_ref().and_then(|envelope| envelope.warning.as_deref())
	}

	pub fn envelope(&self) -> Option<&SearchEnvelope> {
		self.envelope.as_ref()
	}

	pub fn state(&self) -> &QueryState {
		&self.state
	}

	pub fn config(&self) -> &Config {
		&self.cfg
	}

	pub fn storage(&self) -> Option<&Storage> {
		self.storage.as_deref()
	}

	pub(crate) fn daemon(&self) -> &dyn SearchDaemon {
		self.daemon.as_ref()
	}

	/// Escapes full-text query syntax the way the daemon expects.
	pub fn escape_string_ql(&self, text: &str) -> String {
		self.daemon.escape_string(text)
	}
}

fn resolve_driver(cfg: &Config) -> Result<Option<Driver>> {
	let Some(name) = cfg.driver.as_deref() else {
		tracing::warn!("No storage driver configured. Table mappings cannot be fetched.");

		return Ok(None);
	};
	let Some(driver) = Driver::from_name(name) else {
		tracing::warn!(driver = name, "Unknown storage driver. No storage session opened.");

		return Ok(None);
	};

	if !driver.is_available() {
		return Err(Error::DriverUnavailable { driver: name.to_string() });
	}

	Ok(Some(driver))
}

fn collect_weights<I, K>(weights: I) -> BTreeMap<String, u32>
where
	I: IntoIterator<Item = (K, u32)>,
	K: Into<String>,
{
	weights.into_iter().map(|(name, weight)| (name.into(), weight)).collect()
}
