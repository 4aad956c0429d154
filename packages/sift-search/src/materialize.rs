use std::collections::HashMap;

use sift_config::IndexMapping;
use sift_storage::{Record, Storage, WhereIn};

use crate::{Error, Model, ModelQuery, Registry, Repository, Result, state::EagerLoad};

/// How records for a batch of ids are fetched, picked from the index mapping.
pub(crate) enum Strategy<'a> {
	ByRepository { name: &'a str, repository: &'a dyn Repository, column: &'a str },
	ByModel { name: &'a str, model: &'a dyn Model, column: &'a str },
	ByTable { table: &'a str, storage: &'a Storage, column: &'a str },
}
impl<'a> Strategy<'a> {
	/// Repository wins over model, model over table.
	pub(crate) fn resolve(
		index: &str,
		mapping: &'a IndexMapping,
		registry: &'a Registry,
		storage: Option<&'a Storage>,
	) -> Result<Self> {
		let column = mapping.column.as_str();

		if let Some(name) = mapping.repository.as_deref() {
			let repository = registry
				.repository(name)
				.ok_or_else(|| Error::UnknownRepository { name: name.to_string() })?;

			return Ok(Self::ByRepository { name, repository, column });
		}
		if let Some(name) = mapping.model.as_deref() {
			let model =
				registry.model(name).ok_or_else(|| Error::UnknownModel { name: name.to_string() })?;

			return Ok(Self::ByModel { name, model, column });
		}

		let Some(table) = mapping.table.as_deref() else {
			return Err(Error::UnmappedIndex { index: index.to_string() });
		};
		let storage = storage.ok_or(Error::NoStorageSession)?;

		Ok(Self::ByTable { table, storage, column })
	}

	pub(crate) fn name(&self) -> &'a str {
		match self {
			Self::ByRepository { name, .. } | Self::ByModel { name, .. } => *name,
			Self::ByTable { table, .. } => *table,
		}
	}

	pub(crate) async fn fetch(
		&self,
		ids: &[u64],
		eager_loads: Vec<EagerLoad>,
		where_in: &[WhereIn],
	) -> Result<Vec<Record>> {
		match self {
			Self::ByRepository { repository, column, .. } => {
				if !eager_loads.is_empty() || !where_in.is_empty() {
					tracing::debug!(
						strategy = self.name(),
						"Repository fetch ignores eager loads and where-in constraints."
					);
				}

				repository.find_in_range(column, ids).await
			},
			Self::ByModel { model, column, .. } => {
				// Eager loading and ad-hoc constraints are exclusive for models.
				let where_in = if eager_loads.is_empty() { where_in.to_vec() } else { Vec::new() };
				let query = ModelQuery {
					column: column.to_string(),
					ids: ids.to_vec(),
					eager_loads,
					where_in,
				};

				model.fetch(&query).await
			},
			Self::ByTable { table, storage, column } => {
				if !eager_loads.is_empty() || !where_in.is_empty() {
					tracing::debug!(
						table,
						"Table fetch ignores eager loads and where-in constraints."
					);
				}

				Ok(storage.fetch_by_ids(table, column, ids).await?)
			},
		}
	}
}

/// Reorders `records` to follow `ids`. Ids with no record are skipped, records whose key is
/// missing or not among `ids` are dropped, and a repeated id yields its record again.
pub(crate) fn resort(ids: &[u64], records: Vec<Record>, primary_key: &str) -> Vec<Record> {
	let mut by_key = HashMap::with_capacity(records.len());

	for record in records {
		if let Some(key) = record.key(primary_key) {
			by_key.entry(key).or_insert(record);
		}
	}

	ids.iter().filter_map(|id| by_key.get(id).cloned()).collect()
}
