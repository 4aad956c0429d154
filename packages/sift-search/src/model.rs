use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use sift_storage::{Record, Storage, WhereIn};

use crate::{BoxFuture, Model, ModelQuery, Result, state::{EagerLoad, RelationQuery}};

/// A has-many relation: rows of `table` whose `foreign_key` equals the parent's `local_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
	pub name: String,
	pub table: String,
	pub foreign_key: String,
	pub local_key: String,
}
impl Relation {
	pub fn new(
		name: impl Into<String>,
		table: impl Into<String>,
		foreign_key: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			table: table.into(),
			foreign_key: foreign_key.into(),
			local_key: "id".to_string(),
		}
	}

	pub fn local_key(mut self, local_key: impl Into<String>) -> Self {
		self.local_key = local_key.into();

		self
	}
}

/// A model backed by one table of the storage session, with relations it can eager-load.
///
/// Related rows are attached to each parent under the relation name as an array.
pub struct TableModel {
	storage: Arc<Storage>,
	table: String,
	relations: Vec<Relation>,
}
impl TableModel {
	pub fn new(storage: Arc<Storage>, table: impl Into<String>) -> Self {
		Self { storage, table: table.into(), relations: Vec::new() }
	}

	pub fn with_relation(mut self, relation: Relation) -> Self {
		self.relations.push(relation);

		self
	}

	async fn load(&self, query: &ModelQuery) -> Result<Vec<Record>> {
		let mut constraints = Vec::with_capacity(query.where_in.len() + 1);

		constraints.push(WhereIn::ids(&query.column, &query.ids));
		constraints.extend(query.where_in.iter().cloned());

		let mut records = self.storage.select(&self.table, &constraints, None).await?;

		for load in &query.eager_loads {
			let Some(relation) = self.relations.iter().find(|r| r.name == load.relation()) else {
				tracing::warn!(
					table = %self.table,
					relation = load.relation(),
					"Unknown relation requested for eager loading. Skipped."
				);

				continue;
			};

			self.attach(relation, load, &mut records).await?;
		}

		Ok(records)
	}

	async fn attach(
		&self,
		relation: &Relation,
		load: &EagerLoad,
		records: &mut [Record],
	) -> Result<()> {
		let mut scope = RelationQuery::default();

		load.apply_scope(&mut scope);

		let keys = records
			.iter()
			.filter_map(|record| record.get(&relation.local_key))
			.filter(|key| !key.is_null())
			.cloned()
			.collect::<Vec<_>>();
		let mut constraints = vec![WhereIn::new(&relation.foreign_key, keys)];

		constraints.extend(scope.where_in);

		let related = self.storage.select(&relation.table, &constraints, scope.limit).await?;
		let mut children: HashMap<String, Vec<Value>> = HashMap::new();

		for child in related {
			let Some(key) = child.get(&relation.foreign_key).map(Value::to_string) else {
				continue;
			};

			children.entry(key).or_default().push(Value::Object(child.into_fields()));
		}

		for record in records.iter_mut() {
			let attached = record
				.get(&relation.local_key)
				.and_then(|key| children.get(&key.to_string()))
				.cloned()
				.unwrap_or_default();

			record.insert(relation.name.clone(), Value::Array(attached));
		}

		Ok(())
	}
}
impl Model for TableModel {
	fn fetch<'a>(&'a self, query: &'a ModelQuery) -> BoxFuture<'a, Result<Vec<Record>>> {
		Box::pin(self.load(query))
	}
}
