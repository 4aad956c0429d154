use std::{collections::HashMap, sync::Arc};

use crate::{Model, Repository};

/// Resolves the repository and model names used in index mappings.
#[derive(Clone, Default)]
pub struct Registry {
	repositories: HashMap<String, Arc<dyn Repository>>,
	models: HashMap<String, Arc<dyn Model>>,
}
impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_repository(
		mut self,
		name: impl Into<String>,
		repository: Arc<dyn Repository>,
	) -> Self {
		self.repositories.insert(name.into(), repository);

		self
	}

	pub fn register_model(mut self, name: impl Into<String>, model: Arc<dyn Model>) -> Self {
		self.models.insert(name.into(), model);

		self
	}

	pub fn repository(&self, name: &str) -> Option<&dyn Repository> {
		self.repositories.get(name).map(|repository| repository.as_ref())
	}

	pub fn model(&self, name: &str) -> Option<&dyn Model> {
		self.models.get(name).map(|model| model.as_ref())
	}
}
