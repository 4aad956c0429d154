mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Daemon, Database, Index, IndexMapping};

use std::{collections::HashSet, fs, path::Path};

pub const REQUIRED_DATABASE_KEYS: [&str; 5] = ["host", "port", "dbname", "user", "password"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	validate_database(cfg)?;

	if cfg.daemon.host.trim().is_empty() {
		return Err(Error::Validation { message: "daemon.host must be non-empty.".to_string() });
	}
	if cfg.daemon.port == 0 {
		return Err(Error::Validation {
			message: "daemon.port must be greater than zero.".to_string(),
		});
	}
	if cfg.indexes.is_empty() {
		return Err(Error::Validation {
			message: "indexes must contain at least one index.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for index in &cfg.indexes {
		if index.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "indexes.name must be non-empty.".to_string(),
			});
		}
		if !seen.insert(index.name.as_str()) {
			return Err(Error::Validation {
				message: format!("indexes.name {:?} is configured more than once.", index.name),
			});
		}

		validate_mapping(&format!("indexes.{}", index.name), &index.mapping)?;
	}

	if let Some(mapping) = cfg.mapping.as_ref() {
		validate_mapping("mapping", mapping)?;
	}
	if let Some(default_index) = cfg.default_index.as_deref()
		&& default_index.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "default_index must be non-empty when set.".to_string(),
		});
	}

	Ok(())
}

fn validate_database(cfg: &Config) -> Result<()> {
	let Some(database) = cfg.database.as_ref() else {
		return Err(Error::Validation {
			message: "database must be configured with host, port, dbname, user, and password."
				.to_string(),
		});
	};
	let present = [
		database.host.is_some(),
		database.port.is_some(),
		database.dbname.is_some(),
		database.user.is_some(),
		database.password.is_some(),
	];
	let missing = REQUIRED_DATABASE_KEYS
		.iter()
		.zip(present)
		.filter(|(_, present)| !present)
		.map(|(key, _)| format!("database.{key}"))
		.collect::<Vec<_>>();

	if !missing.is_empty() {
		return Err(Error::Validation {
			message: format!("Missing database connection params: {}.", missing.join(", ")),
		});
	}
	if database.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "database.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_mapping(label: &str, mapping: &IndexMapping) -> Result<()> {
	if mapping.column.trim().is_empty() {
		return Err(Error::Validation { message: format!("{label}.column must be non-empty.") });
	}
	if mapping.primary_key.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("{label}.primary_key must be non-empty."),
		});
	}
	if mapping.table.is_none() && mapping.repository.is_none() && mapping.model.is_none() {
		return Err(Error::Validation {
			message: format!("{label} must set one of table, repository, or model."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.driver.as_deref().map(|driver| driver.trim().is_empty()).unwrap_or(false) {
		cfg.driver = None;
	}
	if cfg.default_index.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false) {
		cfg.default_index = None;
	}

	let mappings = cfg
		.indexes
		.iter_mut()
		.map(|index| &mut index.mapping)
		.chain(cfg.mapping.as_mut());

	for mapping in mappings {
		for target in [&mut mapping.table, &mut mapping.repository, &mut mapping.model] {
			if target.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
				*target = None;
			}
		}
	}
}
