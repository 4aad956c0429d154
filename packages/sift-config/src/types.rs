use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub daemon: Daemon,
	#[serde(default)]
	pub indexes: Vec<Index>,
	/// Optional. Index selected at startup; may be a comma-joined list. Defaults to the first
	/// entry of `indexes`.
	pub default_index: Option<String>,
	/// Optional. Mapping used for every fetch, typically set when several indexes are searched
	/// together.
	pub mapping: Option<IndexMapping>,
	/// "mysql" or "pgsql". Any other value leaves the client without a storage session.
	pub driver: Option<String>,
	pub database: Option<Database>,
}
impl Config {
	pub fn default_index_name(&self) -> Option<&str> {
		self.default_index.as_deref().or_else(|| self.indexes.first().map(|index| index.name.as_str()))
	}

	pub fn index(&self, name: &str) -> Option<&IndexMapping> {
		self.indexes.iter().find(|index| index.name == name).map(|index| &index.mapping)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Daemon {
	#[serde(default = "default_daemon_host")]
	pub host: String,
	#[serde(default = "default_daemon_port")]
	pub port: u16,
	/// Connect timeout in seconds.
	#[serde(default = "default_daemon_timeout")]
	pub timeout: u64,
}
impl Default for Daemon {
	fn default() -> Self {
		Self {
			host: default_daemon_host(),
			port: default_daemon_port(),
			timeout: default_daemon_timeout(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub name: String,
	#[serde(flatten)]
	pub mapping: IndexMapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexMapping {
	pub table: Option<String>,
	#[serde(default = "default_key_column")]
	pub column: String,
	#[serde(default = "default_key_column")]
	pub primary_key: String,
	pub repository: Option<String>,
	#[serde(alias = "modelname")]
	pub model: Option<String>,
}
impl IndexMapping {
	pub fn table(table: impl Into<String>) -> Self {
		Self {
			table: Some(table.into()),
			column: default_key_column(),
			primary_key: default_key_column(),
			repository: None,
			model: None,
		}
	}
}

/// Every connection key is optional at parse time so that validation can name all missing keys
/// at once.
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub dbname: Option<String>,
	pub user: Option<String>,
	pub password: Option<String>,
	#[serde(default = "default_pool_max_conns")]
	pub pool_max_conns: u32,
}

fn default_daemon_host() -> String {
	"127.0.0.1".to_string()
}

fn default_daemon_port() -> u16 {
	9308
}

fn default_daemon_timeout() -> u64 {
	30
}

fn default_key_column() -> String {
	"id".to_string()
}

fn default_pool_max_conns() -> u32 {
	1
}
