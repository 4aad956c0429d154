use serde_json::Value;
use sqlx::{Database, Encode, QueryBuilder, Type};

use crate::{Driver, Error, Record, Result};

/// `column IN (values...)`, the only predicate the materializer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereIn {
	pub column: String,
	pub values: Vec<Value>,
}
impl WhereIn {
	pub fn new<I, V>(column: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		Self { column: column.into(), values: values.into_iter().map(Into::into).collect() }
	}

	pub fn ids(column: impl Into<String>, ids: &[u64]) -> Self {
		Self::new(column, ids.iter().copied())
	}
}

/// One long-lived session against the configured relational store.
pub enum Storage {
	#[cfg(feature = "mysql")]
	MySql(sqlx::MySqlPool),
	#[cfg(feature = "postgres")]
	Postgres(sqlx::PgPool),
}
impl Storage {
	pub async fn connect(driver: Driver, cfg: &sift_config::Database) -> Result<Self> {
		let params = ConnectParams::from_config(cfg)?;
		let storage = match driver {
			#[cfg(feature = "mysql")]
			Driver::MySql => Self::MySql(crate::mysql::connect(&params).await?),
			#[cfg(feature = "postgres")]
			Driver::Postgres => Self::Postgres(crate::postgres::connect(&params).await?),
			#[allow(unreachable_patterns)]
			_ => return Err(Error::DriverUnavailable { driver: driver.as_str().to_string() }),
		};

		tracing::info!(
			driver = driver.as_str(),
			host = params.host,
			dbname = params.dbname,
			"Opened storage session."
		);

		Ok(storage)
	}

	pub fn driver(&self) -> Driver {
		match self {
			#[cfg(feature = "mysql")]
			Self::MySql(_) => Driver::MySql,
			#[cfg(feature = "postgres")]
			Self::Postgres(_) => Driver::Postgres,
		}
	}

	pub fn escape_literal(&self, text: &str) -> String {
		self.driver().escape_literal(text)
	}

	/// Rows of `table` whose `column` is one of `ids`, in whatever order the store returns them.
	pub async fn fetch_by_ids(&self, table: &str, column: &str, ids: &[u64]) -> Result<Vec<Record>> {
		self.select(table, &[WhereIn::ids(column, ids)], None).await
	}

	/// `SELECT * FROM table WHERE c1 IN (..) AND c2 IN (..) [LIMIT n]`. An empty value list
	/// matches nothing.
	pub async fn select(
		&self,
		table: &str,
		constraints: &[WhereIn],
		limit: Option<u32>,
	) -> Result<Vec<Record>> {
		match self {
			#[cfg(feature = "mysql")]
			Self::MySql(pool) => crate::mysql::select(pool, table, constraints, limit).await,
			#[cfg(feature = "postgres")]
			Self::Postgres(pool) => crate::postgres::select(pool, table, constraints, limit).await,
		}
	}

	/// Runs a statement verbatim and collects its `snippet` column in row order.
	pub async fn snippet_rows(&self, sql: &str) -> Result<Vec<String>> {
		match self {
			#[cfg(feature = "mysql")]
			Self::MySql(pool) => crate::mysql::snippet_rows(pool, sql).await,
			#[cfg(feature = "postgres")]
			Self::Postgres(pool) => crate::postgres::snippet_rows(pool, sql).await,
		}
	}
}

pub(crate) struct ConnectParams<'a> {
	pub(crate) host: &'a str,
	pub(crate) port: u16,
	pub(crate) dbname: &'a str,
	pub(crate) user: &'a str,
	pub(crate) password: &'a str,
	pub(crate) pool_max_conns: u32,
}
impl<'a> ConnectParams<'a> {
	fn from_config(cfg: &'a sift_config::Database) -> Result<Self> {
		Ok(Self {
			host: required(cfg.host.as_deref(), "host")?,
			port: cfg.port.ok_or_else(|| missing("port"))?,
			dbname: required(cfg.dbname.as_deref(), "dbname")?,
			user: required(cfg.user.as_deref(), "user")?,
			password: required(cfg.password.as_deref(), "password")?,
			pool_max_conns: cfg.pool_max_conns.max(1),
		})
	}
}

pub(crate) fn push_select<'args, DB>(
	builder: &mut QueryBuilder<'args, DB>,
	driver: Driver,
	table: &str,
	constraints: &[WhereIn],
	limit: Option<u32>,
) where
	DB: Database,
	i64: Encode<'args, DB> + Type<DB>,
	f64: Encode<'args, DB> + Type<DB>,
	bool: Encode<'args, DB> + Type<DB>,
	String: Encode<'args, DB> + Type<DB>,
{
	builder.push("SELECT * FROM ");
	builder.push(driver.quote_identifier(table));

	for (i, constraint) in constraints.iter().enumerate() {
		builder.push(if i == 0 { " WHERE " } else { " AND " });

		if constraint.values.is_empty() {
			builder.push("1 = 0");

			continue;
		}

		builder.push(driver.quote_identifier(&constraint.column));
		builder.push(" IN (");

		let mut separated = builder.separated(", ");

		for value in &constraint.values {
			match value {
				Value::Null => {
					separated.push("NULL");
				},
				Value::Bool(flag) => {
					separated.push_bind(*flag);
				},
				Value::Number(number) =>
					if let Some(int) = number.as_i64() {
						separated.push_bind(int);
					} else {
						separated.push_bind(number.as_f64().unwrap_or_default());
					},
				Value::String(text) => {
					separated.push_bind(text.clone());
				},
				other => {
					separated.push_bind(other.to_string());
				},
			}
		}

		separated.push_unseparated(")");
	}

	if let Some(limit) = limit {
		builder.push(" LIMIT ");
		builder.push_bind(i64::from(limit));
	}
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
	value.ok_or_else(|| missing(key))
}

fn missing(key: &str) -> Error {
	Error::InvalidArgument(format!("database.{key} is required."))
}
