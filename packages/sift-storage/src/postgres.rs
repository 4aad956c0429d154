use serde_json::Value;
use sqlx::{
	PgPool, Postgres, QueryBuilder, Row,
	postgres::{PgConnectOptions, PgPoolOptions, PgRow},
};

use crate::{Driver, Error, Record, Result, WhereIn, db::ConnectParams};

pub(crate) async fn connect(params: &ConnectParams<'_>) -> Result<PgPool> {
	let options = PgConnectOptions::new()
		.host(params.host)
		.port(params.port)
		.database(params.dbname)
		.username(params.user)
		.password(params.password);
	let pool =
		PgPoolOptions::new().max_connections(params.pool_max_conns).connect_with(options).await?;

	Ok(pool)
}

pub(crate) async fn select(
	pool: &PgPool,
	table: &str,
	constraints: &[WhereIn],
	limit: Option<u32>,
) -> Result<Vec<Record>> {
	let rows = json_select(table, constraints, limit).build().fetch_all(pool).await?;

	rows.iter().map(decode_row).collect()
}

pub(crate) async fn snippet_rows(pool: &PgPool, sql: &str) -> Result<Vec<String>> {
	let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
	let mut snippets = Vec::with_capacity(rows.len());

	for row in rows {
		snippets.push(row.try_get::<String, _>("snippet")?);
	}

	Ok(snippets)
}

/// Lets the server render each row with `to_jsonb`, so every column type (numerics, arrays,
/// ranges, domains) arrives as its canonical JSON value.
fn json_select<'args>(
	table: &str,
	constraints: &[WhereIn],
	limit: Option<u32>,
) -> QueryBuilder<'args, Postgres> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT to_jsonb(t) AS record FROM (");

	crate::db::push_select(&mut builder, Driver::Postgres, table, constraints, limit);
	builder.push(") AS t");

	builder
}

fn decode_row(row: &PgRow) -> Result<Record> {
	match row.try_get::<Value, _>("record")? {
		Value::Object(fields) => Ok(Record::new(fields)),
		other => Err(Error::InvalidArgument(format!("Expected a JSON object per row, got {other}."))),
	}
}
