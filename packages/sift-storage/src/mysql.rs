use serde_json::{Map, Value};
use sqlx::{
	Column, MySql, MySqlPool, QueryBuilder, Row, TypeInfo, ValueRef,
	mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow},
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339};

use crate::{Driver, Record, Result, WhereIn, db::ConnectParams};

pub(crate) async fn connect(params: &ConnectParams<'_>) -> Result<MySqlPool> {
	let options = MySqlConnectOptions::new()
		.host(params.host)
		.port(params.port)
		.database(params.dbname)
		.username(params.user)
		.password(params.password);
	let pool =
		MySqlPoolOptions::new().max_connections(params.pool_max_conns).connect_with(options).await?;

	Ok(pool)
}

pub(crate) async fn select(
	pool: &MySqlPool,
	table: &str,
	constraints: &[WhereIn],
	limit: Option<u32>,
) -> Result<Vec<Record>> {
	let mut builder = QueryBuilder::<MySql>::new("");

	crate::db::push_select(&mut builder, Driver::MySql, table, constraints, limit);

	let rows = builder.build().fetch_all(pool).await?;

	Ok(rows.iter().map(decode_row).collect())
}

pub(crate) async fn snippet_rows(pool: &MySqlPool, sql: &str) -> Result<Vec<String>> {
	let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
	let mut snippets = Vec::with_capacity(rows.len());

	for row in rows {
		snippets.push(row.try_get::<String, _>("snippet")?);
	}

	Ok(snippets)
}

fn decode_row(row: &MySqlRow) -> Record {
	let mut fields = Map::new();

	for column in row.columns() {
		let value = decode_column(row, column.ordinal(), column.type_info().name());

		fields.insert(column.name().to_string(), value);
	}

	Record::new(fields)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Value {
	match row.try_get_raw(index) {
		Ok(raw) if !raw.is_null() => {},
		_ => return Value::Null,
	}

	let decoded = match type_name {
		"BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
		name if name.ends_with("UNSIGNED") => row.try_get::<u64, _>(index).map(Value::from),
		"TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" =>
			row.try_get::<i64, _>(index).map(Value::from),
		"YEAR" => row.try_get::<u16, _>(index).map(Value::from),
		"FLOAT" => row.try_get::<f32, _>(index).map(|v| Value::from(f64::from(v))),
		// DECIMAL travels as text in both protocols.
		"DECIMAL" => row.try_get_unchecked::<String, _>(index).map(|text| decimal_value(&text)),
		"DOUBLE" => row.try_get::<f64, _>(index).map(Value::from),
		"JSON" => row.try_get::<Value, _>(index),
		"DATE" => row.try_get::<Date, _>(index).map(|v| Value::from(v.to_string())),
		"TIMESTAMP" => row
			.try_get::<OffsetDateTime, _>(index)
			.map(|v| v.format(&Rfc3339).map(Value::from).unwrap_or(Value::Null)),
		// DATETIME carries no zone; it is reported as UTC.
		"DATETIME" => row
			.try_get::<PrimitiveDateTime, _>(index)
			.map(|v| v.assume_utc().format(&Rfc3339).map(Value::from).unwrap_or(Value::Null)),
		_ => row.try_get::<String, _>(index).map(Value::from).or_else(|_| {
			row.try_get_unchecked::<Vec<u8>, _>(index).map(|bytes| match String::from_utf8(bytes) {
				Ok(text) => Value::from(text),
				Err(err) => Value::from(err.into_bytes()),
			})
		}),
	};

	decoded.unwrap_or_else(|err| {
		tracing::warn!(column = index, type_name, error = %err, "Column could not be decoded.");

		Value::Null
	})
}

/// Numeric JSON when the decimal fits an `f64` literal, the exact text otherwise.
fn decimal_value(text: &str) -> Value {
	match serde_json::from_str::<Value>(text.trim()) {
		Ok(number @ Value::Number(_)) => number,
		_ => Value::from(text),
	}
}
