use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A materialized entity. Only its key column is inspected by the client; everything else is
/// passed through to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
	fields: Map<String, Value>,
}
impl Record {
	pub fn new(fields: Map<String, Value>) -> Self {
		Self { fields }
	}

	pub fn from_serialize<T>(value: &T) -> Result<Self>
	where
		T: Serialize,
	{
		match serde_json::to_value(value)? {
			Value::Object(fields) => Ok(Self { fields }),
			_ => Err(Error::InvalidArgument("Records must serialize to an object.".to_string())),
		}
	}

	pub fn get(&self, column: &str) -> Option<&Value> {
		self.fields.get(column)
	}

	pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
		self.fields.insert(column.into(), value)
	}

	/// Reads `column` as a document id. Numeric strings are accepted.
	pub fn key(&self, column: &str) -> Option<u64> {
		match self.fields.get(column)? {
			Value::Number(number) => number
				.as_u64()
				.or_else(|| number.as_f64().filter(|v| *v >= 0.0 && v.fract() == 0.0).map(|v| v as u64)),
			Value::String(text) => text.trim().parse().ok(),
			_ => None,
		}
	}

	pub fn fields(&self) -> &Map<String, Value> {
		&self.fields
	}

	pub fn into_fields(self) -> Map<String, Value> {
		self.fields
	}

	pub fn deserialize<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		Ok(serde_json::from_value(Value::Object(self.fields))?)
	}
}
impl From<Map<String, Value>> for Record {
	fn from(fields: Map<String, Value>) -> Self {
		Self { fields }
	}
}
