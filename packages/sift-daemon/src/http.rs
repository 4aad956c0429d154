use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
	BoxFuture, ExcerptOptions, Match, Result, SearchDaemon, SearchQuery, SearchResponse,
	error::Error, sphinxql,
};

/// Talks SphinxQL to the daemon's HTTP endpoint (`/sql?mode=raw`).
pub struct HttpDaemon {
	client: Client,
	endpoint: String,
}
impl HttpDaemon {
	pub fn new(cfg: &sift_config::Daemon) -> Result<Self> {
		let client = Client::builder().connect_timeout(Duration::from_secs(cfg.timeout)).build()?;

		Ok(Self { client, endpoint: format!("http://{}:{}/sql?mode=raw", cfg.host, cfg.port) })
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	async fn execute(&self, sql: &str) -> Result<Vec<ResultSet>> {
		tracing::debug!(endpoint = %self.endpoint, sql = %sql, "Sending SphinxQL statement.");

		let res = self.client.post(&self.endpoint).form(&[("query", sql)]).send().await?;
		let status = res.status();
		let json: Value = res.json().await?;

		if !status.is_success()
			&& json.get("error").and_then(Value::as_str).map(str::is_empty).unwrap_or(true)
		{
			return Err(Error::InvalidResponse {
				message: format!("Search daemon responded with status {status}."),
			});
		}

		parse_result_sets(json)
	}

	async fn run_query(&self, query: &SearchQuery) -> Result<SearchResponse> {
		let sql = format!("{}; SHOW META", sphinxql::render_select(query));
		let sets = self.execute(&sql).await?;

		search_response(sets)
	}

	async fn run_excerpts(
		&self,
		docs: &[String],
		index: &str,
		words: &str,
		opts: &ExcerptOptions,
	) -> Result<Vec<String>> {
		let sql = sphinxql::render_call_snippets(docs, index, words, opts)?;
		let sets = self.execute(&sql).await?;

		Ok(sets
			.into_iter()
			.next()
			.map(|set| {
				set.data
					.into_iter()
					.filter_map(|mut row| match row.remove("snippet") {
						Some(Value::String(snippet)) => Some(snippet),
						_ => None,
					})
					.collect()
			})
			.unwrap_or_default())
	}
}
impl SearchDaemon for HttpDaemon {
	fn query<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<SearchResponse>> {
		Box::pin(self.run_query(query))
	}

	fn build_excerpts<'a>(
		&'a self,
		docs: &'a [String],
		index: &'a str,
		words: &'a str,
		opts: &'a ExcerptOptions,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(self.run_excerpts(docs, index, words, opts))
	}
}

#[derive(Debug, Default, Deserialize)]
struct ResultSet {
	#[serde(default)]
	data: Vec<Map<String, Value>>,
	#[serde(default)]
	total: Option<u64>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	warning: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResponse {
	Many(Vec<ResultSet>),
	One(ResultSet),
}

fn parse_result_sets(json: Value) -> Result<Vec<ResultSet>> {
	let sets = match serde_json::from_value::<RawResponse>(json)? {
		RawResponse::Many(sets) => sets,
		RawResponse::One(set) => vec![set],
	};

	if let Some(message) =
		sets.iter().filter_map(|set| set.error.as_deref()).find(|message| !message.is_empty())
	{
		return Err(Error::Daemon { message: message.to_string() });
	}

	Ok(sets)
}

fn search_response(sets: Vec<ResultSet>) -> Result<SearchResponse> {
	let mut sets = sets.into_iter();
	let Some(rows) = sets.next() else {
		return Err(Error::InvalidResponse {
			message: "Search daemon returned no result set.".to_string(),
		});
	};
	let mut matches = Vec::with_capacity(rows.data.len());

	for mut row in rows.data {
		let id = row.remove("id").as_ref().and_then(value_as_u64).ok_or_else(|| {
			Error::InvalidResponse { message: "Match row is missing a numeric id.".to_string() }
		})?;
		let weight = row.remove("weight").as_ref().and_then(value_as_f64).unwrap_or(0.0);

		matches.push(Match { id, weight, attrs: row });
	}

	let mut response = SearchResponse {
		total: rows.total.unwrap_or(matches.len() as u64),
		total_found: matches.len() as u64,
		time: 0.0,
		matches,
		warning: rows.warning.filter(|warning| !warning.is_empty()),
	};

	if let Some(meta) = sets.next() {
		for row in meta.data {
			let name = row.get("Variable_name").and_then(Value::as_str).unwrap_or_default();
			let Some(value) = row.get("Value") else {
				continue;
			};

			match name {
				"total" => response.total = value_as_u64(value).unwrap_or(response.total),
				"total_found" =>
					response.total_found = value_as_u64(value).unwrap_or(response.total_found),
				"time" => response.time = value_as_f64(value).unwrap_or(0.0),
				"warning" =>
					if let Some(warning) = value.as_str().filter(|warning| !warning.is_empty()) {
						response.warning = Some(warning.to_string());
					},
				_ => {},
			}
		}
	}

	Ok(response)
}

fn value_as_u64(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn value_as_f64(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_matches_and_meta() {
		let json = serde_json::json!([
			{
				"columns": [{ "id": { "type": "long long" } }, { "weight": { "type": "long" } }],
				"data": [
					{ "id": 5, "weight": 2500, "brand_id": 3 },
					{ "id": 2, "weight": 1500, "brand_id": 4 },
					{ "id": "9", "weight": 1000, "brand_id": 4 }
				],
				"total": 3,
				"error": "",
				"warning": ""
			},
			{
				"data": [
					{ "Variable_name": "total", "Value": "3" },
					{ "Variable_name": "total_found", "Value": "41" },
					{ "Variable_name": "time", "Value": "0.004" }
				],
				"total": 3,
				"error": "",
				"warning": ""
			}
		]);
		let sets = parse_result_sets(json).expect("parse failed");
		let response = search_response(sets).expect("response failed");

		assert_eq!(response.ids(), vec![5, 2, 9]);
		assert_eq!(response.total, 3);
		assert_eq!(response.total_found, 41);
		assert!((response.time - 0.004).abs() < f64::EPSILON);
		assert_eq!(response.matches[0].attrs.get("brand_id"), Some(&serde_json::json!(3)));
		assert!(response.warning.is_none());
	}

	#[test]
	fn reports_daemon_errors() {
		let json = serde_json::json!([{ "data": [], "error": "unknown index 'nope'" }]);
		let err = parse_result_sets(json).err().expect("Expected daemon error.");

		assert!(matches!(err, Error::Daemon { ref message } if message == "unknown index 'nope'"));

		let json = serde_json::json!({ "error": "syntax error" });

		assert!(matches!(parse_result_sets(json), Err(Error::Daemon { .. })));
	}

	#[test]
	fn missing_meta_falls_back_to_page_counts() {
		let json = serde_json::json!([{ "data": [{ "id": 1, "weight": 1 }], "total": 1 }]);
		let response = search_response(parse_result_sets(json).expect("parse failed"))
			.expect("response failed");

		assert_eq!(response.total_found, 1);
		assert_eq!(response.time, 0.0);
	}

	#[test]
	fn endpoint_uses_configured_host_and_port() {
		let cfg = sift_config::Daemon { host: "search.local".to_string(), port: 9400, timeout: 3 };
		let daemon = HttpDaemon::new(&cfg).expect("client failed");

		assert_eq!(daemon.endpoint(), "http://search.local:9400/sql?mode=raw");
	}
}
