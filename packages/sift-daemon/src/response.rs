use serde::Serialize;
use serde_json::{Map, Value};

/// One matched document, in the order the daemon ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
	pub id: u64,
	pub weight: f64,
	pub attrs: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
	/// Matches returned in this page.
	pub total: u64,
	/// Matches found overall, bounded by `max_matches`.
	pub total_found: u64,
	/// Seconds spent by the daemon.
	pub time: f64,
	pub matches: Vec<Match>,
	pub warning: Option<String>,
}
impl SearchResponse {
	pub fn ids(&self) -> Vec<u64> {
		self.matches.iter().map(|m| m.id).collect()
	}
}
