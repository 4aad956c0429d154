use serde::Serialize;

use sift_daemon::{Match, SearchResponse};
use sift_storage::Record;

/// Daemon statistics and the raw matches of the last successful search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEnvelope {
	pub total_found: u64,
	pub elapsed_secs: f64,
	pub matches: Vec<Match>,
	pub warning: Option<String>,
}
impl SearchEnvelope {
	pub fn ids(&self) -> Vec<u64> {
		self.matches.iter().map(|m| m.id).collect()
	}

	pub fn weight(&self, id: u64) -> Option<f64> {
		self.matches.iter().find(|m| m.id == id).map(|m| m.weight)
	}
}
impl From<SearchResponse> for SearchEnvelope {
	fn from(response: SearchResponse) -> Self {
		Self {
			total_found: response.total_found,
			elapsed_secs: response.time,
			matches: response.matches,
			warning: response.warning,
		}
	}
}

/// Result of `get()`. A daemon failure is reported here rather than as an `Err`, with no
/// records and no envelope.
#[derive(Debug)]
pub struct SearchOutcome {
	pub records: Vec<Record>,
	pub envelope: Option<SearchEnvelope>,
	pub error: Option<sift_daemon::Error>,
}
impl SearchOutcome {
	pub(crate) fn failed(error: sift_daemon::Error) -> Self {
		Self { records: Vec::new(), envelope: None, error: Some(error) }
	}

	pub fn is_failure(&self) -> bool {
		self.error.is_some()
	}

	pub fn total_found(&self) -> u64 {
		self.envelope.as_ref().map(|envelope| envelope.total_found).unwrap_or_default()
	}

	pub fn into_records(self) -> Vec<Record> {
		self.records
	}
}
