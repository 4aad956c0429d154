use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
	All,
	#[default]
	Any,
	Phrase,
	Boolean,
	Extended,
	Extended2,
	FullScan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
	#[default]
	ProximityBm25,
	Bm25,
	None,
	WordCount,
	Proximity,
	MatchAny,
	FieldMask,
	Sph04,
	Expr(String),
}
impl RankingMode {
	pub fn as_option(&self) -> String {
		match self {
			Self::ProximityBm25 => "proximity_bm25".to_string(),
			Self::Bm25 => "bm25".to_string(),
			Self::None => "none".to_string(),
			Self::WordCount => "wordcount".to_string(),
			Self::Proximity => "proximity".to_string(),
			Self::MatchAny => "matchany".to_string(),
			Self::FieldMask => "fieldmask".to_string(),
			Self::Sph04 => "sph04".to_string(),
			Self::Expr(expr) => format!("expr('{}')", crate::sphinxql::quote_literal(expr)),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
	#[default]
	Relevance,
	AttrDesc(String),
	AttrAsc(String),
	/// Last hour, day, week, month, then everything older; relevance inside each segment.
	TimeSegments(String),
	/// Raw `ORDER BY` clause, e.g. `price ASC, @weight DESC`.
	Extended(String),
	/// Arithmetic expression sorted descending.
	Expr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFunc {
	Day,
	Week,
	Month,
	Year,
	Attr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBy {
	pub attribute: String,
	pub func: GroupFunc,
	/// Group ordering; may use the `@group`, `@count`, `@weight` and `@id` magic names.
	pub sort: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterKind {
	Values(Vec<i64>),
	Range { min: i64, max: i64 },
	FloatRange { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
	pub attribute: String,
	pub kind: FilterKind,
	pub exclude: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
	pub offset: u32,
	pub limit: u32,
	pub max_matches: u32,
	pub cutoff: u32,
}
impl Limits {
	/// First `limit` matches, with the builder's conventional max-matches and cutoff.
	pub fn first(limit: u32) -> Self {
		Self { offset: 0, limit, max_matches: 1_000, cutoff: 1_000 }
	}
}
impl Default for Limits {
	fn default() -> Self {
		Self { offset: 0, limit: 20, max_matches: 1_000, cutoff: 0 }
	}
}

/// Latitude and longitude are in radians.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAnchor {
	pub lat_attr: String,
	pub long_attr: String,
	pub lat: f64,
	pub long: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQuery {
	pub text: String,
	/// Single index or a comma/space separated list.
	pub index: String,
	pub filters: Vec<Filter>,
	pub field_weights: BTreeMap<String, u32>,
	pub index_weights: BTreeMap<String, u32>,
	pub match_mode: MatchMode,
	pub ranking_mode: RankingMode,
	pub sort_mode: SortMode,
	pub group_by: Option<GroupBy>,
	pub limits: Limits,
	pub geo_anchor: Option<GeoAnchor>,
	pub select: Option<String>,
}
impl SearchQuery {
	pub fn new(index: impl Into<String>) -> Self {
		Self { index: index.into(), ..Default::default() }
	}

	/// Drops filters, ranges and the geo anchor, the way the daemon client's reset does.
	pub fn reset_filters(&mut self) {
		self.filters.clear();

		self.geo_anchor = None;
	}

	pub fn reset_group_by(&mut self) {
		self.group_by = None;
	}

	pub fn index_names(&self) -> Vec<&str> {
		split_index_names(&self.index)
	}
}

pub fn split_index_names(index: &str) -> Vec<&str> {
	index.split([',', ' ']).map(str::trim).filter(|name| !name.is_empty()).collect()
}

pub fn is_multi_index(index: &str) -> bool {
	index.contains(',') || index.contains(' ')
}

/// Highlighting options; unset fields fall back to the daemon's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExcerptOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub before_match: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub after_match: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chunk_separator: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub around: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exact_phrase: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub html_strip_mode: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit_passages: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limit_words: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub allow_empty: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_mode: Option<bool>,
}
