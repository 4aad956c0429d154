//! SphinxQL rendering for [`SearchQuery`].
//!
//! SphinxQL has no notion of the legacy match modes, so they are emulated by rewriting the
//! full-text query before it is placed inside `MATCH()`.

use serde_json::Value;

use crate::{
	ExcerptOptions, Result,
	error::Error,
	query::{Filter, FilterKind, GroupBy, GroupFunc, MatchMode, SearchQuery, SortMode},
};

const QUERY_SPECIAL_CHARS: [char; 15] =
	['\\', '(', ')', '|', '-', '!', '@', '~', '"', '&', '/', '^', '$', '=', '<'];
const MAGIC_NAMES: [(&str, &str); 7] = [
	("@relevance", "weight()"),
	("@weight", "weight()"),
	("@rank", "weight()"),
	("@group", "groupby()"),
	("@count", "count(*)"),
	("@geodist", "geodist"),
	("@id", "id"),
];

/// Escapes full-text query operators so the text is matched literally.
pub fn escape_query(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for ch in text.chars() {
		if QUERY_SPECIAL_CHARS.contains(&ch) {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

/// Escapes a value for use inside a single-quoted SphinxQL string literal.
pub fn quote_literal(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for ch in text.chars() {
		if matches!(ch, '\\' | '\'') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

pub fn render_select(query: &SearchQuery) -> String {
	let (sort_clause, sort_column) = sort_clause(&query.sort_mode);
	let mut columns = vec![
		query.select.clone().unwrap_or_else(|| "*".to_string()),
		"WEIGHT() AS weight".to_string(),
	];

	if let Some(anchor) = query.geo_anchor.as_ref() {
		columns.push(format!(
			"GEODIST({}, {}, {:?}, {:?}, {{in=rad, out=m}}) AS geodist",
			anchor.lat_attr, anchor.long_attr, anchor.lat, anchor.long
		));
	}
	if let Some(column) = sort_column {
		columns.push(column);
	}

	let grouping = query.group_by.as_ref().map(|group| group_key(group, &mut columns));
	let mut sql = format!("SELECT {} FROM {}", columns.join(", "), query.index_names().join(", "));
	let mut conditions = Vec::new();

	if let Some(text) = match_expression(query) {
		conditions.push(format!("MATCH('{}')", quote_literal(&text)));
	}

	conditions.extend(query.filters.iter().filter_map(filter_condition));

	if !conditions.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&conditions.join(" AND "));
	}

	match (query.group_by.as_ref(), grouping) {
		(Some(group), Some(key)) => {
			sql.push_str(&format!(" GROUP BY {key}"));
			sql.push_str(&format!(" WITHIN GROUP ORDER BY {sort_clause}"));
			sql.push_str(&format!(" ORDER BY {}", translate_magic(&group.sort)));
		},
		_ => sql.push_str(&format!(" ORDER BY {sort_clause}")),
	}

	sql.push_str(&format!(" LIMIT {}, {}", query.limits.offset, query.limits.limit));

	let mut options = vec![
		format!("ranker={}", query.ranking_mode.as_option()),
		format!("max_matches={}", query.limits.max_matches),
	];

	if query.limits.cutoff > 0 {
		options.push(format!("cutoff={}", query.limits.cutoff));
	}
	if !query.field_weights.is_empty() {
		options.push(format!("field_weights=({})", weight_list(&query.field_weights)));
	}
	if !query.index_weights.is_empty() {
		options.push(format!("index_weights=({})", weight_list(&query.index_weights)));
	}

	sql.push_str(" OPTION ");
	sql.push_str(&options.join(", "));

	sql
}

/// Renders `CALL SNIPPETS` with every document, the index and the words quoted.
pub fn render_call_snippets(
	docs: &[String],
	index: &str,
	words: &str,
	opts: &ExcerptOptions,
) -> Result<String> {
	let docs = docs.iter().map(|doc| format!("'{}'", quote_literal(doc))).collect::<Vec<_>>();
	let mut sql = format!(
		"CALL SNIPPETS(({}), '{}', '{}'",
		docs.join(", "),
		quote_literal(index),
		quote_literal(words)
	);
	let Value::Object(options) = serde_json::to_value(opts)? else {
		return Err(Error::InvalidResponse {
			message: "Excerpt options must serialize to an object.".to_string(),
		});
	};
	let mut options = options.into_iter().collect::<Vec<_>>();

	options.sort_by(|a, b| a.0.cmp(&b.0));

	for (key, value) in options {
		let rendered = match value {
			Value::String(text) => format!("'{}'", quote_literal(&text)),
			Value::Bool(flag) => u8::from(flag).to_string(),
			other => other.to_string(),
		};

		sql.push_str(&format!(", {rendered} AS {key}"));
	}

	sql.push(')');

	Ok(sql)
}

fn match_expression(query: &SearchQuery) -> Option<String> {
	let text = query.text.trim();

	if text.is_empty() {
		return None;
	}

	let escaped_terms = || text.split_whitespace().map(escape_query).collect::<Vec<_>>();

	match query.match_mode {
		MatchMode::Any => Some(escaped_terms().join(" | ")),
		MatchMode::All => Some(escaped_terms().join(" ")),
		MatchMode::Phrase => Some(format!("\"{}\"", escaped_terms().join(" "))),
		MatchMode::Boolean | MatchMode::Extended | MatchMode::Extended2 => Some(text.to_string()),
		MatchMode::FullScan => None,
	}
}

fn filter_condition(filter: &Filter) -> Option<String> {
	let attr = filter.attribute.as_str();

	match &filter.kind {
		FilterKind::Values(values) => {
			if values.is_empty() {
				return None;
			}

			let list = values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
			let op = if filter.exclude { "NOT IN" } else { "IN" };

			Some(format!("{attr} {op} ({list})"))
		},
		FilterKind::Range { min, max } => Some(range_condition(attr, min, max, filter.exclude)),
		FilterKind::FloatRange { min, max } =>
			Some(range_condition(attr, &format!("{min:?}"), &format!("{max:?}"), filter.exclude)),
	}
}

fn range_condition(
	attr: &str,
	min: &impl std::fmt::Display,
	max: &impl std::fmt::Display,
	exclude: bool,
) -> String {
	if exclude {
		format!("({attr} < {min} OR {attr} > {max})")
	} else {
		format!("{attr} BETWEEN {min} AND {max}")
	}
}

fn sort_clause(mode: &SortMode) -> (String, Option<String>) {
	match mode {
		SortMode::Relevance => ("weight() DESC, id ASC".to_string(), None),
		SortMode::AttrDesc(attr) => (format!("{attr} DESC"), None),
		SortMode::AttrAsc(attr) => (format!("{attr} ASC"), None),
		SortMode::TimeSegments(attr) => (
			"time_segment DESC, weight() DESC".to_string(),
			Some(format!(
				"INTERVAL({attr}, NOW()-7776000, NOW()-2592000, NOW()-604800, NOW()-86400, NOW()-3600) AS time_segment"
			)),
		),
		SortMode::Extended(clause) => (translate_magic(clause), None),
		SortMode::Expr(expr) =>
			("sort_expr DESC".to_string(), Some(format!("{} AS sort_expr", translate_magic(expr)))),
	}
}

fn group_key(group: &GroupBy, columns: &mut Vec<String>) -> String {
	let func = match group.func {
		GroupFunc::Attr => return group.attribute.clone(),
		GroupFunc::Day => "YEARMONTHDAY",
		GroupFunc::Week => "YEARWEEK",
		GroupFunc::Month => "YEARMONTH",
		GroupFunc::Year => "YEAR",
	};

	columns.push(format!("{func}({}) AS group_key", group.attribute));

	"group_key".to_string()
}

fn translate_magic(clause: &str) -> String {
	MAGIC_NAMES.iter().fold(clause.to_string(), |acc, (magic, name)| acc.replace(magic, name))
}

fn weight_list(weights: &std::collections::BTreeMap<String, u32>) -> String {
	weights.iter().map(|(name, weight)| format!("{name}={weight}")).collect::<Vec<_>>().join(", ")
}
