use std::sync::LazyLock;

use regex::Regex;

use sift_daemon::ExcerptOptions;
use sift_storage::Driver;

use crate::{Error, Result, SearchClient};

static TAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Tag pattern must compile."));

impl SearchClient {
	/// Highlights one document against the current search text and index.
	pub async fn excerpt(
		&self,
		content: impl Into<String>,
		opts: &ExcerptOptions,
	) -> sift_daemon::Result<Vec<String>> {
		self.excerpts(&[content.into()], opts).await
	}

	/// Highlights several documents in one daemon call; the result keeps input order.
	pub async fn excerpts(
		&self,
		contents: &[String],
		opts: &ExcerptOptions,
	) -> sift_daemon::Result<Vec<String>> {
		let query = self.state().query();

		self.daemon().build_excerpts(contents, &query.index, &query.text, opts).await
	}

	/// Builds snippets through the storage session's SphinxQL link. Tags are stripped from the
	/// documents and every literal is escaped for the session's driver. `extra` pairs are
	/// rendered as `value AS option` and passed through unescaped.
	pub async fn snippets_ql<S>(
		&self,
		docs: &[S],
		index: &str,
		query: &str,
		extra: &[(&str, &str)],
	) -> Result<Vec<String>>
	where
		S: AsRef<str>,
	{
		let storage = self.storage().ok_or(Error::NoStorageSession)?;
		let sql = render_snippets_call(storage.driver(), docs, index, query, extra);

		tracing::debug!(index, docs = docs.len(), "Requesting snippets over the storage session.");

		Ok(storage.snippet_rows(&sql).await?)
	}
}

/// `CALL SNIPPETS(('doc', ...), 'index', 'query'[, value AS option ...])`.
pub fn render_snippets_call<S>(
	driver: Driver,
	docs: &[S],
	index: &str,
	query: &str,
	extra: &[(&str, &str)],
) -> String
where
	S: AsRef<str>,
{
	let docs = docs
		.iter()
		.map(|doc| format!("'{}'", driver.escape_literal(&strip_tags(doc.as_ref()))))
		.collect::<Vec<_>>();
	let mut sql = format!(
		"CALL SNIPPETS(({}), '{}', '{}'",
		docs.join(", "),
		driver.escape_literal(index),
		driver.escape_literal(query)
	);

	for (option, value) in extra {
		sql.push_str(&format!(", {value} AS {option}"));
	}

	sql.push(')');

	sql
}

pub fn strip_tags(text: &str) -> String {
	TAG.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tags_are_stripped() {
		assert_eq!(strip_tags("<b>hi</b> <a href=\"x\">there</a>"), "hi there");
		assert_eq!(strip_tags("no tags"), "no tags");
	}

	#[test]
	fn postgres_call_escapes_every_literal() {
		let sql = render_snippets_call(
			Driver::Postgres,
			&["<b>hi</b>", "it's"],
			"idx",
			"q's",
			&[("limit", "60")],
		);

		assert_eq!(sql, "CALL SNIPPETS(('hi', 'it''s'), 'idx', 'q''s', 60 AS limit)");
	}

	#[test]
	fn mysql_call_uses_backslash_escapes() {
		let sql = render_snippets_call(Driver::MySql, &["a\\b"], "i'dx", "q's", &[]);

		assert_eq!(sql, r"CALL SNIPPETS(('a\\b'), 'i\'dx', 'q\'s')");
	}
}
