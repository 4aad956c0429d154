/// Relational stores the client can materialize records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
	MySql,
	Postgres,
}
impl Driver {
	/// Parses the configured driver name. Unknown names yield `None`, not an error.
	pub fn from_name(name: &str) -> Option<Self> {
		match name.trim() {
			"mysql" => Some(Self::MySql),
			"pgsql" => Some(Self::Postgres),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::MySql => "mysql",
			Self::Postgres => "pgsql",
		}
	}

	/// Whether the native client for this driver was compiled in.
	pub fn is_available(self) -> bool {
		match self {
			Self::MySql => cfg!(feature = "mysql"),
			Self::Postgres => cfg!(feature = "postgres"),
		}
	}

	/// Escapes text for interpolation between single quotes.
	pub fn escape_literal(self, text: &str) -> String {
		let mut out = String::with_capacity(text.len() + 8);

		match self {
			Self::Postgres =>
				for ch in text.chars() {
					match ch {
						'\'' => out.push_str("''"),
						'\0' => {},
						_ => out.push(ch),
					}
				},
			Self::MySql =>
				for ch in text.chars() {
					match ch {
						'\0' => out.push_str("\\0"),
						'\n' => out.push_str("\\n"),
						'\r' => out.push_str("\\r"),
						'\\' => out.push_str("\\\\"),
						'\'' => out.push_str("\\'"),
						'"' => out.push_str("\\\""),
						'\x1a' => out.push_str("\\Z"),
						_ => out.push(ch),
					}
				},
		}

		out
	}

	/// Quotes a possibly schema-qualified identifier such as `public.products`.
	pub fn quote_identifier(self, ident: &str) -> String {
		let (open, close) = match self {
			Self::Postgres => ('"', '"'),
			Self::MySql => ('`', '`'),
		};

		ident
			.split('.')
			.map(|part| {
				let escaped = part.replace(close, &format!("{close}{close}"));

				format!("{open}{escaped}{close}")
			})
			.collect::<Vec<_>>()
			.join(".")
	}
}
