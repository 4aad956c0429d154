use std::{
	fmt::{Debug, Formatter},
	sync::{Arc, LazyLock},
};

use regex::Regex;
use serde_json::Value;

use sift_daemon::SearchQuery;
use sift_storage::WhereIn;

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?")
		.expect("Numeric prefix pattern must compile.")
});

pub type RelationScope = Arc<dyn Fn(&mut RelationQuery) + Send + Sync>;

/// Everything the builder accumulates between searches.
#[derive(Debug, Clone)]
pub struct QueryState {
	pub(crate) query: SearchQuery,
	pub(crate) eager_loads: Vec<EagerLoad>,
	pub(crate) where_in: Vec<WhereIn>,
	pub(crate) mapping_override_expected: bool,
}
impl QueryState {
	pub(crate) fn new(index: impl Into<String>) -> Self {
		Self {
			query: SearchQuery::new(index),
			eager_loads: Vec::new(),
			where_in: Vec::new(),
			mapping_override_expected: false,
		}
	}

	pub fn query(&self) -> &SearchQuery {
		&self.query
	}

	pub fn index(&self) -> &str {
		&self.query.index
	}

	pub fn text(&self) -> &str {
		&self.query.text
	}

	pub fn eager_loads(&self) -> &[EagerLoad] {
		&self.eager_loads
	}

	pub fn where_in(&self) -> &[WhereIn] {
		&self.where_in
	}

	/// Set when the active index lists several indexes, so records must come from `[mapping]`.
	pub fn mapping_override_expected(&self) -> bool {
		self.mapping_override_expected
	}

	/// Replaces an existing constraint on the same column, keeping first-set order.
	pub(crate) fn set_where_in(&mut self, constraint: WhereIn) {
		match self.where_in.iter_mut().find(|existing| existing.column == constraint.column) {
			Some(existing) => *existing = constraint,
			None => self.where_in.push(constraint),
		}
	}
}

/// A relation to load with the records, optionally narrowed by a scope closure.
#[derive(Clone)]
pub enum EagerLoad {
	Relation(String),
	Scoped { relation: String, scope: RelationScope },
}
impl EagerLoad {
	pub fn scoped<F>(relation: impl Into<String>, scope: F) -> Self
	where
		F: Fn(&mut RelationQuery) + Send + Sync + 'static,
	{
		Self::Scoped { relation: relation.into(), scope: Arc::new(scope) }
	}

	pub fn relation(&self) -> &str {
		match self {
			Self::Relation(relation) | Self::Scoped { relation, .. } => relation,
		}
	}

	pub fn apply_scope(&self, query: &mut RelationQuery) {
		if let Self::Scoped { scope, .. } = self {
			scope(query);
		}
	}
}
impl Debug for EagerLoad {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Relation(relation) => f.debug_tuple("Relation").field(relation).finish(),
			Self::Scoped { relation, .. } =>
				f.debug_struct("Scoped").field("relation", relation).finish_non_exhaustive(),
		}
	}
}
impl From<&str> for EagerLoad {
	fn from(relation: &str) -> Self {
		Self::Relation(relation.to_string())
	}
}
impl From<String> for EagerLoad {
	fn from(relation: String) -> Self {
		Self::Relation(relation)
	}
}
impl<S, F> From<(S, F)> for EagerLoad
where
	S: Into<String>,
	F: Fn(&mut RelationQuery) + Send + Sync + 'static,
{
	fn from((relation, scope): (S, F)) -> Self {
		Self::scoped(relation, scope)
	}
}

/// Constraints a scope closure may put on a related fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationQuery {
	pub where_in: Vec<WhereIn>,
	pub limit: Option<u32>,
}
impl RelationQuery {
	pub fn where_in<I, V>(&mut self, column: impl Into<String>, values: I) -> &mut Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		self.where_in.push(WhereIn::new(column, values));

		self
	}

	pub fn limit(&mut self, limit: u32) -> &mut Self {
		self.limit = Some(limit);

		self
	}
}

/// A scalar accepted as an integer filter value.
pub trait FilterValue {
	fn to_filter_int(&self) -> i64;
}
macro_rules! impl_filter_value_for_int {
	($($ty:ty),*) => {
		$(
			impl FilterValue for $ty {
				fn to_filter_int(&self) -> i64 {
					i64::try_from(*self).unwrap_or(i64::MAX)
				}
			}
		)*
	};
}
impl_filter_value_for_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);
impl FilterValue for f32 {
	fn to_filter_int(&self) -> i64 {
		*self as i64
	}
}
impl FilterValue for f64 {
	fn to_filter_int(&self) -> i64 {
		*self as i64
	}
}
impl FilterValue for bool {
	fn to_filter_int(&self) -> i64 {
		i64::from(*self)
	}
}
impl FilterValue for str {
	fn to_filter_int(&self) -> i64 {
		coerce_int(self)
	}
}
impl FilterValue for String {
	fn to_filter_int(&self) -> i64 {
		coerce_int(self)
	}
}
impl<T> FilterValue for &T
where
	T: FilterValue + ?Sized,
{
	fn to_filter_int(&self) -> i64 {
		(**self).to_filter_int()
	}
}

/// A single value or a collection of them, flattened into the daemon's integer list.
pub trait FilterValues {
	fn into_filter_values(self) -> Vec<i64>;
}
macro_rules! impl_filter_values_for_scalar {
	($($ty:ty),*) => {
		$(
			impl FilterValues for $ty {
				fn into_filter_values(self) -> Vec<i64> {
					vec![self.to_filter_int()]
				}
			}
		)*
	};
}
impl_filter_values_for_scalar!(
	i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, bool, String, &str
);
impl<T> FilterValues for Vec<T>
where
	T: FilterValue,
{
	fn into_filter_values(self) -> Vec<i64> {
		self.iter().map(FilterValue::to_filter_int).collect()
	}
}
impl<T> FilterValues for &[T]
where
	T: FilterValue,
{
	fn into_filter_values(self) -> Vec<i64> {
		self.iter().map(FilterValue::to_filter_int).collect()
	}
}
impl<T, const N: usize> FilterValues for [T; N]
where
	T: FilterValue,
{
	fn into_filter_values(self) -> Vec<i64> {
		self.iter().map(FilterValue::to_filter_int).collect()
	}
}

/// Leading numeric prefix of `text` as an integer: `"12abc"` is 12, `"abc"` is 0, `"1e3"` is
/// 1000. Fractions truncate toward zero.
pub fn coerce_int(text: &str) -> i64 {
	let Some(prefix) = NUMERIC_PREFIX.find(text) else {
		return 0;
	};
	let prefix = prefix.as_str().trim_start();

	if let Ok(value) = prefix.parse::<i64>() {
		return value;
	}

	prefix.parse::<f64>().map(|value| value as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strings_coerce_by_numeric_prefix() {
		assert_eq!(coerce_int("12abc"), 12);
		assert_eq!(coerce_int("abc"), 0);
		assert_eq!(coerce_int("1e3"), 1_000);
		assert_eq!(coerce_int("  -7"), -7);
		assert_eq!(coerce_int("3.9 apples"), 3);
		assert_eq!(coerce_int(".5"), 0);
		assert_eq!(coerce_int(""), 0);
	}

	#[test]
	fn scalars_and_collections_flatten_to_integers() {
		assert_eq!(3_u8.into_filter_values(), vec![3]);
		assert_eq!(2.7_f64.into_filter_values(), vec![2]);
		assert_eq!(true.into_filter_values(), vec![1]);
		assert_eq!("42".into_filter_values(), vec![42]);
		assert_eq!(vec!["12abc", "abc"].into_filter_values(), vec![12, 0]);
		assert_eq!([5_u64, 9].into_filter_values(), vec![5, 9]);
		assert_eq!(u64::MAX.into_filter_values(), vec![i64::MAX]);
	}

	#[test]
	fn where_in_replaces_by_column() {
		let mut state = QueryState::new("products");

		state.set_where_in(WhereIn::new("status", ["live"]));
		state.set_where_in(WhereIn::new("brand_id", [3]));
		state.set_where_in(WhereIn::new("status", ["draft", "live"]));

		assert_eq!(state.where_in().len(), 2);
		assert_eq!(state.where_in()[0].column, "status");
		assert_eq!(state.where_in()[0].values.len(), 2);
	}

	#[test]
	fn scoped_eager_load_applies_its_closure() {
		let load = EagerLoad::from(("reviews", |q: &mut RelationQuery| {
			q.limit(3);
		}));
		let mut query = RelationQuery::default();

		load.apply_scope(&mut query);

		assert_eq!(load.relation(), "reviews");
		assert_eq!(query.limit, Some(3));
	}
}
