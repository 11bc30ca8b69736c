use std::fmt;

use crate::val::{Number, Value};

/// The id component of a row key.
///
/// Ids are textual. A reference column may hold an id as a string or as an
/// integer, and both forms name the same row.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(String);

impl Id {
	pub fn new(id: impl Into<String>) -> Self {
		Id(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Reads an id from a raw column value, if the value can hold one.
	pub fn from_value(v: &Value) -> Option<Self> {
		match v {
			Value::Strand(s) => Some(Id(s.clone())),
			Value::Number(Number::Int(i)) => Some(Id(i.to_string())),
			_ => None,
		}
	}
}

impl fmt::Display for Id {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for Id {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self.0)
	}
}

impl From<&str> for Id {
	fn from(v: &str) -> Self {
		Id(v.to_owned())
	}
}

impl From<String> for Id {
	fn from(v: String) -> Self {
		Id(v)
	}
}

impl From<i64> for Id {
	fn from(v: i64) -> Self {
		Id(v.to_string())
	}
}

impl From<Id> for Value {
	fn from(v: Id) -> Self {
		Value::Strand(v.0)
	}
}

/// The key of a row: the ordered tuple `(table, id)`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
	pub tb: String,
	pub id: Id,
}

impl Key {
	pub fn new(tb: impl Into<String>, id: impl Into<Id>) -> Self {
		Key {
			tb: tb.into(),
			id: id.into(),
		}
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{:?}, {:?}]", self.tb, self.id.as_str())
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Key{self}")
	}
}
