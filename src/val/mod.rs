//! Raw values stored in row columns.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
	Int(i64),
	Float(f64),
}

impl fmt::Display for Number {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Number::Int(v) => write!(f, "{v}"),
			Number::Float(v) => write!(f, "{v}"),
		}
	}
}

/// An ordered mapping from column name to raw value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object(pub BTreeMap<String, Value>);

impl Deref for Object {
	type Target = BTreeMap<String, Value>;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Object {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl From<BTreeMap<String, Value>> for Object {
	fn from(v: BTreeMap<String, Value>) -> Self {
		Self(v)
	}
}

impl<K, V> FromIterator<(K, V)> for Object
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl IntoIterator for Object {
	type Item = (String, Value);
	type IntoIter = std::collections::btree_map::IntoIter<String, Value>;
	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

/// The value of a row
pub type Row = Object;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
	/// The column is absent
	#[default]
	None,
	Null,
	Bool(bool),
	Number(Number),
	Strand(String),
	Array(Vec<Value>),
	Object(Object),
}

impl Value {
	/// Check if this value is absent or null
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::None | Value::Null)
	}

	pub fn kind_name(&self) -> &'static str {
		match self {
			Value::None => "none",
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(Number::Int(_)) => "int",
			Value::Number(Number::Float(_)) => "float",
			Value::Strand(_) => "string",
			Value::Array(_) => "array",
			Value::Object(_) => "object",
		}
	}

	pub fn into_json(self) -> serde_json::Value {
		match self {
			Value::None | Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(b),
			Value::Number(Number::Int(i)) => serde_json::Value::from(i),
			Value::Number(Number::Float(f)) => serde_json::Number::from_f64(f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::Strand(s) => serde_json::Value::String(s),
			Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Value::into_json).collect()),
			Value::Object(o) => {
				serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into_json())).collect())
			}
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::None => f.write_str("NONE"),
			Value::Null => f.write_str("NULL"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => write!(f, "{n}"),
			Value::Strand(s) => write!(f, "'{s}'"),
			v => write!(f, "{}", v.clone().into_json()),
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(v: serde_json::Value) -> Self {
		match v {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Value::Number(Number::Int(i)),
				None => Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN))),
			},
			serde_json::Value::String(s) => Value::Strand(s),
			serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
			serde_json::Value::Object(o) => Value::Object(o.into_iter().collect()),
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Number(Number::Int(v))
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Number(Number::Float(v))
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Strand(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Strand(v)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(v: Vec<T>) -> Self {
		Value::Array(v.into_iter().map(Into::into).collect())
	}
}

impl From<Object> for Value {
	fn from(v: Object) -> Self {
		Value::Object(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Value::None)
	}
}
