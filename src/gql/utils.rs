use async_graphql::dynamic::FieldValue;
use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::{Name, Value as GqlValue};
use serde_json::Number as JsonNumber;

use super::error::{GqlError, resolver_error};
use crate::cnf::{ENTRY_VALUE_FIELD, ID_COLUMN, VERSIONSTAMP_FIELD};
use crate::kvs::{Entry, Id};
use crate::val::{Number, Object, Row, Value};

pub(crate) trait GqlValueUtils {
	fn as_i64(&self) -> Option<i64>;
	fn as_string(&self) -> Option<String>;
	fn as_list(&self) -> Option<&Vec<GqlValue>>;
	fn as_object(&self) -> Option<&IndexMap<Name, GqlValue>>;
	/// Reads an `ID` input, which may be written as a string or an integer
	fn as_id(&self) -> Option<Id>;
}

impl GqlValueUtils for GqlValue {
	fn as_i64(&self) -> Option<i64> {
		if let GqlValue::Number(n) = self {
			n.as_i64()
		} else {
			None
		}
	}

	fn as_string(&self) -> Option<String> {
		if let GqlValue::String(s) = self {
			Some(s.to_owned())
		} else {
			None
		}
	}

	fn as_list(&self) -> Option<&Vec<GqlValue>> {
		if let GqlValue::List(a) = self {
			Some(a)
		} else {
			None
		}
	}

	fn as_object(&self) -> Option<&IndexMap<Name, GqlValue>> {
		if let GqlValue::Object(o) = self {
			Some(o)
		} else {
			None
		}
	}

	fn as_id(&self) -> Option<Id> {
		match self {
			GqlValue::String(s) => Some(Id::from(s.as_str())),
			v => v.as_i64().map(Id::from),
		}
	}
}

/// The parent value handed to the field resolvers of an object type.
pub(crate) type ErasedRow = Row;

pub(crate) fn field_val_erase_owned(row: ErasedRow) -> FieldValue<'static> {
	FieldValue::owned_any(row)
}

/// Turns a stored row into the value resolved for its object type.
///
/// The key id is exposed as the `id` column.
pub(crate) fn entry_to_row(entry: Entry) -> ErasedRow {
	let Entry {
		key,
		mut value,
		..
	} = entry;
	value.insert(ID_COLUMN.to_owned(), key.id.into());
	value
}

/// Turns a stored row into the value resolved for an entry type, which holds
/// the row under its `value` field.
pub(crate) fn entry_to_wrapper(entry: Entry) -> ErasedRow {
	let id = entry.key.id.clone();
	let versionstamp = entry.versionstamp.to_string();
	Object::from_iter([
		(ID_COLUMN, Value::from(id)),
		(VERSIONSTAMP_FIELD, Value::from(versionstamp)),
		(ENTRY_VALUE_FIELD, Value::Object(entry_to_row(entry))),
	])
}

/// Turns a stored row into the parent value of a referenced object, wrapped if
/// the reference points at an entry type.
pub(crate) fn entry_to_field_val(entry: Entry, wrapped: bool) -> FieldValue<'static> {
	if wrapped {
		field_val_erase_owned(entry_to_wrapper(entry))
	} else {
		field_val_erase_owned(entry_to_row(entry))
	}
}

#[allow(clippy::result_large_err)]
pub fn val_to_gql_value(v: Value) -> Result<GqlValue, GqlError> {
	let out = match v {
		Value::None | Value::Null => GqlValue::Null,
		Value::Bool(b) => GqlValue::Boolean(b),
		Value::Number(Number::Int(i)) => GqlValue::Number(i.into()),
		Value::Number(Number::Float(f)) => GqlValue::Number(
			JsonNumber::from_f64(f)
				.ok_or_else(|| resolver_error(format!("cannot represent {f} as a GraphQL number")))?,
		),
		Value::Strand(s) => GqlValue::String(s),
		Value::Array(a) => {
			GqlValue::List(a.into_iter().map(val_to_gql_value).collect::<Result<_, _>>()?)
		}
		Value::Object(o) => GqlValue::Object(
			o.into_iter()
				.map(|(k, v)| Ok((Name::new(k), val_to_gql_value(v)?)))
				.collect::<Result<_, GqlError>>()?,
		),
	};
	Ok(out)
}

#[allow(clippy::result_large_err)]
pub fn gql_to_val(v: &GqlValue) -> Result<Value, GqlError> {
	let out = match v {
		GqlValue::Null => Value::Null,
		GqlValue::Boolean(b) => Value::Bool(*b),
		GqlValue::Number(n) => match n.as_i64() {
			Some(i) => Value::from(i),
			None => match n.as_f64() {
				Some(f) => Value::from(f),
				None => return Err(resolver_error(format!("number {n} is out of range"))),
			},
		},
		GqlValue::String(s) => Value::from(s.as_str()),
		GqlValue::Enum(e) => Value::from(e.as_str()),
		GqlValue::List(l) => Value::Array(l.iter().map(gql_to_val).collect::<Result<_, _>>()?),
		GqlValue::Object(o) => Value::Object(
			o.iter()
				.map(|(k, v)| Ok((k.to_string(), gql_to_val(v)?)))
				.collect::<Result<Object, GqlError>>()?,
		),
		GqlValue::Binary(_) => return Err(resolver_error("binary input values are not supported")),
	};
	Ok(out)
}
