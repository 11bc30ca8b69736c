//! Classification of declared field types.
//!
//! Every output field is classified once, when the schema is built, into a
//! [`FieldShape`]. The shape decides which resolver the field gets and how a
//! missing value is reported at request time.

use async_graphql::parser::types::{BaseType, Type};

use super::error::{GqlError, schema_error};

/// What a named type in the document is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedKind {
	/// An object type backed by a table
	Table,
	/// An object type exposing a stored entry of a table: its row under a
	/// `value` field, next to its `id` and `versionstamp`
	Entry,
	/// A built-in scalar, a custom scalar or an enum
	Leaf,
	/// An input object type
	Input,
	/// An interface or union type
	Abstract,
}

/// Resolves the names used in field types.
pub trait TypeLookup {
	fn kind_of(&self, name: &str) -> Option<NamedKind>;

	/// The table whose rows an entry type wraps
	fn entry_table(&self, _name: &str) -> Option<&str> {
		None
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeKind {
	/// A leaf value read directly from a column
	Scalar,
	/// A single row id which refers to a row of `table`
	Reference(String),
	/// A list of row ids which refer to rows of `table`
	ReferenceList {
		table: String,
		non_null_items: bool,
	},
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldShape {
	pub kind: ShapeKind,
	/// Whether the outermost type is non-null
	pub non_null: bool,
	/// Whether referenced rows are wrapped in an entry type
	pub entry: bool,
}

impl FieldShape {
	/// The referenced table, if this is a reference shape
	pub fn table(&self) -> Option<&str> {
		match &self.kind {
			ShapeKind::Scalar => None,
			ShapeKind::Reference(tb) => Some(tb),
			ShapeKind::ReferenceList {
				table,
				..
			} => Some(table),
		}
	}

	pub fn is_reference(&self) -> bool {
		self.table().is_some()
	}
}

/// Classifies a declared output type.
///
/// Lists of leaf values, however deeply nested, are scalars. A list of lists
/// of references is not supported.
#[allow(clippy::result_large_err)]
pub fn classify<L: TypeLookup + ?Sized>(ty: &Type, lookup: &L) -> Result<FieldShape, GqlError> {
	let (kind, entry) = match &ty.base {
		BaseType::Named(name) => match lookup.kind_of(name) {
			Some(NamedKind::Table) => (ShapeKind::Reference(name.to_string()), false),
			Some(NamedKind::Entry) => {
				let table = lookup
					.entry_table(name)
					.ok_or_else(|| schema_error(format!("entry type `{name}` wraps no table")))?;
				(ShapeKind::Reference(table.to_owned()), true)
			}
			Some(NamedKind::Leaf) => (ShapeKind::Scalar, false),
			Some(NamedKind::Input) => {
				return Err(schema_error(format!(
					"input type `{name}` cannot be used as an output type"
				)));
			}
			Some(NamedKind::Abstract) => {
				return Err(schema_error(format!("interface and union types are not supported: `{name}`")));
			}
			None => return Err(schema_error(format!("unknown type `{name}`"))),
		},
		BaseType::List(inner) => match classify(inner, lookup)? {
			FieldShape {
				kind: ShapeKind::Scalar,
				..
			} => (ShapeKind::Scalar, false),
			FieldShape {
				kind: ShapeKind::Reference(table),
				non_null,
				entry,
			} => (
				ShapeKind::ReferenceList {
					table,
					non_null_items: non_null,
				},
				entry,
			),
			FieldShape {
				kind: ShapeKind::ReferenceList {
					table,
					..
				},
				..
			} => {
				return Err(schema_error(format!("nested lists of `{table}` are not supported")));
			}
		},
	};
	Ok(FieldShape {
		kind,
		non_null: !ty.nullable,
		entry,
	})
}
