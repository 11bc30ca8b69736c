use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use futures::future::try_join_all;

use super::document::Document;
use super::error::{GqlError, internal_error};
use super::propagate::null_element;
use super::resolver::{Resolver, ResolverMap};
use super::shape::{FieldShape, ShapeKind, classify};
use super::utils::{ErasedRow, entry_to_field_val, field_val_erase_owned, val_to_gql_value};
use crate::cnf::ENTRY_VALUE_FIELD;
use crate::kvs::{Datastore, Id, Key};
use crate::val::Value;

#[allow(clippy::result_large_err)]
pub(crate) fn parent_row<'a>(ctx: &ResolverContext<'a>) -> Result<&'a ErasedRow, GqlError> {
	ctx.parent_value
		.downcast_ref::<ErasedRow>()
		.ok_or_else(|| internal_error("failed to downcast the parent row"))
}

/// Resolves a scalar column of the parent row.
pub struct ColumnResolver {
	column: String,
}

impl ColumnResolver {
	pub fn new(column: impl Into<String>) -> Self {
		ColumnResolver {
			column: column.into(),
		}
	}

	pub(crate) fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		let row = parent_row(ctx)?;
		match row.get(&self.column) {
			Some(v) if !v.is_nullish() => {
				let v = val_to_gql_value(v.clone())?;
				Ok(Some(FieldValue::value(v)))
			}
			_ => Ok(None),
		}
	}
}

/// Resolves the `value` field of an entry type to the wrapped row.
pub struct ValueResolver;

impl ValueResolver {
	pub(crate) fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		match parent_row(ctx)?.get(ENTRY_VALUE_FIELD) {
			Some(Value::Object(row)) => Ok(Some(field_val_erase_owned(row.clone()))),
			_ => Err(internal_error("an entry holds no row").into()),
		}
	}
}

enum Element {
	Row(FieldValue<'static>),
	Null,
	Broken(GqlError),
}

/// Resolves a column holding the id, or ids, of rows in another table.
///
/// Nothing is cached between requests. Every lookup reads the current row, so
/// cyclic references resolve only as deep as the query asks.
pub struct ReferenceResolver {
	ds: Arc<Datastore>,
	column: String,
	shape: FieldShape,
}

impl ReferenceResolver {
	pub fn new(ds: Arc<Datastore>, column: impl Into<String>, shape: FieldShape) -> Self {
		ReferenceResolver {
			ds,
			column: column.into(),
			shape,
		}
	}

	pub fn shape(&self) -> &FieldShape {
		&self.shape
	}

	pub(crate) async fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		let row = parent_row(ctx)?;
		let raw = row.get(&self.column).filter(|v| !v.is_nullish());
		let res = match &self.shape.kind {
			ShapeKind::Reference(table) => self.resolve_one(table, raw).await,
			ShapeKind::ReferenceList {
				table,
				non_null_items,
			} => self.resolve_list(ctx, table, *non_null_items, raw).await,
			ShapeKind::Scalar => Err(internal_error(format!(
				"column `{}` was given a reference resolver for a scalar shape",
				self.column
			))),
		};
		res.map_err(Into::into)
	}

	fn missing(&self) -> GqlError {
		GqlError::MissingRequiredReference {
			column: self.column.clone(),
		}
	}

	#[allow(clippy::result_large_err)]
	fn read_id(&self, raw: &Value) -> Result<Id, GqlError> {
		Id::from_value(raw).ok_or_else(|| GqlError::InvalidReference {
			column: self.column.clone(),
			found: raw.kind_name(),
		})
	}

	async fn resolve_one(
		&self,
		table: &str,
		raw: Option<&Value>,
	) -> Result<Option<FieldValue<'static>>, GqlError> {
		let Some(raw) = raw else {
			return if self.shape.non_null {
				Err(self.missing())
			} else {
				Ok(None)
			};
		};
		let id = self.read_id(raw)?;
		trace!(target: "kvql::gql", table, %id, column = %self.column, "resolving reference");
		match self.ds.get(&Key::new(table, id.clone())).await? {
			Some(entry) => Ok(Some(entry_to_field_val(entry, self.shape.entry))),
			None => Err(GqlError::DanglingReference {
				table: table.to_owned(),
				id,
			}),
		}
	}

	async fn lookup(&self, table: &str, non_null_items: bool, raw: &Value) -> Result<Element, GqlError> {
		if raw.is_nullish() {
			return Ok(if non_null_items {
				Element::Broken(self.missing())
			} else {
				Element::Null
			});
		}
		let id = match self.read_id(raw) {
			Ok(id) => id,
			Err(e) => return Ok(Element::Broken(e)),
		};
		match self.ds.get(&Key::new(table, id.clone())).await? {
			Some(entry) => Ok(Element::Row(entry_to_field_val(entry, self.shape.entry))),
			None => Ok(Element::Broken(GqlError::DanglingReference {
				table: table.to_owned(),
				id,
			})),
		}
	}

	/// Resolves every element concurrently, keeping the stored order.
	///
	/// A broken element becomes `null` with an error at its own path, unless
	/// the declared items are non-null, in which case the whole field fails.
	/// A `null` id resolves to a `null` element without an error.
	async fn resolve_list<'a>(
		&self,
		ctx: &ResolverContext<'a>,
		table: &str,
		non_null_items: bool,
		raw: Option<&Value>,
	) -> Result<Option<FieldValue<'a>>, GqlError> {
		let Some(raw) = raw else {
			return if self.shape.non_null {
				Err(self.missing())
			} else {
				Ok(None)
			};
		};
		let Value::Array(items) = raw else {
			return Err(GqlError::InvalidReference {
				column: self.column.clone(),
				found: raw.kind_name(),
			});
		};
		trace!(target: "kvql::gql", table, count = items.len(), column = %self.column, "resolving reference list");
		let elements =
			try_join_all(items.iter().map(|item| self.lookup(table, non_null_items, item))).await?;
		let mut out: Vec<FieldValue<'a>> = Vec::with_capacity(elements.len());
		for (index, element) in elements.into_iter().enumerate() {
			match element {
				Element::Row(row) => out.push(row),
				Element::Null => {
					null_element(ctx, index, None)?;
					out.push(FieldValue::NULL);
				}
				Element::Broken(e) if non_null_items => return Err(e),
				Element::Broken(e) => {
					null_element(ctx, index, Some(e))?;
					out.push(FieldValue::NULL);
				}
			}
		}
		Ok(Some(FieldValue::list(out)))
	}
}

/// Builds the resolvers of every entry type: the wrapped row under `value`,
/// and the key columns next to it.
pub(crate) fn process_entries(doc: &Document, resolvers: &mut ResolverMap) {
	for (name, obj) in doc.entries() {
		trace!(target: "kvql::gql", "Adding entry type: {}", name);
		for field in &obj.fields {
			let field = field.node.name.node.as_str();
			let resolver = match field {
				ENTRY_VALUE_FIELD => Resolver::Value(ValueResolver),
				_ => Resolver::Column(ColumnResolver::new(field)),
			};
			resolvers.insert(name, field, resolver);
		}
	}
}

/// Builds a resolver for every field of every table.
#[allow(clippy::result_large_err)]
pub(crate) fn process_tables(
	doc: &Document,
	ds: &Arc<Datastore>,
	resolvers: &mut ResolverMap,
) -> Result<(), GqlError> {
	for (tb, obj) in doc.tables() {
		trace!(target: "kvql::gql", "Adding table: {}", tb);
		for field in &obj.fields {
			let field = &field.node;
			let name = field.name.node.as_str();
			let shape = classify(&field.ty.node, doc)?;
			let resolver = match shape.kind {
				ShapeKind::Scalar => Resolver::Column(ColumnResolver::new(name)),
				_ => Resolver::Reference(ReferenceResolver::new(ds.clone(), name, shape)),
			};
			resolvers.insert(tb, name, resolver);
		}
	}
	Ok(())
}
