use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::parser::types::FieldDefinition;
use async_graphql::Value as GqlValue;
use futures::future::try_join_all;

use super::document::Document;
use super::error::{GqlError, internal_error, resolver_error, schema_error};
use super::ext::TypeExt;
use super::resolver::{Resolver, ResolverMap};
use super::shape::{FieldShape, ShapeKind, classify};
use super::propagate::null_element;
use super::utils::{GqlValueUtils, entry_to_field_val};
use crate::kvs::{Datastore, Id, Key};

/// Resolves a root query field by fetching rows by id.
///
/// A single reference fetches one row by the id argument. A list of references
/// fetches one row per id in the list argument, in the order given. Missing
/// rows resolve to `null` without an error.
pub struct RootResolver {
	ds: Arc<Datastore>,
	arg: String,
	shape: FieldShape,
}

impl RootResolver {
	pub fn shape(&self) -> &FieldShape {
		&self.shape
	}

	/// The name of the argument holding the id or ids
	pub fn argument(&self) -> &str {
		&self.arg
	}

	pub(crate) async fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		let arg = ctx.args.as_index_map().get(self.arg.as_str()).filter(|v| **v != GqlValue::Null);
		let res = match &self.shape.kind {
			ShapeKind::Reference(table) => self.by_id(table, arg).await,
			ShapeKind::ReferenceList {
				table,
				..
			} => self.by_ids(ctx, table, arg).await,
			ShapeKind::Scalar => Err(internal_error("root query field has a scalar shape")),
		};
		res.map_err(Into::into)
	}

	#[allow(clippy::result_large_err)]
	fn read_id(&self, v: &GqlValue) -> Result<Id, GqlError> {
		v.as_id().ok_or_else(|| resolver_error(format!("argument `{}` must be an id, found {v}", self.arg)))
	}

	async fn fetch(&self, table: &str, id: Id) -> Result<Option<FieldValue<'static>>, GqlError> {
		trace!(target: "kvql::gql", table, %id, "fetching root row");
		let entry = self.ds.get(&Key::new(table, id)).await?;
		Ok(entry.map(|e| entry_to_field_val(e, self.shape.entry)))
	}

	async fn by_id(
		&self,
		table: &str,
		arg: Option<&GqlValue>,
	) -> Result<Option<FieldValue<'static>>, GqlError> {
		match arg {
			Some(v) => self.fetch(table, self.read_id(v)?).await,
			None => Ok(None),
		}
	}

	async fn by_ids<'a>(
		&self,
		ctx: &ResolverContext<'a>,
		table: &str,
		arg: Option<&GqlValue>,
	) -> Result<Option<FieldValue<'a>>, GqlError> {
		let Some(arg) = arg else {
			return Ok(None);
		};
		let ids = arg
			.as_list()
			.ok_or_else(|| resolver_error(format!("argument `{}` must be a list of ids", self.arg)))?;
		let lookups = ids.iter().map(|v| async move {
			match v {
				GqlValue::Null => Ok::<_, GqlError>(None),
				v => self.fetch(table, self.read_id(v)?).await,
			}
		});
		let rows = try_join_all(lookups).await?;
		let mut out: Vec<FieldValue<'a>> = Vec::with_capacity(rows.len());
		for (index, row) in rows.into_iter().enumerate() {
			match row {
				Some(row) => out.push(row),
				None => {
					null_element(ctx, index, None)?;
					out.push(FieldValue::NULL);
				}
			}
		}
		Ok(Some(FieldValue::list(out)))
	}
}

/// Finds the argument which carries the id, or ids, of a root field.
///
/// This is the first argument typed `ID` for a single reference, or the first
/// argument typed as a list of `ID` for a list of references.
#[allow(clippy::result_large_err)]
fn id_argument(field: &FieldDefinition, shape: &FieldShape) -> Result<String, GqlError> {
	let name = field.name.node.as_str();
	let list = match shape.kind {
		ShapeKind::Scalar => {
			return Err(schema_error(format!(
				"root query field `{name}` must return an object type or a list of object types"
			)));
		}
		ShapeKind::Reference(_) => false,
		ShapeKind::ReferenceList {
			..
		} => true,
	};
	field
		.arguments
		.iter()
		.map(|arg| &arg.node)
		.find(|arg| {
			let ty = &arg.ty.node;
			ty.named_type() == "ID" && ty.is_list() == list
		})
		.map(|arg| arg.name.node.to_string())
		.ok_or_else(|| {
			let expected = if list {
				"a list of ID"
			} else {
				"an ID"
			};
			schema_error(format!("root query field `{name}` has no argument of type {expected}"))
		})
}

/// Builds a resolver for every field of the root query type.
#[allow(clippy::result_large_err)]
pub(crate) fn process_root_query(
	doc: &Document,
	ds: &Arc<Datastore>,
	resolvers: &mut ResolverMap,
) -> Result<(), GqlError> {
	let query =
		doc.object(&doc.query).ok_or_else(|| internal_error("the root query type went missing"))?;
	for field in &query.fields {
		let field = &field.node;
		let name = field.name.node.as_str();
		let shape = classify(&field.ty.node, doc)?;
		let arg = id_argument(field, &shape)?;
		trace!(target: "kvql::gql", field = name, ?shape, %arg, "adding root query field");
		resolvers.insert(
			&doc.query,
			name,
			Resolver::Root(RootResolver {
				ds: ds.clone(),
				arg,
				shape,
			}),
		);
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use test_log::test;

	use super::*;

	async fn resolvers(sdl: &str) -> Result<ResolverMap, GqlError> {
		let ds = Arc::new(Datastore::new("memory").await.unwrap());
		let doc = Document::parse(sdl)?;
		let mut map = ResolverMap::default();
		process_root_query(&doc, &ds, &mut map)?;
		Ok(map)
	}

	#[test(tokio::test)]
	async fn picks_first_id_argument() {
		let map = resolvers(
			"type Query { book(title: String, key: ID!, other: ID): Book, books(first: Int, keys: [ID!]!): [Book] } type Book { id: ID! }",
		)
		.await
		.unwrap();
		let Some(Resolver::Root(book)) = map.get("Query", "book").map(|r| &**r) else {
			panic!("expected a root resolver");
		};
		assert_eq!(book.argument(), "key");
		assert_eq!(book.shape().kind, ShapeKind::Reference("Book".into()));
		let Some(Resolver::Root(books)) = map.get("Query", "books").map(|r| &**r) else {
			panic!("expected a root resolver");
		};
		assert_eq!(books.argument(), "keys");
	}

	#[test(tokio::test)]
	async fn rejects_invalid_root_fields() {
		for sdl in [
			"type Query { count: Int } type Book { id: ID! }",
			"type Query { book(title: String): Book } type Book { id: ID! }",
			"type Query { books(id: ID): [Book] } type Book { id: ID! }",
		] {
			assert!(matches!(resolvers(sdl).await, Err(GqlError::SchemaError(_))), "{sdl}");
		}
	}
}
