//! Mutations declared with operation directives.
//!
//! A root mutation field takes a single input object argument. Every field of
//! that input object carries exactly one of `@create`, `@update` or `@delete`,
//! naming the table it writes with a `table` argument. The items of all fields
//! of one invocation are committed together in a single atomic operation,
//! guarded by versionstamp checks.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::parser::types::{FieldDefinition, InputObjectType};
use async_graphql::{Name, Value as GqlValue};

use super::document::Document;
use super::error::{GqlError, internal_error, resolver_error, schema_error};
use super::ext::{DirectiveExt, TypeExt};
use super::resolver::{Resolver, ResolverMap};
use super::shape::{ShapeKind, classify};
use super::utils::{GqlValueUtils, field_val_erase_owned, gql_to_val};
use crate::cnf::{DIRECTIVE_TABLE_ARGUMENT, ID_COLUMN, VERSIONSTAMP_FIELD};
use crate::kvs::{Atomic, Datastore, Key};
use crate::val::Row;
use crate::vs::VersionStamp;

type InputItem = IndexMap<Name, GqlValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
	/// Insert a row which must not exist yet
	Create,
	/// Replace a row whose versionstamp must match
	Update,
	/// Remove a row whose versionstamp must match
	Delete,
}

impl OperationKind {
	pub fn from_directive(name: &str) -> Option<Self> {
		match name {
			"create" => Some(OperationKind::Create),
			"update" => Some(OperationKind::Update),
			"delete" => Some(OperationKind::Delete),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OperationKind::Create => "create",
			OperationKind::Update => "update",
			OperationKind::Delete => "delete",
		}
	}

	fn checks_versionstamp(self) -> bool {
		!matches!(self, OperationKind::Create)
	}

	fn writes_columns(self) -> bool {
		!matches!(self, OperationKind::Delete)
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "@{}", self.as_str())
	}
}

/// Binds one field of a mutation input type to an operation on a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveBinding {
	pub field: String,
	pub op: OperationKind,
	pub table: String,
}

impl DirectiveBinding {
	/// Adds the checks and mutations for one item to the operation
	#[allow(clippy::result_large_err)]
	fn apply<'a>(&self, atomic: Atomic<'a>, item: &GqlValue) -> Result<Atomic<'a>, GqlError> {
		let item = item
			.as_object()
			.ok_or_else(|| resolver_error(format!("items of `{}` must be objects", self.field)))?;
		let id = item
			.get(ID_COLUMN)
			.and_then(GqlValueUtils::as_id)
			.ok_or_else(|| resolver_error(format!("items of `{}` must carry an id", self.field)))?;
		let key = Key::new(&self.table, id);
		let atomic = match self.op {
			OperationKind::Create => atomic.check(key.clone(), None).set(key, self.columns(item)?),
			OperationKind::Update => {
				let vs = self.versionstamp(item)?;
				atomic.check(key.clone(), Some(vs)).set(key, self.columns(item)?)
			}
			OperationKind::Delete => {
				let vs = self.versionstamp(item)?;
				atomic.check(key.clone(), Some(vs)).delete(key)
			}
		};
		Ok(atomic)
	}

	#[allow(clippy::result_large_err)]
	fn versionstamp(&self, item: &InputItem) -> Result<VersionStamp, GqlError> {
		let raw = item.get(VERSIONSTAMP_FIELD).filter(|v| **v != GqlValue::Null).ok_or_else(|| {
			resolver_error(format!("items of `{}` must carry a versionstamp", self.field))
		})?;
		async_graphql::from_value(raw.clone())
			.map_err(|e| resolver_error(format!("invalid versionstamp {raw}: {e}")))
	}

	/// The stored columns of an item: every field except the id and versionstamp
	#[allow(clippy::result_large_err)]
	fn columns(&self, item: &InputItem) -> Result<Row, GqlError> {
		item.iter()
			.filter(|(k, _)| k.as_str() != ID_COLUMN && k.as_str() != VERSIONSTAMP_FIELD)
			.map(|(k, v)| Ok((k.to_string(), gql_to_val(v)?)))
			.collect()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
	/// The new versionstamp as a string
	Versionstamp,
	/// An object whose `versionstamp` field holds the new versionstamp
	Object,
}

/// Resolves a root mutation field by committing one atomic operation.
///
/// A failed versionstamp check resolves the field to `null` without an error.
pub struct MutationResolver {
	ds: Arc<Datastore>,
	arg: String,
	bindings: Vec<DirectiveBinding>,
	output: Output,
}

impl MutationResolver {
	pub fn bindings(&self) -> &[DirectiveBinding] {
		&self.bindings
	}

	pub(crate) async fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		let input = ctx.args.as_index_map().get(self.arg.as_str());
		self.commit(input).await.map_err(Into::into)
	}

	async fn commit(&self, input: Option<&GqlValue>) -> Result<Option<FieldValue<'static>>, GqlError> {
		let input = input
			.and_then(GqlValueUtils::as_object)
			.ok_or_else(|| resolver_error(format!("argument `{}` must be an object", self.arg)))?;
		let mut atomic = self.ds.atomic();
		for binding in &self.bindings {
			let items = match input.get(binding.field.as_str()) {
				None | Some(GqlValue::Null) => continue,
				Some(GqlValue::List(items)) => items.as_slice(),
				Some(item) => std::slice::from_ref(item),
			};
			for item in items {
				atomic = binding.apply(atomic, item)?;
			}
		}
		if atomic.operation().is_empty() {
			debug!(target: "kvql::gql", "nothing to commit");
			return Ok(None);
		}
		let mutations = atomic.operation().mutations.len();
		match atomic.commit().await? {
			Some(vs) => {
				debug!(target: "kvql::gql", mutations, %vs, "mutation committed");
				self.output(vs).map(Some)
			}
			None => {
				debug!(target: "kvql::gql", mutations, "mutation rejected by a versionstamp check");
				Ok(None)
			}
		}
	}

	#[allow(clippy::result_large_err)]
	fn output(&self, vs: VersionStamp) -> Result<FieldValue<'static>, GqlError> {
		let out = match self.output {
			Output::Versionstamp => FieldValue::value(
				async_graphql::to_value(vs).map_err(|e| internal_error(format!("{e}")))?,
			),
			Output::Object => {
				field_val_erase_owned(Row::from_iter([(VERSIONSTAMP_FIELD, vs.to_string())]))
			}
		};
		Ok(out)
	}
}

/// Reads the operation directive of every field of a mutation input type.
#[allow(clippy::result_large_err)]
fn collect_bindings(
	doc: &Document,
	input_name: &str,
	input: &InputObjectType,
) -> Result<Vec<DirectiveBinding>, GqlError> {
	let mut bindings = Vec::with_capacity(input.fields.len());
	for field in &input.fields {
		let field = &field.node;
		let name = field.name.node.as_str();
		let mut ops = field.directives.iter().filter_map(|d| {
			OperationKind::from_directive(d.node.name()).map(|op| (op, &d.node))
		});
		let (op, directive) = ops.next().ok_or_else(|| {
			schema_error(format!(
				"input field `{input_name}.{name}` has no @create, @update or @delete directive"
			))
		})?;
		ensure!(
			ops.next().is_none(),
			schema_error(format!("input field `{input_name}.{name}` has more than one operation directive"))
		);
		let table = match directive.argument(DIRECTIVE_TABLE_ARGUMENT) {
			Some(GqlValue::String(table)) => table.clone(),
			_ => {
				return Err(schema_error(format!(
					"{op} on `{input_name}.{name}` needs a string `{DIRECTIVE_TABLE_ARGUMENT}` argument"
				)));
			}
		};
		ensure!(
			doc.is_table(&table),
			schema_error(format!("{op} on `{input_name}.{name}` names unknown table `{table}`"))
		);
		let item_name = field.ty.node.named_type();
		let item = doc.input_object(item_name).ok_or_else(|| {
			schema_error(format!(
				"items of `{input_name}.{name}` must be an input object type, found `{item_name}`"
			))
		})?;
		let has = |f: &str| item.fields.iter().any(|i| i.node.name.node.as_str() == f);
		ensure!(
			has(ID_COLUMN),
			schema_error(format!("input type `{item_name}` used by {op} has no `{ID_COLUMN}` field"))
		);
		if op.checks_versionstamp() {
			ensure!(
				has(VERSIONSTAMP_FIELD),
				schema_error(format!(
					"input type `{item_name}` used by {op} has no `{VERSIONSTAMP_FIELD}` field"
				))
			);
		}
		if !op.writes_columns() && item.fields.len() > 2 {
			warn!(target: "kvql::gql", input = item_name, "fields other than the id and versionstamp are ignored by {op}");
		}
		bindings.push(DirectiveBinding {
			field: name.to_owned(),
			op,
			table,
		});
	}
	Ok(bindings)
}

#[allow(clippy::result_large_err)]
fn build_mutation(
	doc: &Document,
	ds: &Arc<Datastore>,
	field: &FieldDefinition,
) -> Result<MutationResolver, GqlError> {
	let name = field.name.node.as_str();
	let [arg] = field.arguments.as_slice() else {
		return Err(schema_error(format!("mutation field `{name}` must take exactly one argument")));
	};
	let arg = &arg.node;
	let input_name = arg.ty.node.named_type();
	let input = match doc.input_object(input_name) {
		Some(input) if !arg.ty.node.is_list() => input,
		_ => {
			return Err(schema_error(format!(
				"the argument of mutation field `{name}` must be an input object type"
			)));
		}
	};
	let bindings = collect_bindings(doc, input_name, input)?;

	let ty = &field.ty.node;
	ensure!(
		ty.nullable,
		schema_error(format!(
			"mutation field `{name}` must be nullable, a rejected commit resolves to null"
		))
	);
	let shape = classify(ty, doc)?;
	let output = match shape.kind {
		ShapeKind::Scalar if !ty.is_list() && matches!(ty.named_type(), "String" | "ID") => {
			Output::Versionstamp
		}
		ShapeKind::Reference(result) if !shape.entry => {
			let has_versionstamp = doc
				.object(&result)
				.is_some_and(|o| o.fields.iter().any(|f| f.node.name.node.as_str() == VERSIONSTAMP_FIELD));
			ensure!(
				has_versionstamp,
				schema_error(format!(
					"result type `{result}` of mutation field `{name}` has no `{VERSIONSTAMP_FIELD}` field"
				))
			);
			Output::Object
		}
		_ => {
			return Err(schema_error(format!(
				"mutation field `{name}` must return a string or an object with a `{VERSIONSTAMP_FIELD}` field"
			)));
		}
	};
	Ok(MutationResolver {
		ds: ds.clone(),
		arg: arg.name.node.to_string(),
		bindings,
		output,
	})
}

/// Builds a resolver for every field of the root mutation type.
#[allow(clippy::result_large_err)]
pub(crate) fn process_mutation(
	doc: &Document,
	ds: &Arc<Datastore>,
	resolvers: &mut ResolverMap,
) -> Result<(), GqlError> {
	let Some(mutation_name) = &doc.mutation else {
		return Ok(());
	};
	let mutation = doc
		.object(mutation_name)
		.ok_or_else(|| internal_error("the root mutation type went missing"))?;
	for field in &mutation.fields {
		let field = &field.node;
		let resolver = build_mutation(doc, ds, field)?;
		trace!(target: "kvql::gql", field = %field.name.node, bindings = ?resolver.bindings, "adding mutation field");
		resolvers.insert(mutation_name, field.name.node.as_str(), Resolver::Mutation(resolver));
	}
	Ok(())
}
