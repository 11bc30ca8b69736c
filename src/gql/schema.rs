use std::sync::Arc;

use async_graphql::dynamic::{
	Enum, Field, FieldFuture, InputObject, InputValue, Object, ResolverContext, Scalar, Schema,
	Type,
};
use async_graphql::parser::types::{FieldDefinition, InputValueDefinition, TypeKind};

use super::document::Document;
use super::error::{GqlError, internal_error, schema_error};
use super::ext::TypeExt;
use super::mutation::process_mutation;
use super::propagate::NullPropagation;
use super::reference::{process_entries, process_tables};
use super::resolver::{Middleware, MiddlewareMap, ResolverMap, middleware};
use super::root::process_root_query;
use crate::cnf::{GRAPHQL_COMPLEXITY_LIMIT, GRAPHQL_DEPTH_LIMIT, GRAPHQL_INTROSPECTION};
use crate::kvs::Datastore;

/// Builds an executable schema from a type-system document.
///
/// Resolvers are derived from the document when the builder is created.
/// Middleware hooks can then be attached to any field which has a resolver,
/// before the schema is assembled with [`SchemaBuilder::finish`].
#[derive(Debug)]
pub struct SchemaBuilder {
	doc: Document,
	resolvers: ResolverMap,
	hooks: MiddlewareMap,
}

impl SchemaBuilder {
	#[allow(clippy::result_large_err)]
	pub fn new(datastore: &Arc<Datastore>, sdl: &str) -> Result<Self, GqlError> {
		let doc = Document::parse(sdl)?;
		let mut resolvers = ResolverMap::default();
		process_root_query(&doc, datastore, &mut resolvers)?;
		process_tables(&doc, datastore, &mut resolvers)?;
		process_entries(&doc, &mut resolvers);
		process_mutation(&doc, datastore, &mut resolvers)?;
		let mut hooks = MiddlewareMap::default();
		for (ty, field, _) in resolvers.iter() {
			hooks.placeholder(ty, field);
		}
		trace!(target: "kvql::gql", resolvers = resolvers.len(), "derived resolvers");
		Ok(SchemaBuilder {
			doc,
			resolvers,
			hooks,
		})
	}

	pub fn resolvers(&self) -> &ResolverMap {
		&self.resolvers
	}

	/// Attach a hook which runs before the resolver of `ty.field`
	#[allow(clippy::result_large_err)]
	pub fn middleware<F>(mut self, ty: &str, field: &str, hook: F) -> Result<Self, GqlError>
	where
		F: Fn(&ResolverContext<'_>) -> Result<(), async_graphql::Error> + Send + Sync + 'static,
	{
		self.hooks.attach(ty, field, middleware(hook))?;
		Ok(self)
	}

	#[allow(clippy::result_large_err)]
	fn bind_field(&self, ty: &str, field: &FieldDefinition) -> Result<Field, GqlError> {
		let name = field.name.node.as_str();
		let resolver = self
			.resolvers
			.get(ty, name)
			.cloned()
			.ok_or_else(|| internal_error(format!("no resolver was derived for `{ty}.{name}`")))?;
		let hooks: Arc<[Middleware]> = Arc::from(self.hooks.get(ty, name).unwrap_or_default());
		let mut out = Field::new(name, field.ty.node.to_type_ref(), move |ctx| {
			let resolver = resolver.clone();
			let hooks = hooks.clone();
			FieldFuture::new(async move {
				for hook in hooks.iter() {
					hook(&ctx)?;
				}
				resolver.resolve(&ctx).await
			})
		});
		for arg in &field.arguments {
			out = out.argument(input_value(&arg.node));
		}
		if let Some(desc) = &field.description {
			out = out.description(desc.node.clone());
		}
		Ok(out)
	}

	/// Assemble the executable schema
	#[allow(clippy::result_large_err)]
	pub fn finish(self) -> Result<Schema, GqlError> {
		let mut types: Vec<Type> = Vec::with_capacity(self.doc.types.len());
		for def in &self.doc.types {
			let name = def.name.node.as_str();
			let description = def.description.as_ref().map(|d| d.node.clone());
			let ty = match &def.kind {
				TypeKind::Object(obj) => {
					let mut out = Object::new(name);
					for field in &obj.fields {
						out = out.field(self.bind_field(name, &field.node)?);
					}
					if let Some(desc) = description {
						out = out.description(desc);
					}
					Type::Object(out)
				}
				TypeKind::InputObject(input) => {
					let mut out = InputObject::new(name);
					for field in &input.fields {
						out = out.field(input_value(&field.node));
					}
					if let Some(desc) = description {
						out = out.description(desc);
					}
					Type::InputObject(out)
				}
				TypeKind::Enum(e) => {
					let mut out = Enum::new(name);
					for value in &e.values {
						out = out.item(value.node.value.node.as_str());
					}
					if let Some(desc) = description {
						out = out.description(desc);
					}
					Type::Enum(out)
				}
				TypeKind::Scalar => {
					let mut out = Scalar::new(name);
					if let Some(desc) = description {
						out = out.description(desc);
					}
					Type::Scalar(out)
				}
				TypeKind::Interface(_) | TypeKind::Union(_) => {
					return Err(schema_error(format!(
						"interface and union types are not supported: `{name}`"
					)));
				}
			};
			trace!(target: "kvql::gql", "adding type: {name}");
			types.push(ty);
		}

		let mut schema = Schema::build(&self.doc.query, self.doc.mutation.as_deref(), None);
		for ty in types {
			schema = schema.register(ty);
		}
		schema = schema
			.extension(NullPropagation)
			.limit_depth(*GRAPHQL_DEPTH_LIMIT)
			.limit_complexity(*GRAPHQL_COMPLEXITY_LIMIT);
		if !*GRAPHQL_INTROSPECTION {
			schema = schema.disable_introspection();
		}
		let schema = schema
			.finish()
			.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))?;
		debug!(target: "kvql::gql", query = %self.doc.query, mutation = ?self.doc.mutation, "schema built");
		Ok(schema)
	}
}

fn input_value(def: &InputValueDefinition) -> InputValue {
	let mut out = InputValue::new(def.name.node.as_str(), def.ty.node.to_type_ref());
	if let Some(v) = &def.default_value {
		out = out.default_value(v.node.clone());
	}
	if let Some(desc) = &def.description {
		out = out.description(desc.node.clone());
	}
	out
}

/// Builds an executable schema with no middleware hooks attached.
#[allow(clippy::result_large_err)]
pub fn build_schema(datastore: &Arc<Datastore>, sdl: &str) -> Result<Schema, GqlError> {
	SchemaBuilder::new(datastore, sdl)?.finish()
}
