//! Null propagation for resolver errors.
//!
//! The dynamic executor fails the whole response when any resolver returns an
//! error. [`NullPropagation`] wraps every field and list element instead: an
//! error is given the path of the field it was raised at, and resolves the
//! nearest nullable field or element to `null`, keeping its siblings intact.
//! The absorbed errors are appended to the response.
//!
//! Resolvers of list fields can also mark single elements as `null`, with or
//! without an error, through [`null_element`].

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::ResolverContext;
use async_graphql::extensions::{
	Extension, ExtensionContext, ExtensionFactory, NextExecute, NextResolve, ResolveInfo,
};
use async_graphql::{
	Data, PathSegment, QueryPathNode, QueryPathSegment, Response, ServerError, ServerResult, Value,
};
use parking_lot::Mutex;

use super::error::{GqlError, internal_error};

/// Installs null propagation on a schema.
pub(crate) struct NullPropagation;

impl ExtensionFactory for NullPropagation {
	fn create(&self) -> Arc<dyn Extension> {
		Arc::new(PropagationExtension::default())
	}
}

/// The state of one request, shared with the resolvers as execution data.
#[derive(Default)]
pub(crate) struct Propagation {
	/// List elements which resolve to `null`, by path
	elements: Mutex<HashMap<Vec<String>, Option<ServerError>>>,
	/// Errors absorbed by a nullable field or element
	errors: Mutex<Vec<ServerError>>,
}

impl Propagation {
	fn take_element(&self, node: &QueryPathNode<'_>) -> Option<Option<ServerError>> {
		self.elements.lock().remove(&node.to_string_vec())
	}

	/// Resolves the field at `node` to `null` if it is nullable, or passes the
	/// error on to the enclosing field.
	fn absorb(
		&self,
		node: &QueryPathNode<'_>,
		nullable: bool,
		mut err: ServerError,
	) -> ServerResult<Option<Value>> {
		if err.path.is_empty() {
			err.path = error_path(node);
		}
		if !nullable {
			return Err(err);
		}
		trace!(target: "kvql::gql", path = %node, "resolved to null: {}", err.message);
		self.errors.lock().push(err);
		Ok(None)
	}
}

fn error_path(node: &QueryPathNode<'_>) -> Vec<PathSegment> {
	let mut path: Vec<PathSegment> = std::iter::once(node)
		.chain(node.parents())
		.map(|n| match n.segment {
			QueryPathSegment::Name(name) => PathSegment::Field(name.to_owned()),
			QueryPathSegment::Index(idx) => PathSegment::Index(idx),
		})
		.collect();
	path.reverse();
	path
}

#[derive(Default)]
struct PropagationExtension {
	state: Arc<Propagation>,
}

#[async_trait::async_trait]
impl Extension for PropagationExtension {
	async fn execute(
		&self,
		ctx: &ExtensionContext<'_>,
		operation_name: Option<&str>,
		next: NextExecute<'_>,
	) -> Response {
		let mut data = Data::default();
		data.insert(self.state.clone());
		let mut res = next.run_with_data(ctx, operation_name, data).await;
		res.errors.append(&mut self.state.errors.lock());
		res
	}

	async fn resolve(
		&self,
		ctx: &ExtensionContext<'_>,
		info: ResolveInfo<'_>,
		next: NextResolve<'_>,
	) -> ServerResult<Option<Value>> {
		let node = info.path_node;
		let nullable = !info.return_type.ends_with('!');
		// List elements are resolved with a parent type of `[Item]`
		if info.parent_type.starts_with('[') {
			if let Some(outcome) = self.state.take_element(node) {
				return match outcome {
					Some(err) => self.state.absorb(node, nullable, err),
					None if nullable => Ok(None),
					None => self.state.absorb(
						node,
						false,
						ServerError::new("a non-null list element has no value", None),
					),
				};
			}
		}
		match next.run(ctx, info).await {
			Err(err) => self.state.absorb(node, nullable, err),
			res => res,
		}
	}
}

/// Marks the element at `index` of the list being resolved as `null`.
///
/// Without an error the element is simply absent. With an error, the error is
/// reported at the path of the element, and propagates further if the items of
/// the list are non-null. The element placed in the list is never resolved.
#[allow(clippy::result_large_err)]
pub(crate) fn null_element(
	ctx: &ResolverContext<'_>,
	index: usize,
	err: Option<GqlError>,
) -> Result<(), GqlError> {
	let state = ctx
		.ctx
		.data_opt::<Arc<Propagation>>()
		.ok_or_else(|| internal_error("null propagation is not installed on the schema"))?;
	let node = ctx
		.ctx
		.path_node
		.as_ref()
		.ok_or_else(|| internal_error("a list field was resolved without a path"))?;
	let element = QueryPathNode {
		parent: Some(node),
		segment: QueryPathSegment::Index(index),
	};
	let err = err.map(|e| async_graphql::Error::from(e).into_server_error(ctx.ctx.item.pos));
	state.elements.lock().insert(element.to_string_vec(), err);
	Ok(())
}
