//! Resolver and middleware maps, keyed by `(type name, field name)`.
//!
//! Both maps are built fresh for every schema, so two schemas built from
//! different documents never share a resolver or a hook.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};

use super::error::{GqlError, schema_error};
use super::mutation::MutationResolver;
use super::reference::{ColumnResolver, ReferenceResolver, ValueResolver};
use super::root::RootResolver;
use super::shape::FieldShape;

/// A hook which runs before the resolver of the field it is attached to.
///
/// Returning an error fails the field without running the resolver.
pub type Middleware =
	Arc<dyn Fn(&ResolverContext<'_>) -> Result<(), async_graphql::Error> + Send + Sync>;

/// Wraps a closure as a [`Middleware`] hook.
pub fn middleware<F>(hook: F) -> Middleware
where
	F: Fn(&ResolverContext<'_>) -> Result<(), async_graphql::Error> + Send + Sync + 'static,
{
	Arc::new(hook)
}

/// The resolver of a single field.
pub enum Resolver {
	/// A root query field which fetches rows by id
	Root(RootResolver),
	/// A scalar column of a table
	Column(ColumnResolver),
	/// A column of a table holding one or more row ids
	Reference(ReferenceResolver),
	/// The row wrapped by an entry type
	Value(ValueResolver),
	/// A root mutation field which commits one transaction
	Mutation(MutationResolver),
}

impl Resolver {
	/// The classified output shape, for fields resolved against a table
	pub fn shape(&self) -> Option<&FieldShape> {
		match self {
			Resolver::Root(r) => Some(r.shape()),
			Resolver::Reference(r) => Some(r.shape()),
			Resolver::Column(_) | Resolver::Value(_) | Resolver::Mutation(_) => None,
		}
	}

	pub(crate) async fn resolve<'a>(
		&self,
		ctx: &ResolverContext<'a>,
	) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
		match self {
			Resolver::Root(r) => r.resolve(ctx).await,
			Resolver::Column(r) => r.resolve(ctx),
			Resolver::Reference(r) => r.resolve(ctx).await,
			Resolver::Value(r) => r.resolve(ctx),
			Resolver::Mutation(r) => r.resolve(ctx).await,
		}
	}
}

impl fmt::Debug for Resolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Resolver::Root(r) => write!(f, "Root({:?})", r.shape()),
			Resolver::Column(_) => f.write_str("Column"),
			Resolver::Reference(r) => write!(f, "Reference({:?})", r.shape()),
			Resolver::Value(_) => f.write_str("Value"),
			Resolver::Mutation(_) => f.write_str("Mutation"),
		}
	}
}

#[derive(Debug, Default)]
pub struct ResolverMap(BTreeMap<String, BTreeMap<String, Arc<Resolver>>>);

impl ResolverMap {
	pub fn insert(&mut self, ty: &str, field: &str, resolver: Resolver) {
		self.0.entry(ty.to_owned()).or_default().insert(field.to_owned(), Arc::new(resolver));
	}

	pub fn get(&self, ty: &str, field: &str) -> Option<&Arc<Resolver>> {
		self.0.get(ty)?.get(field)
	}

	/// Iterates over every `(type, field, resolver)` entry
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Arc<Resolver>)> {
		self.0.iter().flat_map(|(ty, fields)| {
			fields.iter().map(move |(field, r)| (ty.as_str(), field.as_str(), r))
		})
	}

	pub fn len(&self) -> usize {
		self.0.values().map(BTreeMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Middleware hooks, with an entry for every field which has a resolver.
#[derive(Default)]
pub struct MiddlewareMap(BTreeMap<String, BTreeMap<String, Vec<Middleware>>>);

impl MiddlewareMap {
	/// Register a field which hooks may be attached to
	pub(crate) fn placeholder(&mut self, ty: &str, field: &str) {
		self.0.entry(ty.to_owned()).or_default().entry(field.to_owned()).or_default();
	}

	/// Attach a hook to a registered field
	#[allow(clippy::result_large_err)]
	pub fn attach(&mut self, ty: &str, field: &str, hook: Middleware) -> Result<(), GqlError> {
		match self.0.get_mut(ty).and_then(|fields| fields.get_mut(field)) {
			Some(hooks) => {
				hooks.push(hook);
				Ok(())
			}
			None => Err(schema_error(format!("cannot attach middleware to unknown field `{ty}.{field}`"))),
		}
	}

	pub fn get(&self, ty: &str, field: &str) -> Option<&[Middleware]> {
		self.0.get(ty)?.get(field).map(Vec::as_slice)
	}

	pub fn contains(&self, ty: &str, field: &str) -> bool {
		self.get(ty, field).is_some()
	}
}

impl fmt::Debug for MiddlewareMap {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for (ty, fields) in &self.0 {
			for (field, hooks) in fields {
				map.entry(&format_args!("{ty}.{field}"), &hooks.len());
			}
		}
		map.finish()
	}
}
