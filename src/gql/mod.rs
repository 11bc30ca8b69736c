//! GraphQL schema generation over the key value store.
//!
//! A type-system document is turned into an executable
//! [`async_graphql::dynamic::Schema`]:
//! - fields of the root query type fetch rows by id
//! - fields of every other object type read columns of the parent row, and
//!   resolve columns holding row ids into the referenced rows
//! - fields of the root mutation type commit the items of their input
//!   argument in one atomic operation

mod document;
pub mod error;
mod ext;
mod mutation;
mod propagate;
mod reference;
mod resolver;
mod root;
mod schema;
mod shape;
mod utils;

pub use error::GqlError;
pub use mutation::{DirectiveBinding, MutationResolver, OperationKind};
pub use reference::{ColumnResolver, ReferenceResolver, ValueResolver};
pub use resolver::{Middleware, MiddlewareMap, Resolver, ResolverMap, middleware};
pub use root::RootResolver;
pub use schema::{SchemaBuilder, build_schema};
pub use shape::{FieldShape, NamedKind, ShapeKind, TypeLookup, classify};
pub use utils::{gql_to_val, val_to_gql_value};
