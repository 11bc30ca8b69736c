//! # kvql
//!
//! Generates an executable GraphQL schema from a type-system document, backed
//! by an ordered key-value store.
//!
//! Every object type in the document is a table. Rows are stored under the key
//! `(table, id)` and hold a mapping from column name to raw value. Columns
//! typed as another object type (or a list of them) hold row ids, which are
//! resolved lazily on every request, so cyclic schemas need no special
//! handling.
//!
//! Mutations are declared with operation directives on the fields of a
//! mutation input type, and every mutation invocation commits as a single
//! optimistic transaction:
//!
//! ```graphql
//! type Mutation {
//!   deleteTransaction(data: DeleteInput!): Result
//! }
//!
//! input DeleteInput {
//!   deleteBookById: [Identifier!]! @delete(table: "Book")
//! }
//! ```
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! let ds = Arc::new(kvql::kvs::Datastore::new("memory").await?);
//! let schema = kvql::gql::build_schema(&ds, "type Query { bookById(id: ID!): Book } type Book { id: ID! }")?;
//! let res = schema.execute(r#"{ bookById(id: "1") { id } }"#).await;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod err;
pub mod gql;
pub mod kvs;
pub mod val;
pub mod vs;
