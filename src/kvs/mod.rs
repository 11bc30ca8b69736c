//! The module defining the key value store.
//!
//! Rows live under the key `(table, id)` and carry the versionstamp of the
//! commit which last wrote them. This module enables the following operations
//! on the key value store:
//! - get
//! - atomic commits of checks, sets and deletes
//!
//! These operations can be processed by the following storage engines:
//! - `mem`: in-memory database
//! - any external store implementing [`Transactable`]

pub mod api;
mod ds;
mod key;
mod mem;
mod tx;

pub use api::{Check, Mutation, Operation, Transactable};
pub use ds::Datastore;
pub use key::{Id, Key};
pub use tx::Atomic;

use crate::val::Row;
use crate::vs::VersionStamp;

/// A row read from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
	pub key: Key,
	pub value: Row,
	pub versionstamp: VersionStamp,
}
