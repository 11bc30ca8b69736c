//! This module defines the contract consumed from a key-value store.

use super::{Entry, Key};
use crate::err::Result;
use crate::val::Row;
use crate::vs::VersionStamp;

/// A precondition on the current version of a row.
#[derive(Clone, Debug, PartialEq)]
pub struct Check {
	pub key: Key,
	/// The expected versionstamp, or `None` if the row must not exist
	pub versionstamp: Option<VersionStamp>,
}

/// A write applied when every check of an operation holds.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
	Set(Key, Row),
	Delete(Key),
}

impl Mutation {
	pub fn key(&self) -> &Key {
		match self {
			Mutation::Set(k, _) | Mutation::Delete(k) => k,
		}
	}
}

/// The checks and mutations of one atomic commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Operation {
	pub checks: Vec<Check>,
	pub mutations: Vec<Mutation>,
}

impl Operation {
	/// Whether the operation has neither checks nor mutations
	pub fn is_empty(&self) -> bool {
		self.checks.is_empty() && self.mutations.is_empty()
	}
}

/// This trait defines the API of a key-value store backend.
///
/// A backend must apply an [`Operation`] atomically: either every check
/// holds and every mutation is applied under one new versionstamp, or
/// nothing is applied. Backends must be safe for concurrent use.
#[async_trait::async_trait]
pub trait Transactable: Send + Sync {
	/// Get the name of the backend.
	fn kind(&self) -> &'static str;

	/// Fetch a row from the datastore.
	async fn get(&self, key: &Key) -> Result<Option<Entry>>;

	/// Commit an operation.
	///
	/// Returns the versionstamp of the commit, or `None` if a check failed
	/// and nothing was applied.
	async fn commit(&self, op: Operation) -> Result<Option<VersionStamp>>;
}
