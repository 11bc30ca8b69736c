use super::api::{Check, Mutation, Operation};
use super::{Datastore, Key};
use crate::err::Result;
use crate::val::Row;
use crate::vs::VersionStamp;

/// A builder for a single atomic commit.
///
/// Checks and mutations are collected locally and sent to the store in one
/// [`Atomic::commit`] call. Dropping the builder discards them.
#[must_use = "an atomic operation does nothing until it is committed"]
pub struct Atomic<'a> {
	ds: &'a Datastore,
	op: Operation,
}

impl<'a> Atomic<'a> {
	pub(super) fn new(ds: &'a Datastore) -> Self {
		Atomic {
			ds,
			op: Operation::default(),
		}
	}

	/// Require the current versionstamp of `key` to equal `versionstamp`.
	///
	/// `None` requires the row to be absent.
	pub fn check(mut self, key: Key, versionstamp: Option<VersionStamp>) -> Self {
		self.op.checks.push(Check {
			key,
			versionstamp,
		});
		self
	}

	/// Insert or replace the row at `key`
	pub fn set(mut self, key: Key, value: Row) -> Self {
		self.op.mutations.push(Mutation::Set(key, value));
		self
	}

	/// Delete the row at `key`
	pub fn delete(mut self, key: Key) -> Self {
		self.op.mutations.push(Mutation::Delete(key));
		self
	}

	pub fn operation(&self) -> &Operation {
		&self.op
	}

	/// Commit the operation.
	///
	/// Returns the new versionstamp, or `None` if any check failed, in which
	/// case no mutation was applied.
	pub async fn commit(self) -> Result<Option<VersionStamp>> {
		let checks = self.op.checks.len();
		let mutations = self.op.mutations.len();
		let res = self.ds.backend().commit(self.op).await?;
		match res {
			Some(vs) => debug!(target: "kvql::kvs", checks, mutations, %vs, "committed"),
			None => debug!(target: "kvql::kvs", checks, mutations, "commit rejected by a check"),
		}
		Ok(res)
	}
}
