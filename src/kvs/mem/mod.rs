//! An in-memory ordered key-value store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::err::Result;
use crate::kvs::api::{Mutation, Operation, Transactable};
use crate::kvs::{Entry, Key};
use crate::val::Row;
use crate::vs::VersionStamp;

#[derive(Default)]
struct State {
	/// The rows, ordered by key
	rows: BTreeMap<Key, (Row, VersionStamp)>,
	/// The versionstamp of the latest commit
	version: VersionStamp,
}

/// An in-memory datastore.
///
/// Every commit takes the write lock once, checks all preconditions, and
/// applies all mutations before releasing it. The lock is never held across
/// a suspension point.
#[derive(Default)]
pub struct Datastore {
	inner: RwLock<State>,
}

impl Datastore {
	/// Open a new database
	pub(crate) fn new() -> Datastore {
		Datastore::default()
	}
}

#[async_trait::async_trait]
impl Transactable for Datastore {
	fn kind(&self) -> &'static str {
		"memory"
	}

	/// Fetch a key from the database
	#[instrument(level = "trace", target = "kvql::kvs::mem", skip_all, fields(key = %key))]
	async fn get(&self, key: &Key) -> Result<Option<Entry>> {
		let state = self.inner.read();
		Ok(state.rows.get(key).map(|(value, versionstamp)| Entry {
			key: key.clone(),
			value: value.clone(),
			versionstamp: *versionstamp,
		}))
	}

	/// Commit checks and mutations atomically
	#[instrument(level = "trace", target = "kvql::kvs::mem", skip_all, fields(checks = op.checks.len(), mutations = op.mutations.len()))]
	async fn commit(&self, op: Operation) -> Result<Option<VersionStamp>> {
		let mut state = self.inner.write();
		// Check every precondition before writing anything
		for chk in op.checks.iter() {
			let current = state.rows.get(&chk.key).map(|(_, vs)| *vs);
			if current != chk.versionstamp {
				trace!(key = %chk.key, ?current, expected = ?chk.versionstamp, "check failed");
				return Ok(None);
			}
		}
		// Allocate the versionstamp of this commit
		let version = state.version.next()?;
		// Apply the mutations in order
		for mutation in op.mutations {
			match mutation {
				Mutation::Set(key, value) => {
					state.rows.insert(key, (value, version));
				}
				Mutation::Delete(key) => {
					state.rows.remove(&key);
				}
			}
		}
		state.version = version;
		Ok(Some(version))
	}
}
