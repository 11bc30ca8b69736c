use std::fmt;
use std::sync::Arc;

use super::api::Transactable;
use super::tx::Atomic;
use super::{Entry, Key, mem};
use crate::err::{Error, Result};

/// The underlying datastore instance which stores the rows.
///
/// A `Datastore` is cheap to share behind an [`Arc`] and safe to use from
/// concurrent requests.
pub struct Datastore {
	inner: Arc<dyn Transactable>,
}

impl fmt::Debug for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Datastore").field("kind", &self.inner.kind()).finish()
	}
}

impl Datastore {
	/// Creates a new datastore instance
	///
	/// ```rust,no_run
	/// # use kvql::kvs::Datastore;
	/// # use kvql::err::Error;
	/// # #[tokio::main]
	/// # async fn main() -> Result<(), Error> {
	/// let ds = Datastore::new("memory").await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn new(path: &str) -> Result<Datastore> {
		match path {
			"memory" | "mem://" => {
				info!(target: "kvql::kvs", "Starting kvs store in {}", path);
				Ok(Datastore::from_store(mem::Datastore::new()))
			}
			_ => {
				info!(target: "kvql::kvs", "Unable to load the specified datastore {}", path);
				Err(Error::Unsupported(path.to_owned()))
			}
		}
	}

	/// Wraps an external store backend
	pub fn from_store<T: Transactable + 'static>(store: T) -> Datastore {
		Datastore {
			inner: Arc::new(store),
		}
	}

	/// Get the name of the underlying backend
	pub fn kind(&self) -> &'static str {
		self.inner.kind()
	}

	/// Fetch a row, returning `None` if it does not exist
	pub async fn get(&self, key: &Key) -> Result<Option<Entry>> {
		self.inner.get(key).await
	}

	/// Start building an atomic operation
	pub fn atomic(&self) -> Atomic<'_> {
		Atomic::new(self)
	}

	pub(super) fn backend(&self) -> &dyn Transactable {
		self.inner.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use test_log::test;

	use super::*;

	#[test(tokio::test)]
	async fn unsupported_path() {
		let res = Datastore::new("rocksdb://data").await;
		assert!(matches!(res, Err(Error::Unsupported(p)) if p == "rocksdb://data"));
	}

	#[test(tokio::test)]
	async fn memory_path() {
		let ds = Datastore::new("memory").await.unwrap();
		assert_eq!(ds.kind(), "memory");
		assert!(ds.get(&Key::new("Book", "1")).await.unwrap().is_none());
	}
}
