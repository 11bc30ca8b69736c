use thiserror::Error;

use crate::vs::VersionStampError;

/// An error originating from the key-value store layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// There was a problem with the underlying datastore
	#[error("There was a problem with the underlying datastore: {0}")]
	Ds(String),

	/// There was a problem with a datastore transaction
	#[error("There was a problem with a datastore transaction: {0}")]
	Tx(String),

	/// The requested datastore path is not supported
	#[error("Unable to load the specified datastore {0}")]
	Unsupported(String),

	/// A versionstamp could not be decoded or advanced
	#[error("Versionstamp error: {0}")]
	VersionStamp(#[from] VersionStampError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
