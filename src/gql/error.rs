use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::kvs::Id;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Database error: {0}")]
	DbError(crate::err::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("Expected column '{column}' to contain id")]
	MissingRequiredReference {
		column: String,
	},
	#[error("Expected referenced table '{table}' to have row with id '{id}'")]
	DanglingReference {
		table: String,
		id: Id,
	},
	#[error("Expected column '{column}' to contain id, found {found}")]
	InvalidReference {
		column: String,
		found: &'static str,
	},
}

impl GqlError {
	/// The error kind reported in the `code` extension
	pub fn code(&self) -> &'static str {
		match self {
			GqlError::DbError(_) => "DbError",
			GqlError::SchemaError(_) => "SchemaError",
			GqlError::ResolverError(_) => "ResolverError",
			GqlError::InternalError(_) => "InternalError",
			GqlError::MissingRequiredReference {
				..
			} => "MissingRequiredReference",
			GqlError::DanglingReference {
				..
			} => "DanglingReference",
			GqlError::InvalidReference {
				..
			} => "InvalidReference",
		}
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

impl From<crate::err::Error> for GqlError {
	fn from(value: crate::err::Error) -> Self {
		GqlError::DbError(value)
	}
}

impl ErrorExtensions for GqlError {
	fn extend(&self) -> async_graphql::Error {
		let message = match self {
			// Store faults are infrastructure problems, not data problems
			GqlError::DbError(e) => {
				error!("Store error while resolving a field: {e}");
				"Internal Error".to_owned()
			}
			e => e.to_string(),
		};
		let code = self.code();
		async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", code))
	}
}

impl From<GqlError> for async_graphql::Error {
	fn from(value: GqlError) -> Self {
		value.extend()
	}
}
