//! Versionstamps identify the commit which last wrote a row.
//!
//! A versionstamp is a 10-byte value. The first 8 bytes hold a big-endian
//! commit counter and the remaining 2 bytes are not significant for ordering
//! within a single store. Versionstamps are treated as opaque tokens by the
//! resolvers: they are only ever rendered, parsed and compared for equality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VersionStampError {
	#[error("Invalid versionstamp length: expected 10 bytes, found {0}")]
	InvalidLength(usize),
	#[error("Invalid versionstamp encoding: {0}")]
	InvalidEncoding(String),
	#[error("Versionstamp does not fit into a u64")]
	Overflow,
}

/// A 10-byte value identifying a committed version of a row.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionStamp([u8; 10]);

impl VersionStamp {
	pub const ZERO: VersionStamp = VersionStamp([0; 10]);

	pub const fn from_u64(v: u64) -> Self {
		let b = v.to_be_bytes();
		VersionStamp([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], 0, 0])
	}

	/// Returns the commit counter, failing if the trailing bytes are set.
	pub fn try_into_u64(self) -> Result<u64, VersionStampError> {
		if self.0[8] != 0 || self.0[9] != 0 {
			return Err(VersionStampError::Overflow);
		}
		let mut buf = [0u8; 8];
		buf.copy_from_slice(&self.0[..8]);
		Ok(u64::from_be_bytes(buf))
	}

	pub fn from_slice(bytes: &[u8]) -> Result<Self, VersionStampError> {
		let bytes: [u8; 10] =
			bytes.try_into().map_err(|_| VersionStampError::InvalidLength(bytes.len()))?;
		Ok(VersionStamp(bytes))
	}

	pub const fn as_bytes(&self) -> [u8; 10] {
		self.0
	}

	/// The next versionstamp in sequence.
	pub fn next(self) -> Result<Self, VersionStampError> {
		let v = self.try_into_u64()?;
		v.checked_add(1).map(Self::from_u64).ok_or(VersionStampError::Overflow)
	}
}

impl fmt::Display for VersionStamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&hex::encode(self.0))
	}
}

impl fmt::Debug for VersionStamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "VersionStamp({self})")
	}
}

impl FromStr for VersionStamp {
	type Err = VersionStampError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = hex::decode(s).map_err(|e| VersionStampError::InvalidEncoding(e.to_string()))?;
		Self::from_slice(&bytes)
	}
}

impl Serialize for VersionStamp {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for VersionStamp {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
