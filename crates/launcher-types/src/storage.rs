//! Storage-related types for the launcher service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three independent documents held by the record store.
///
/// This enum provides type safety for storage operations by replacing
/// file-name literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
	/// Ordered sequence of user records
	Users,
	/// Ordered sequence of launcher app records
	Apps,
	/// Mapping from user_id to preference record
	Preferences,
}

impl Collection {
	/// Returns the string representation of the collection.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Users => "users",
			Collection::Apps => "apps",
			Collection::Preferences => "preferences",
		}
	}

	/// Name of the backing document inside the data directory.
	pub fn file_name(&self) -> &'static str {
		match self {
			Collection::Users => "users.json",
			Collection::Apps => "apps.json",
			Collection::Preferences => "preferences.json",
		}
	}

	/// Serialized form of an empty collection of the correct shape.
	pub fn empty_document(&self) -> &'static [u8] {
		match self {
			Collection::Users | Collection::Apps => b"[]",
			Collection::Preferences => b"{}",
		}
	}

	/// Returns an iterator over all Collection variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Users, Self::Apps, Self::Preferences].into_iter()
	}
}

/// What a load does when a collection document cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptionPolicy {
	/// Move the document aside and continue with an empty collection
	#[default]
	Recover,
	/// Fail the load
	Fail,
}

impl FromStr for CorruptionPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"recover" => Ok(Self::Recover),
			"fail" => Ok(Self::Fail),
			other => Err(format!("unknown corruption policy: {other}")),
		}
	}
}

impl fmt::Display for Collection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
