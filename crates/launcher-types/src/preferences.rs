//! Per-user preference records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{ValidationError, MAX_PREFERENCE_BYTES, MAX_PREFERENCE_KEYS};

/// Opaque client-owned settings object.
///
/// Contents are not interpreted by the service; only the shape (a JSON
/// object) and its size are checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceMap(Map<String, Value>);

impl PreferenceMap {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Enforces the key-count and encoded-size bounds.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.0.len() > MAX_PREFERENCE_KEYS {
			return Err(ValidationError::new(
				"preferences",
				format!("must have at most {MAX_PREFERENCE_KEYS} keys"),
			));
		}
		let encoded = serde_json::to_vec(&self.0)
			.map_err(|e| ValidationError::new("preferences", e.to_string()))?;
		if encoded.len() > MAX_PREFERENCE_BYTES {
			return Err(ValidationError::new(
				"preferences",
				format!("must encode to at most {MAX_PREFERENCE_BYTES} bytes"),
			));
		}
		Ok(())
	}
}

impl From<Map<String, Value>> for PreferenceMap {
	fn from(entries: Map<String, Value>) -> Self {
		Self(entries)
	}
}

/// Settings assigned on first launcher-info read.
pub fn default_preferences() -> PreferenceMap {
	let mut entries = Map::new();
	entries.insert("theme".into(), Value::from("dark"));
	entries.insert("gesture_sensitivity".into(), Value::from("medium"));
	entries.insert("animation_speed".into(), Value::from("normal"));
	PreferenceMap::from(entries)
}

/// Stored preferences of one user, keyed by `user_id` in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
	pub user_id: String,
	#[serde(default)]
	pub preferences: PreferenceMap,
	#[serde(with = "crate::timestamp")]
	pub last_updated: DateTime<Utc>,
}

impl PreferenceRecord {
	pub fn new(user_id: impl Into<String>, preferences: PreferenceMap, now: DateTime<Utc>) -> Self {
		Self {
			user_id: user_id.into(),
			preferences,
			last_updated: now,
		}
	}
}
