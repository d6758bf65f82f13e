//! Launcher application shortcut records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError};

/// A launchable shortcut owned by a user.
///
/// Records are soft-deleted by clearing `is_active` and stay in the apps
/// collection permanently so their `app_id` remains stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherApp {
	pub app_id: String,
	/// Owner back-reference, checked only at creation time
	pub user_id: String,
	pub name: String,
	pub description: String,
	#[serde(default)]
	pub icon_url: Option<String>,
	pub launch_url: String,
	pub category: String,
	#[serde(with = "crate::timestamp")]
	pub created_at: DateTime<Utc>,
	#[serde(default = "default_active")]
	pub is_active: bool,
	/// Set by the first update
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		with = "crate::timestamp::option"
	)]
	pub last_updated: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
	true
}

impl LauncherApp {
	/// Builds a fresh active record from client input.
	pub fn new(
		app_id: String,
		user_id: String,
		input: AppInput,
		created_at: DateTime<Utc>,
	) -> Self {
		Self {
			app_id,
			user_id,
			name: input.name,
			description: input.description,
			icon_url: input.icon_url,
			launch_url: input.launch_url,
			category: input.category,
			created_at,
			is_active: true,
			last_updated: None,
		}
	}

	/// Overwrites the mutable fields in place.
	///
	/// `app_id`, `user_id`, `created_at` and `is_active` are left untouched.
	pub fn apply(&mut self, input: AppInput, now: DateTime<Utc>) {
		self.name = input.name;
		self.description = input.description;
		self.icon_url = input.icon_url;
		self.launch_url = input.launch_url;
		self.category = input.category;
		self.last_updated = Some(now);
	}

	/// Whether the record belongs to `user_id` and is visible in listings.
	pub fn is_visible_to(&self, user_id: &str) -> bool {
		self.is_active && self.user_id == user_id
	}
}

/// Client payload for creating or updating an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInput {
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub icon_url: Option<String>,
	pub launch_url: String,
	#[serde(default = "default_category")]
	pub category: String,
}

fn default_category() -> String {
	"general".to_string()
}

impl AppInput {
	pub fn validate(&self) -> Result<(), ValidationError> {
		validation::require_len("name", &self.name, 1, validation::MAX_APP_NAME_LEN)?;
		validation::require_len(
			"description",
			&self.description,
			0,
			validation::MAX_DESCRIPTION_LEN,
		)?;
		validation::require_len("launch_url", &self.launch_url, 1, validation::MAX_URL_LEN)?;
		validation::require_len("category", &self.category, 0, validation::MAX_CATEGORY_LEN)?;
		if let Some(icon_url) = &self.icon_url {
			validation::require_len("icon_url", icon_url, 0, validation::MAX_URL_LEN)?;
		}
		Ok(())
	}
}
