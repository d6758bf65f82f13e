//! User account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::MASTER_SUBJECT;

/// A registered user as persisted in the users collection.
///
/// Users are created on registration and never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	/// Opaque unique identifier, used as the token subject
	pub user_id: String,
	/// Login email, unique and compared exactly as stored
	pub email: String,
	pub full_name: String,
	/// bcrypt hash including its salt
	pub hashed_password: String,
	#[serde(with = "crate::timestamp")]
	pub created_at: DateTime<Utc>,
	#[serde(default = "default_active")]
	pub is_active: bool,
}

fn default_active() -> bool {
	true
}

impl User {
	/// Synthetic identity granted to master-password sessions.
	///
	/// It is never written to the users collection and owns its own
	/// apps and preferences under the `master_user` id.
	pub fn master(created_at: DateTime<Utc>) -> Self {
		Self {
			user_id: MASTER_SUBJECT.to_string(),
			email: "master@launcher.local".to_string(),
			full_name: "Master User".to_string(),
			hashed_password: String::new(),
			created_at,
			is_active: true,
		}
	}
}

/// Public view of a user, returned by `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
	pub user_id: String,
	pub email: String,
	pub full_name: String,
	#[serde(with = "crate::timestamp")]
	pub created_at: DateTime<Utc>,
	pub is_active: bool,
}

impl From<&User> for UserResponse {
	fn from(user: &User) -> Self {
		Self {
			user_id: user.user_id.clone(),
			email: user.email.clone(),
			full_name: user.full_name.clone(),
			created_at: user.created_at,
			is_active: user.is_active,
		}
	}
}
