//! Authentication configuration and token claims for the launcher API.
//!
//! Access tokens are stateless signed JWTs carrying only a subject and an
//! expiry. The subject is either a registered user's `user_id` or the
//! [`MASTER_SUBJECT`] sentinel issued by master-password login.

use serde::{Deserialize, Serialize};

use crate::SecretString;

/// Token subject used for master-password sessions.
pub const MASTER_SUBJECT: &str = "master_user";

/// JWT claims structure for token validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
	/// Subject (user id or the master sentinel). Tokens without one are
	/// rejected after signature verification.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Expiration time (Unix timestamp)
	pub exp: i64,
	/// Issued at (Unix timestamp)
	#[serde(default)]
	pub iat: i64,
}

impl JwtClaims {
	pub fn new(subject: impl Into<String>, issued_at: i64, expires_at: i64) -> Self {
		Self {
			sub: Some(subject.into()),
			exp: expires_at,
			iat: issued_at,
		}
	}

	/// Whether the token has expired at `now`. No leeway is applied.
	pub fn is_expired_at(&self, now: i64) -> bool {
		now >= self.exp
	}
}

/// Authentication configuration for the API service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
	/// HMAC signing secret shared by issue and verify
	pub jwt_secret: SecretString,
	/// One of HS256, HS384 or HS512
	#[serde(default = "default_algorithm")]
	pub algorithm: String,
	/// Access token lifetime in minutes
	#[serde(default = "default_expire_minutes")]
	pub access_token_expire_minutes: u64,
	/// Shared password for the simple login endpoint. Defaults to
	/// [`DEFAULT_MASTER_PASSWORD`] in every source; set it to an empty string
	/// to disable simple login.
	#[serde(default = "default_master_password")]
	pub master_password: SecretString,
	/// bcrypt work factor for new password hashes
	#[serde(default = "default_bcrypt_cost")]
	pub bcrypt_cost: u32,
}

pub const DEFAULT_JWT_SECRET: &str = "your-super-secret-jwt-key-here";
pub const DEFAULT_MASTER_PASSWORD: &str = "admin123";

fn default_algorithm() -> String {
	"HS256".to_string()
}

fn default_expire_minutes() -> u64 {
	30
}

fn default_bcrypt_cost() -> u32 {
	12
}

fn default_master_password() -> SecretString {
	SecretString::from(DEFAULT_MASTER_PASSWORD)
}

impl AuthConfig {
	/// Whether `POST /api/auth/simple-login` is enabled.
	pub fn master_login_enabled(&self) -> bool {
		!self.master_password.is_empty()
	}

	/// Token lifetime in seconds.
	pub fn token_lifetime_secs(&self) -> i64 {
		i64::try_from(self.access_token_expire_minutes.saturating_mul(60)).unwrap_or(i64::MAX)
	}
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			jwt_secret: SecretString::from(DEFAULT_JWT_SECRET),
			algorithm: default_algorithm(),
			access_token_expire_minutes: default_expire_minutes(),
			master_password: default_master_password(),
			bcrypt_cost: default_bcrypt_cost(),
		}
	}
}
