//! Authentication module for the launcher API service.
//!
//! This module provides stateless JWT issuance and validation, bcrypt
//! password hashing and the middleware that resolves bearer tokens into a
//! user identity for protected endpoints.

pub mod middleware;
pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use launcher_types::{AuthConfig, JwtClaims, LauncherError};
use std::collections::HashSet;
use thiserror::Error;

pub use middleware::{auth_middleware, AuthState, CurrentUser};
pub use password::{PasswordError, PasswordHasher};

/// Lifetime used when a caller does not ask for a specific one.
const DEFAULT_TOKEN_MINUTES: i64 = 15;

/// Errors that can occur during authentication operations.
#[derive(Error, Debug)]
pub enum AuthError {
	/// The configured algorithm is unknown or not an HMAC algorithm
	#[error("Unsupported JWT algorithm: {0}")]
	UnsupportedAlgorithm(String),

	/// Failed to generate a JWT token
	#[error("Failed to generate token: {0}")]
	TokenGeneration(String),

	/// The provided token is invalid
	#[error("Invalid access token: {0}")]
	InvalidAccessToken(String),
}

impl From<AuthError> for LauncherError {
	fn from(err: AuthError) -> Self {
		match err {
			AuthError::InvalidAccessToken(_) => LauncherError::InvalidToken,
			other => LauncherError::Internal(other.to_string()),
		}
	}
}

/// Service for handling JWT token generation and validation.
///
/// The secret and algorithm are fixed for the lifetime of the service;
/// rotating the secret invalidates every outstanding token.
pub struct JwtService {
	algorithm: Algorithm,
	access_token_ttl: Duration,
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
}

impl JwtService {
	/// Creates a new JWT service with the provided configuration.
	///
	/// Only HS256, HS384 and HS512 are accepted.
	///
	/// # Arguments
	/// * `config` - Authentication configuration containing secret and settings
	///
	/// # Returns
	/// A configured JWT service or an error if the algorithm is not supported
	pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
		let algorithm = match config.algorithm.as_str() {
			"HS256" => Algorithm::HS256,
			"HS384" => Algorithm::HS384,
			"HS512" => Algorithm::HS512,
			other => return Err(AuthError::UnsupportedAlgorithm(other.to_string())),
		};

		// Expiry is checked by hand so that `validate_token_at` can use any clock
		let mut validation = Validation::new(algorithm);
		validation.validate_exp = false;
		validation.leeway = 0;
		validation.required_spec_claims = HashSet::new();

		config.jwt_secret.with_exposed(|secret| {
			let secret_bytes = secret.as_bytes();
			Ok(Self {
				algorithm,
				access_token_ttl: Duration::seconds(config.token_lifetime_secs()),
				encoding_key: EncodingKey::from_secret(secret_bytes),
				decoding_key: DecodingKey::from_secret(secret_bytes),
				validation,
			})
		})
	}

	/// Issues a token for `subject` with the configured lifetime.
	pub fn generate_access_token(&self, subject: &str) -> Result<String, AuthError> {
		self.generate_access_token_with_ttl(subject, Some(self.access_token_ttl))
	}

	/// Issues a token for `subject` expiring after `ttl`.
	///
	/// # Arguments
	/// * `subject` - User id, or the master sentinel, to put in `sub`
	/// * `ttl` - Token lifetime; 15 minutes if `None`
	///
	/// # Returns
	/// A signed JWT access token string or an error
	pub fn generate_access_token_with_ttl(
		&self,
		subject: &str,
		ttl: Option<Duration>,
	) -> Result<String, AuthError> {
		let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TOKEN_MINUTES));
		let now = Utc::now();
		let claims = JwtClaims::new(subject, now.timestamp(), (now + ttl).timestamp());

		encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
			.map_err(|e| AuthError::TokenGeneration(e.to_string()))
	}

	/// Validates a JWT token and returns its subject.
	///
	/// # Arguments
	/// * `token` - The JWT token string to validate
	///
	/// # Returns
	/// The `sub` claim if the token is valid and unexpired, or an error
	pub fn validate_token(&self, token: &str) -> Result<String, AuthError> {
		self.validate_token_at(token, Utc::now().timestamp())
	}

	/// Validates a JWT token against the given Unix time.
	///
	/// A token is expired once `now >= exp`; no leeway is applied.
	pub fn validate_token_at(&self, token: &str, now: i64) -> Result<String, AuthError> {
		let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
			.map_err(|e| AuthError::InvalidAccessToken(e.to_string()))?;

		let claims = token_data.claims;
		if claims.is_expired_at(now) {
			return Err(AuthError::InvalidAccessToken("Token expired".to_string()));
		}

		claims
			.sub
			.ok_or_else(|| AuthError::InvalidAccessToken("Missing subject".to_string()))
	}
}
