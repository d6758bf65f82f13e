//! API types for the launcher HTTP endpoints.
//!
//! This module defines the request and response shapes of the public API,
//! the domain error taxonomy [`LauncherError`] and its mapping onto HTTP
//! responses through [`APIError`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::LauncherApp;
use crate::preferences::PreferenceMap;
use crate::validation::{self, ValidationError};

/// Request body for `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
	pub email: String,
	pub password: String,
	pub full_name: String,
}

impl RegisterRequest {
	pub fn validate(&self) -> Result<(), ValidationError> {
		validation::validate_email(&self.email)?;
		validation::validate_password(&self.password)?;
		validation::validate_full_name(&self.full_name)
	}
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

/// Request body for `POST /api/auth/simple-login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleLoginRequest {
	pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	pub token_type: String,
}

impl TokenResponse {
	pub fn bearer(access_token: String) -> Self {
		Self {
			access_token,
			token_type: "bearer".to_string(),
		}
	}
}

/// Aggregate view returned by `GET /api/launcher-info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherInfo {
	pub user_id: String,
	pub preferences: PreferenceMap,
	/// Active apps of the user in storage order
	pub apps: Vec<LauncherApp>,
	#[serde(with = "crate::timestamp")]
	pub last_updated: DateTime<Utc>,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
	pub message: String,
}

impl MessageResponse {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
	pub message: String,
	pub version: String,
	pub storage: String,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	#[serde(with = "crate::timestamp")]
	pub timestamp: DateTime<Utc>,
	pub storage: String,
	pub production: bool,
}

/// API error kinds as an enum for compile-time safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiErrorType {
	DuplicateEmail,
	InvalidCredentials,
	InvalidToken,
	NotFound,
	ValidationFailed,
	PayloadTooLarge,
	StorageCorrupt,
	InternalError,
}

impl fmt::Display for ApiErrorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let json_str = serde_json::to_string(self).map_err(|_| fmt::Error)?;
		write!(f, "{}", json_str.trim_matches('"'))
	}
}

/// API error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable kind
	pub error: String,
	/// Human-readable description, displayed by the frontend client
	pub detail: String,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Bad request (400)
	BadRequest {
		error_type: ApiErrorType,
		message: String,
	},
	/// Authentication failure (401), always sent with `WWW-Authenticate: Bearer`
	Unauthorized {
		error_type: ApiErrorType,
		message: String,
	},
	/// Resource missing or not owned by the caller (404)
	NotFound {
		error_type: ApiErrorType,
		message: String,
	},
	/// Request body exceeds the configured size limit (413)
	PayloadTooLarge {
		error_type: ApiErrorType,
		message: String,
	},
	/// Input failed validation (422)
	UnprocessableEntity {
		error_type: ApiErrorType,
		message: String,
	},
	/// Internal server error (500)
	InternalServerError {
		error_type: ApiErrorType,
		message: String,
	},
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::PayloadTooLarge { .. } => 413,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn error_type(&self) -> ApiErrorType {
		match self {
			APIError::BadRequest { error_type, .. }
			| APIError::Unauthorized { error_type, .. }
			| APIError::NotFound { error_type, .. }
			| APIError::PayloadTooLarge { error_type, .. }
			| APIError::UnprocessableEntity { error_type, .. }
			| APIError::InternalServerError { error_type, .. } => *error_type,
		}
	}

	fn message(&self) -> &str {
		match self {
			APIError::BadRequest { message, .. }
			| APIError::Unauthorized { message, .. }
			| APIError::NotFound { message, .. }
			| APIError::PayloadTooLarge { message, .. }
			| APIError::UnprocessableEntity { message, .. }
			| APIError::InternalServerError { message, .. } => message,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.error_type().to_string(),
			detail: self.message().to_string(),
		}
	}

	/// The generic rejection used for every token failure.
	pub fn invalid_token() -> Self {
		APIError::Unauthorized {
			error_type: ApiErrorType::InvalidToken,
			message: INVALID_TOKEN_MESSAGE.to_string(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::PayloadTooLarge { message, .. } => {
				write!(f, "Payload Too Large: {}", message)
			},
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{
			http::{header, HeaderValue, StatusCode},
			response::Json,
		};

		let status = match self.status_code() {
			400 => StatusCode::BAD_REQUEST,
			401 => StatusCode::UNAUTHORIZED,
			404 => StatusCode::NOT_FOUND,
			413 => StatusCode::PAYLOAD_TOO_LARGE,
			422 => StatusCode::UNPROCESSABLE_ENTITY,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		let mut response = (status, Json(self.to_error_response())).into_response();
		if status == StatusCode::UNAUTHORIZED {
			response
				.headers_mut()
				.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
		}
		response
	}
}

pub const INVALID_TOKEN_MESSAGE: &str = "Could not validate credentials";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors produced by launcher domain operations.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
	#[error("Email already registered")]
	DuplicateEmail,
	/// Carries the client-facing message, which differs between login flows
	#[error("{0}")]
	InvalidCredentials(String),
	#[error("Could not validate credentials")]
	InvalidToken,
	#[error("{0}")]
	NotFound(String),
	#[error("Validation failed: {0}")]
	Validation(#[from] ValidationError),
	#[error("Corrupt collection: {0}")]
	StorageCorrupt(String),
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<LauncherError> for APIError {
	fn from(error: LauncherError) -> Self {
		match error {
			LauncherError::DuplicateEmail => APIError::BadRequest {
				error_type: ApiErrorType::DuplicateEmail,
				message: "Email already registered".to_string(),
			},
			LauncherError::InvalidCredentials(msg) => APIError::Unauthorized {
				error_type: ApiErrorType::InvalidCredentials,
				message: msg,
			},
			LauncherError::InvalidToken => APIError::invalid_token(),
			LauncherError::NotFound(msg) => APIError::NotFound {
				error_type: ApiErrorType::NotFound,
				message: msg,
			},
			LauncherError::Validation(err) => APIError::UnprocessableEntity {
				error_type: ApiErrorType::ValidationFailed,
				message: err.to_string(),
			},
			// Storage and internal details stay in the logs
			LauncherError::StorageCorrupt(_) => APIError::InternalServerError {
				error_type: ApiErrorType::StorageCorrupt,
				message: INTERNAL_ERROR_MESSAGE.to_string(),
			},
			LauncherError::Storage(_) | LauncherError::Internal(_) => {
				APIError::InternalServerError {
					error_type: ApiErrorType::InternalError,
					message: INTERNAL_ERROR_MESSAGE.to_string(),
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::header, response::IntoResponse};

	#[test]
	fn test_error_type_display_is_kebab_case() {
		assert_eq!(ApiErrorType::DuplicateEmail.to_string(), "duplicate-email");
		assert_eq!(ApiErrorType::ValidationFailed.to_string(), "validation-failed");
		assert_eq!(ApiErrorType::StorageCorrupt.to_string(), "storage-corrupt");
		assert_eq!(ApiErrorType::PayloadTooLarge.to_string(), "payload-too-large");
	}

	#[test]
	fn test_launcher_error_status_mapping() {
		let cases = [
			(LauncherError::DuplicateEmail, 400),
			(
				LauncherError::InvalidCredentials("Incorrect password".into()),
				401,
			),
			(LauncherError::InvalidToken, 401),
			(LauncherError::NotFound("App not found".into()), 404),
			(
				LauncherError::Validation(ValidationError::new("name", "must not be empty")),
				422,
			),
			(LauncherError::StorageCorrupt("apps".into()), 500),
			(LauncherError::Storage("disk full".into()), 500),
		];

		for (error, status) in cases {
			assert_eq!(APIError::from(error).status_code(), status);
		}
	}

	#[test]
	fn test_internal_details_are_not_exposed() {
		let api_error = APIError::from(LauncherError::Storage("/var/data/apps.json: EIO".into()));
		let body = api_error.to_error_response();
		assert_eq!(body.error, "internal-error");
		assert!(!body.detail.contains("apps.json"));
	}

	#[test]
	fn test_unauthorized_sets_www_authenticate() {
		let response = APIError::invalid_token().into_response();
		assert_eq!(response.status(), 401);
		assert_eq!(
			response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
			"Bearer"
		);

		let response = APIError::from(LauncherError::NotFound("App not found".into())).into_response();
		assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
	}

	#[test]
	fn test_register_request_validation() {
		let request = RegisterRequest {
			email: "a@x.com".into(),
			password: "pw".into(),
			full_name: "A".into(),
		};
		assert!(request.validate().is_ok());

		let request = RegisterRequest {
			full_name: String::new(),
			..request
		};
		assert_eq!(request.validate().unwrap_err().field, "full_name");
	}
}
