//! API modules for the launcher service.
//!
//! Each module implements one group of endpoints as plain async functions
//! over [`crate::server::AppState`]; the axum handlers in
//! [`crate::server`] wrap them.

pub mod apps;
pub mod auth;
pub mod health;
pub mod launcher;
pub mod preferences;

use axum::{
	extract::{rejection::JsonRejection, FromRequest, Json, Request},
	http::StatusCode,
};
use launcher_types::{APIError, ApiErrorType};
use serde::de::DeserializeOwned;

/// JSON body extractor whose rejections use the API error format.
///
/// Malformed, mistyped or untyped bodies are reported as `validation-failed`
/// (422). A body over the size limit is `payload-too-large` (413); other
/// failures to read the body are a plain 400.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(Self(value)),
			Err(rejection) => Err(rejection_to_api_error(rejection)),
		}
	}
}

fn rejection_to_api_error(rejection: JsonRejection) -> APIError {
	let status = rejection.status();
	let message = rejection.body_text();
	match rejection {
		JsonRejection::JsonDataError(_)
		| JsonRejection::JsonSyntaxError(_)
		| JsonRejection::MissingJsonContentType(_) => APIError::UnprocessableEntity {
			error_type: ApiErrorType::ValidationFailed,
			message,
		},
		_ if status == StatusCode::PAYLOAD_TOO_LARGE => APIError::PayloadTooLarge {
			error_type: ApiErrorType::PayloadTooLarge,
			message,
		},
		_ => APIError::BadRequest {
			error_type: ApiErrorType::ValidationFailed,
			message,
		},
	}
}
