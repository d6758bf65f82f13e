//! Axum middleware for bearer-token authentication.
//!
//! Protected routes run behind [`auth_middleware`], which turns the
//! `Authorization: Bearer <token>` header into a resolved [`User`] and stores
//! it in the request extensions as [`CurrentUser`].

use super::JwtService;
use axum::{
	extract::State,
	http::{header, HeaderMap, Method, Request},
	middleware::Next,
	response::{IntoResponse, Response},
};
use launcher_storage::StorageService;
use launcher_types::{APIError, LauncherError, User, MASTER_SUBJECT};
use std::sync::Arc;

/// Authentication state for middleware.
#[derive(Clone)]
pub struct AuthState {
	/// JWT service for token validation
	pub jwt_service: Arc<JwtService>,
	/// Record store used to resolve token subjects
	pub storage: Arc<StorageService>,
	/// Identity for master-password sessions; `None` while simple login is disabled
	pub master_identity: Option<Arc<User>>,
}

/// Identity resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware function that validates JWT tokens and resolves the caller.
///
/// This middleware:
/// 1. Extracts the JWT token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Looks the subject up in the users collection
/// 4. Adds the resolved user to the request extensions for use in handlers
///
/// Every rejection is a 401 with the same generic message.
pub async fn auth_middleware(
	State(state): State<AuthState>,
	mut request: Request<axum::body::Body>,
	next: Next,
) -> Response {
	// Skip auth for OPTIONS requests (CORS preflight)
	if request.method() == Method::OPTIONS {
		return next.run(request).await;
	}

	let Some(token) = extract_bearer_token(request.headers()) else {
		tracing::warn!(path = %request.uri().path(), "Missing or malformed Authorization header");
		return APIError::invalid_token().into_response();
	};

	let subject = match state.jwt_service.validate_token(token) {
		Ok(subject) => subject,
		Err(e) => {
			tracing::warn!(error = %e, "Rejected bearer token");
			return APIError::invalid_token().into_response();
		},
	};

	let user = match resolve_identity(&state, &subject).await {
		Ok(user) => user,
		Err(LauncherError::InvalidToken) => {
			tracing::warn!(subject = %subject, "Token subject does not resolve to a user");
			return APIError::invalid_token().into_response();
		},
		Err(e) => {
			tracing::error!(error = %e, "Failed to resolve token subject");
			return APIError::from(e).into_response();
		},
	};

	request.extensions_mut().insert(CurrentUser(user));

	next.run(request).await
}

/// Maps a validated token subject to a user.
///
/// The master sentinel resolves to the synthetic master identity only while
/// simple login is enabled. `is_active` is not re-checked.
pub async fn resolve_identity(state: &AuthState, subject: &str) -> Result<User, LauncherError> {
	if subject == MASTER_SUBJECT {
		return state
			.master_identity
			.as_deref()
			.cloned()
			.ok_or(LauncherError::InvalidToken);
	}

	let users: Vec<User> = state.storage.load().await?;
	users
		.into_iter()
		.find(|user| user.user_id == subject)
		.ok_or(LauncherError::InvalidToken)
}

/// Extracts the bearer token from the Authorization header.
///
/// The scheme is matched case-insensitively; the token must be non-empty.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;
	let token = token.trim();
	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::Body,
		http::{HeaderValue, StatusCode},
		middleware::from_fn_with_state,
		routing::get,
		Extension, Json, Router,
	};
	use chrono::Utc;
	use launcher_storage::implementations::memory::MemoryStorage;
	use launcher_types::{AuthConfig, CorruptionPolicy, SecretString};
	use tower::ServiceExt;

	async fn whoami(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<String> {
		Json(user.user_id)
	}

	async fn auth_state(master_enabled: bool) -> AuthState {
		let config = AuthConfig {
			jwt_secret: SecretString::from("test-secret-key-at-least-32-chars"),
			bcrypt_cost: 4,
			..AuthConfig::default()
		};
		let storage = StorageService::new(Box::new(MemoryStorage::new()), CorruptionPolicy::Recover);
		storage
			.save(&vec![User {
				user_id: "u-1".into(),
				email: "a@x.com".into(),
				full_name: "A".into(),
				hashed_password: "$2b$04$invalid".into(),
				created_at: Utc::now(),
				is_active: false,
			}])
			.await
			.unwrap();

		AuthState {
			jwt_service: Arc::new(JwtService::new(&config).unwrap()),
			storage: Arc::new(storage),
			master_identity: master_enabled.then(|| Arc::new(User::master(Utc::now()))),
		}
	}

	fn create_test_app(state: AuthState) -> Router {
		Router::new()
			.route("/protected", get(whoami))
			.layer(from_fn_with_state(state, auth_middleware))
	}

	async fn call(app: Router, authorization: Option<String>) -> Response {
		let mut request = Request::builder().uri("/protected");
		if let Some(value) = authorization {
			request = request.header("Authorization", value);
		}
		app.oneshot(request.body(Body::empty()).unwrap())
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_middleware_with_valid_token() {
		let state = auth_state(true).await;
		let token = state.jwt_service.generate_access_token("u-1").unwrap();

		// Inactive users still resolve
		let response = call(create_test_app(state), Some(format!("Bearer {token}"))).await;
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_middleware_without_token() {
		let state = auth_state(true).await;
		let response = call(create_test_app(state), None).await;

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			response.headers().get(header::WWW_AUTHENTICATE),
			Some(&HeaderValue::from_static("Bearer"))
		);
	}

	#[tokio::test]
	async fn test_middleware_rejects_unknown_subject() {
		let state = auth_state(true).await;
		let token = state.jwt_service.generate_access_token("ghost").unwrap();

		let response = call(create_test_app(state), Some(format!("Bearer {token}"))).await;
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_middleware_rejects_wrong_scheme() {
		let state = auth_state(true).await;
		let token = state.jwt_service.generate_access_token("u-1").unwrap();

		let response = call(create_test_app(state), Some(format!("Basic {token}"))).await;
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_master_subject_depends_on_simple_login() {
		let enabled = auth_state(true).await;
		let token = enabled.jwt_service.generate_access_token(MASTER_SUBJECT).unwrap();
		let user = resolve_identity(&enabled, MASTER_SUBJECT).await.unwrap();
		assert_eq!(user.email, "master@launcher.local");

		let response = call(create_test_app(enabled), Some(format!("Bearer {token}"))).await;
		assert_eq!(response.status(), StatusCode::OK);

		let disabled = auth_state(false).await;
		let response = call(create_test_app(disabled), Some(format!("Bearer {token}"))).await;
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}

	#[test]
	fn test_extract_bearer_token() {
		let mut headers = HeaderMap::new();
		assert_eq!(extract_bearer_token(&headers), None);

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
		assert_eq!(extract_bearer_token(&headers), Some("abc"));

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc"));
		assert_eq!(extract_bearer_token(&headers), Some("abc"));

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
		assert_eq!(extract_bearer_token(&headers), None);

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc"));
		assert_eq!(extract_bearer_token(&headers), None);
	}
}
