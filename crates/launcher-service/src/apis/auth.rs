//! Account endpoints: registration, login, master login and identity.

use crate::server::AppState;
use launcher_types::{
	timestamp, LauncherError, LoginRequest, RegisterRequest, SimpleLoginRequest, TokenResponse,
	User, UserResponse,
};
use uuid::Uuid;

const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";
const INCORRECT_PASSWORD: &str = "Incorrect password";

/// Creates an account and returns a token for it.
///
/// The email must not be registered yet; emails are compared exactly.
///
/// # Arguments
/// * `state` - Application state holding the store, hasher and token service
/// * `request` - Email, password and full name of the new account
///
/// # Returns
/// A bearer token for the new user, or `DuplicateEmail` / `Validation`
pub async fn register_user(
	state: &AppState,
	request: RegisterRequest,
) -> Result<TokenResponse, LauncherError> {
	request.validate()?;

	// Cheap early rejection before paying for bcrypt
	let users: Vec<User> = state.storage.load().await?;
	if users.iter().any(|user| user.email == request.email) {
		return Err(LauncherError::DuplicateEmail);
	}

	let hashed_password = state.passwords.hash(&request.password).await?;
	let user = User {
		user_id: Uuid::new_v4().to_string(),
		email: request.email,
		full_name: request.full_name,
		hashed_password,
		created_at: timestamp::now(),
		is_active: true,
	};
	let user_id = user.user_id.clone();

	state
		.storage
		.update(|users: &mut Vec<User>| {
			if users.iter().any(|existing| existing.email == user.email) {
				return Err(LauncherError::DuplicateEmail);
			}
			users.push(user);
			Ok(())
		})
		.await?;

	tracing::info!(user_id = %user_id, "Registered user");
	issue_token(state, &user_id)
}

/// Exchanges email and password for a token.
///
/// # Returns
/// A bearer token, or `InvalidCredentials` for an unknown email or a wrong
/// password alike
pub async fn login_user(
	state: &AppState,
	request: LoginRequest,
) -> Result<TokenResponse, LauncherError> {
	let users: Vec<User> = state.storage.load().await?;
	let Some(user) = users.into_iter().find(|user| user.email == request.email) else {
		tracing::warn!("Login attempt for unknown email");
		return Err(LauncherError::InvalidCredentials(INCORRECT_CREDENTIALS.to_string()));
	};

	if !state
		.passwords
		.verify(&request.password, &user.hashed_password)
		.await
	{
		tracing::warn!(user_id = %user.user_id, "Login attempt with wrong password");
		return Err(LauncherError::InvalidCredentials(INCORRECT_CREDENTIALS.to_string()));
	}

	tracing::info!(user_id = %user.user_id, "User logged in");
	issue_token(state, &user.user_id)
}

/// Exchanges the shared master password for a token bound to the master
/// identity. No user record is created.
pub fn simple_login(
	state: &AppState,
	request: SimpleLoginRequest,
) -> Result<TokenResponse, LauncherError> {
	let Some(master) = &state.auth.master_identity else {
		tracing::warn!("Simple login attempted while disabled");
		return Err(LauncherError::InvalidCredentials(INCORRECT_PASSWORD.to_string()));
	};

	let matches = state
		.config
		.auth
		.master_password
		.with_exposed(|expected| constant_time_eq(expected.as_bytes(), request.password.as_bytes()));
	if !matches {
		tracing::warn!("Simple login with wrong master password");
		return Err(LauncherError::InvalidCredentials(INCORRECT_PASSWORD.to_string()));
	}

	tracing::info!("Master session started");
	issue_token(state, &master.user_id)
}

/// Public view of the authenticated identity.
pub fn current_user(user: &User) -> UserResponse {
	UserResponse::from(user)
}

fn issue_token(state: &AppState, subject: &str) -> Result<TokenResponse, LauncherError> {
	let token = state.auth.jwt_service.generate_access_token(subject)?;
	Ok(TokenResponse::bearer(token))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
