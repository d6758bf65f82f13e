//! Launcher app CRUD endpoints.
//!
//! Apps are never physically removed. Delete clears `is_active`, and
//! inactive apps are hidden from every listing.

use crate::server::AppState;
use launcher_types::{timestamp, AppInput, LauncherApp, LauncherError, User};
use uuid::Uuid;

const APP_NOT_FOUND: &str = "App not found";

/// Creates an active app owned by `user`.
///
/// # Arguments
/// * `state` - Application state holding the store
/// * `user` - Authenticated owner
/// * `input` - Name, launch URL and optional fields of the app
///
/// # Returns
/// The stored app with its generated `app_id`
pub async fn create_app(
	state: &AppState,
	user: &User,
	input: AppInput,
) -> Result<LauncherApp, LauncherError> {
	input.validate()?;

	let app = LauncherApp::new(
		Uuid::new_v4().to_string(),
		user.user_id.clone(),
		input,
		timestamp::now(),
	);
	let created = app.clone();

	state
		.storage
		.update(|apps: &mut Vec<LauncherApp>| {
			apps.push(app);
			Ok::<_, LauncherError>(())
		})
		.await?;

	tracing::info!(user_id = %user.user_id, app_id = %created.app_id, "Created app");
	Ok(created)
}

/// Active apps owned by `user`, in storage order.
pub async fn list_apps(state: &AppState, user: &User) -> Result<Vec<LauncherApp>, LauncherError> {
	let apps: Vec<LauncherApp> = state.storage.load().await?;
	Ok(apps
		.into_iter()
		.filter(|app| app.is_visible_to(&user.user_id))
		.collect())
}

/// Overwrites the mutable fields of an app owned by `user`.
///
/// Inactive apps are matched as well, so an update can touch a deleted app.
pub async fn update_app(
	state: &AppState,
	user: &User,
	app_id: &str,
	input: AppInput,
) -> Result<LauncherApp, LauncherError> {
	input.validate()?;

	let updated = state
		.storage
		.update(|apps: &mut Vec<LauncherApp>| {
			let app = find_owned(apps, user, app_id)?;
			app.apply(input, timestamp::now());
			Ok::<_, LauncherError>(app.clone())
		})
		.await?;

	tracing::info!(user_id = %user.user_id, app_id = %app_id, "Updated app");
	Ok(updated)
}

/// Soft-deletes an app owned by `user`. Deleting twice succeeds twice.
pub async fn delete_app(state: &AppState, user: &User, app_id: &str) -> Result<(), LauncherError> {
	state
		.storage
		.update(|apps: &mut Vec<LauncherApp>| {
			find_owned(apps, user, app_id)?.is_active = false;
			Ok::<_, LauncherError>(())
		})
		.await?;

	tracing::info!(user_id = %user.user_id, app_id = %app_id, "Deleted app");
	Ok(())
}

fn find_owned<'a>(
	apps: &'a mut [LauncherApp],
	user: &User,
	app_id: &str,
) -> Result<&'a mut LauncherApp, LauncherError> {
	apps.iter_mut()
		.find(|app| app.app_id == app_id && app.user_id == user.user_id)
		.ok_or_else(|| {
			tracing::warn!(user_id = %user.user_id, app_id = %app_id, "App not found");
			LauncherError::NotFound(APP_NOT_FOUND.to_string())
		})
}
