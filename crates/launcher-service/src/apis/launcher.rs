//! Aggregate launcher view: a user's active apps plus their preferences.

use crate::server::AppState;
use launcher_types::{
	default_preferences, timestamp, LauncherApp, LauncherError, LauncherInfo, PreferenceRecord,
	User,
};
use std::collections::BTreeMap;

/// Builds the launcher view for `user`.
///
/// A user without stored preferences gets the defaults, which are persisted
/// on this first read.
pub async fn get_launcher_info(state: &AppState, user: &User) -> Result<LauncherInfo, LauncherError> {
	let apps: Vec<LauncherApp> = state.storage.load().await?;
	let apps = apps
		.into_iter()
		.filter(|app| app.is_visible_to(&user.user_id))
		.collect();

	let record = load_or_create_preferences(state, user).await?;

	Ok(LauncherInfo {
		user_id: user.user_id.clone(),
		preferences: record.preferences,
		apps,
		last_updated: record.last_updated,
	})
}

async fn load_or_create_preferences(
	state: &AppState,
	user: &User,
) -> Result<PreferenceRecord, LauncherError> {
	let stored: BTreeMap<String, PreferenceRecord> = state.storage.load().await?;
	if let Some(record) = stored.get(&user.user_id) {
		return Ok(record.clone());
	}

	// Re-checked under the collection lock in case of a concurrent write
	state
		.storage
		.update(|prefs: &mut BTreeMap<String, PreferenceRecord>| {
			let record = prefs.entry(user.user_id.clone()).or_insert_with(|| {
				tracing::info!(user_id = %user.user_id, "Created default preferences");
				PreferenceRecord::new(user.user_id.clone(), default_preferences(), timestamp::now())
			});
			Ok::<_, LauncherError>(record.clone())
		})
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use crate::apis::{apps, preferences};
	use crate::server::test_support::{test_config, test_state};
	use launcher_types::{AppInput, PreferenceMap};
	use serde_json::json;

	#[tokio::test]
	async fn test_first_read_persists_defaults() {
		let state = test_state(test_config()).await;
		let user = User::master(Utc::now());

		let info = get_launcher_info(&state, &user).await.unwrap();
		assert_eq!(info.user_id, "master_user");
		assert!(info.apps.is_empty());
		assert_eq!(info.preferences, default_preferences());

		let stored: BTreeMap<String, PreferenceRecord> = state.storage.load().await.unwrap();
		assert_eq!(stored["master_user"].preferences, default_preferences());

		// Second read returns the stored record unchanged
		let again = get_launcher_info(&state, &user).await.unwrap();
		assert_eq!(again.last_updated, info.last_updated);
	}

	#[tokio::test]
	async fn test_view_reflects_apps_and_preferences() {
		let state = test_state(test_config()).await;
		let user = User::master(Utc::now());

		let calc = apps::create_app(
			&state,
			&user,
			AppInput {
				name: "Calc".into(),
				description: String::new(),
				icon_url: None,
				launch_url: "calc://".into(),
				category: "general".into(),
			},
		)
		.await
		.unwrap();
		let mail = apps::create_app(
			&state,
			&user,
			AppInput {
				name: "Mail".into(),
				description: String::new(),
				icon_url: None,
				launch_url: "mail://".into(),
				category: "general".into(),
			},
		)
		.await
		.unwrap();
		apps::delete_app(&state, &user, &mail.app_id).await.unwrap();

		let custom: PreferenceMap = serde_json::from_value(json!({ "theme": "light" })).unwrap();
		preferences::update_preferences(&state, &user, custom.clone())
			.await
			.unwrap();

		let info = get_launcher_info(&state, &user).await.unwrap();
		assert_eq!(info.apps, vec![calc]);
		assert_eq!(info.preferences, custom);
	}
}
