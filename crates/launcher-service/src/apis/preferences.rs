//! Preference replacement endpoint.

use crate::server::AppState;
use launcher_types::{timestamp, LauncherError, PreferenceMap, PreferenceRecord, User};
use std::collections::BTreeMap;

/// Replaces the stored preferences of `user` wholesale. No merging.
///
/// # Arguments
/// * `state` - Application state holding the store
/// * `user` - Authenticated owner of the preferences
/// * `preferences` - New preference object, bounded in keys and size
pub async fn update_preferences(
	state: &AppState,
	user: &User,
	preferences: PreferenceMap,
) -> Result<(), LauncherError> {
	preferences.validate()?;

	let keys = preferences.len();
	state
		.storage
		.update(|prefs: &mut BTreeMap<String, PreferenceRecord>| {
			prefs.insert(
				user.user_id.clone(),
				PreferenceRecord::new(user.user_id.clone(), preferences, timestamp::now()),
			);
			Ok::<_, LauncherError>(())
		})
		.await?;

	tracing::info!(user_id = %user.user_id, keys, "Updated preferences");
	Ok(())
}
