//! Storage module for the launcher service.
//!
//! The record store holds three independent collections (users, apps and
//! preferences), each persisted as a single JSON document that is loaded and
//! rewritten wholesale. Backends only move raw bytes; [`StorageService`]
//! adds typed access, corruption handling and per-collection serialization of
//! read-modify-write cycles.

use async_trait::async_trait;
use launcher_config::{StorageBackend, StorageConfig};
use launcher_types::{
	Collection, CorruptionPolicy, LauncherApp, LauncherError, PreferenceRecord, User,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::Mutex;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// A collection document exists but cannot be parsed.
	#[error("Corrupt {collection} collection: {reason}")]
	Corrupt {
		collection: Collection,
		reason: String,
	},
}

impl From<StorageError> for LauncherError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::Corrupt { collection, .. } => {
				LauncherError::StorageCorrupt(collection.to_string())
			},
			other => LauncherError::Storage(other.to_string()),
		}
	}
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends store one opaque document per [`Collection`]. They do not parse
/// documents and do not serialize concurrent read-modify-write cycles; both
/// are handled by [`StorageService`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Returns the stored document, or `None` if it was never written.
	async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError>;

	/// Replaces the stored document.
	///
	/// Readers must observe either the previous or the new document, never a
	/// partial write.
	async fn write(&self, collection: Collection, value: Vec<u8>) -> Result<(), StorageError>;

	/// Moves the current document out of the way so it survives the next write.
	///
	/// Returns a description of where it was moved, or `None` if there was
	/// nothing to move.
	async fn quarantine(&self, collection: Collection) -> Result<Option<String>, StorageError>;

	/// Prepares the backend for use (directories, seed documents).
	async fn initialize(&self) -> Result<(), StorageError> {
		Ok(())
	}

	/// Short name reported by the health endpoint.
	fn backend_name(&self) -> &'static str;
}

/// Typed document stored in one collection.
pub trait CollectionDocument: Serialize + DeserializeOwned + Default + Send + 'static {
	const COLLECTION: Collection;
}

impl CollectionDocument for Vec<User> {
	const COLLECTION: Collection = Collection::Users;
}

impl CollectionDocument for Vec<LauncherApp> {
	const COLLECTION: Collection = Collection::Apps;
}

impl CollectionDocument for BTreeMap<String, PreferenceRecord> {
	const COLLECTION: Collection = Collection::Preferences;
}

/// Creates a storage backend from the given configuration.
pub fn create_storage_backend(config: &StorageConfig) -> Box<dyn StorageInterface> {
	match config.backend {
		StorageBackend::File => Box::new(implementations::file::FileStorage::new(
			config.data_dir.clone(),
		)),
		StorageBackend::Memory => Box::new(implementations::memory::MemoryStorage::new()),
	}
}

/// One async mutex per collection, held across a full load-modify-save cycle.
#[derive(Default)]
struct CollectionLocks {
	users: Mutex<()>,
	apps: Mutex<()>,
	preferences: Mutex<()>,
}

impl CollectionLocks {
	fn get(&self, collection: Collection) -> &Mutex<()> {
		match collection {
			Collection::Users => &self.users,
			Collection::Apps => &self.apps,
			Collection::Preferences => &self.preferences,
		}
	}
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for loading and saving whole collections with
/// automatic serialization/deserialization.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	on_corrupt: CorruptionPolicy,
	locks: CollectionLocks,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>, on_corrupt: CorruptionPolicy) -> Self {
		Self {
			backend,
			on_corrupt,
			locks: CollectionLocks::default(),
		}
	}

	/// Builds and initializes the configured backend.
	pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
		let service = Self::new(create_storage_backend(config), config.on_corrupt);
		service.initialize().await?;
		Ok(service)
	}

	pub async fn initialize(&self) -> Result<(), StorageError> {
		self.backend.initialize().await
	}

	pub fn backend_name(&self) -> &'static str {
		self.backend.backend_name()
	}

	/// Loads a whole collection.
	///
	/// A missing or blank document yields an empty collection.
	///
	/// # Returns
	/// The parsed collection, or `StorageError::Corrupt` when the document
	/// cannot be parsed under the `fail` policy
	pub async fn load<T: CollectionDocument>(&self) -> Result<T, StorageError> {
		let _guard = self.locks.get(T::COLLECTION).lock().await;
		self.load_unlocked().await
	}

	/// Overwrites a whole collection.
	pub async fn save<T: CollectionDocument>(&self, data: &T) -> Result<(), StorageError> {
		let _guard = self.locks.get(T::COLLECTION).lock().await;
		self.save_unlocked(data).await
	}

	/// Runs a read-modify-write cycle while holding the collection lock.
	///
	/// The collection is saved only if `mutate` returns `Ok`.
	///
	/// # Arguments
	/// * `mutate` - Closure applied to the loaded collection
	///
	/// # Returns
	/// Whatever `mutate` returned, once the collection has been saved
	pub async fn update<T, R, E, F>(&self, mutate: F) -> Result<R, E>
	where
		T: CollectionDocument,
		E: From<StorageError>,
		F: FnOnce(&mut T) -> Result<R, E>,
	{
		let _guard = self.locks.get(T::COLLECTION).lock().await;
		let mut data: T = self.load_unlocked().await?;
		let result = mutate(&mut data)?;
		self.save_unlocked(&data).await?;
		Ok(result)
	}

	async fn load_unlocked<T: CollectionDocument>(&self) -> Result<T, StorageError> {
		let collection = T::COLLECTION;
		let Some(bytes) = self.backend.read(collection).await? else {
			tracing::debug!(%collection, "Collection missing, using empty document");
			return Ok(T::default());
		};
		if bytes.iter().all(u8::is_ascii_whitespace) {
			tracing::debug!(%collection, "Collection blank, using empty document");
			return Ok(T::default());
		}

		match serde_json::from_slice::<T>(&bytes) {
			Ok(data) => {
				tracing::debug!(%collection, bytes = bytes.len(), "Loaded collection");
				Ok(data)
			},
			Err(e) => {
				tracing::error!(%collection, error = %e, "Collection document is corrupt");
				match self.on_corrupt {
					CorruptionPolicy::Recover => {
						let moved_to = self.backend.quarantine(collection).await?;
						tracing::warn!(
							%collection,
							moved_to = moved_to.as_deref().unwrap_or("-"),
							"Corrupt collection quarantined, continuing with an empty document"
						);
						Ok(T::default())
					},
					CorruptionPolicy::Fail => Err(StorageError::Corrupt {
						collection,
						reason: e.to_string(),
					}),
				}
			},
		}
	}

	async fn save_unlocked<T: CollectionDocument>(&self, data: &T) -> Result<(), StorageError> {
		let collection = T::COLLECTION;
		let bytes = serde_json::to_vec_pretty(data)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		tracing::debug!(%collection, bytes = bytes.len(), "Saving collection");
		self.backend.write(collection, bytes).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use implementations::memory::MemoryStorage;
	use launcher_types::{default_preferences, AppInput};
	use std::sync::Arc;

	/// The returned handle shares state with the service's backend.
	fn memory_service(policy: CorruptionPolicy) -> (StorageService, MemoryStorage) {
		let memory = MemoryStorage::new();
		let service = StorageService::new(Box::new(memory.clone()), policy);
		(service, memory)
	}

	fn app(user_id: &str, name: &str) -> LauncherApp {
		let input = AppInput {
			name: name.to_string(),
			description: String::new(),
			icon_url: None,
			launch_url: format!("{}://", name.to_lowercase()),
			category: "general".to_string(),
		};
		LauncherApp::new(format!("app-{name}"), user_id.to_string(), input, Utc::now())
	}

	#[tokio::test]
	async fn test_missing_collections_load_empty() {
		let (service, _) = memory_service(CorruptionPolicy::Recover);

		let users: Vec<User> = service.load().await.unwrap();
		let prefs: BTreeMap<String, PreferenceRecord> = service.load().await.unwrap();
		assert!(users.is_empty());
		assert!(prefs.is_empty());
	}

	#[tokio::test]
	async fn test_blank_document_is_missing_not_corrupt() {
		let (service, memory) = memory_service(CorruptionPolicy::Fail);
		memory.write(Collection::Apps, b"  \n".to_vec()).await.unwrap();

		let apps: Vec<LauncherApp> = service.load().await.unwrap();
		assert!(apps.is_empty());
	}

	#[tokio::test]
	async fn test_save_then_load_preserves_order() {
		let (service, memory) = memory_service(CorruptionPolicy::Recover);
		let apps = vec![app("u1", "Calc"), app("u1", "Mail"), app("u2", "Maps")];
		service.save(&apps).await.unwrap();

		let loaded: Vec<LauncherApp> = service.load().await.unwrap();
		let names: Vec<&str> = loaded.iter().map(|a| a.name.as_str()).collect();
		assert_eq!(names, ["Calc", "Mail", "Maps"]);

		let raw = memory.read(Collection::Apps).await.unwrap().unwrap();
		let text = String::from_utf8(raw).unwrap();
		assert!(text.starts_with("[\n  {"), "documents are pretty-printed");
	}

	#[tokio::test]
	async fn test_update_saves_only_on_success() {
		let (service, _) = memory_service(CorruptionPolicy::Recover);

		let result: Result<(), LauncherError> = service
			.update(|prefs: &mut BTreeMap<String, PreferenceRecord>| {
				prefs.insert(
					"u1".into(),
					PreferenceRecord::new("u1", default_preferences(), Utc::now()),
				);
				Err(LauncherError::NotFound("nope".into()))
			})
			.await;
		assert!(result.is_err());

		let prefs: BTreeMap<String, PreferenceRecord> = service.load().await.unwrap();
		assert!(prefs.is_empty());
	}

	#[tokio::test]
	async fn test_corrupt_collection_recovers_and_quarantines() {
		let (service, memory) = memory_service(CorruptionPolicy::Recover);
		memory.write(Collection::Users, b"[{\"user_id\":".to_vec()).await.unwrap();

		let users: Vec<User> = service.load().await.unwrap();
		assert!(users.is_empty());
		assert_eq!(
			memory.quarantined(Collection::Users).await,
			vec![b"[{\"user_id\":".to_vec()]
		);
		assert!(memory.read(Collection::Users).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_corrupt_collection_fails_under_fail_policy() {
		let (service, memory) = memory_service(CorruptionPolicy::Fail);
		memory.write(Collection::Apps, b"{not json".to_vec()).await.unwrap();

		let err = service.load::<Vec<LauncherApp>>().await.unwrap_err();
		assert!(matches!(
			err,
			StorageError::Corrupt {
				collection: Collection::Apps,
				..
			}
		));
		assert!(matches!(
			LauncherError::from(err),
			LauncherError::StorageCorrupt(_)
		));
		// Nothing was moved aside
		assert!(memory.read(Collection::Apps).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_wrong_shape_is_corrupt() {
		let (service, memory) = memory_service(CorruptionPolicy::Fail);
		memory.write(Collection::Preferences, b"[]".to_vec()).await.unwrap();

		let result = service.load::<BTreeMap<String, PreferenceRecord>>().await;
		assert!(matches!(result, Err(StorageError::Corrupt { .. })));
	}

	#[tokio::test]
	async fn test_concurrent_updates_do_not_lose_writes() {
		let (service, _) = memory_service(CorruptionPolicy::Recover);
		let service = Arc::new(service);

		let tasks = (0..25).map(|i| {
			let service = Arc::clone(&service);
			tokio::spawn(async move {
				service
					.update(|apps: &mut Vec<LauncherApp>| {
						apps.push(app("u1", &format!("App{i}")));
						Ok::<_, StorageError>(())
					})
					.await
			})
		});
		for result in futures::future::join_all(tasks).await {
			result.unwrap().unwrap();
		}

		let apps: Vec<LauncherApp> = service.load().await.unwrap();
		assert_eq!(apps.len(), 25);
	}

	#[tokio::test]
	async fn test_backend_write_failure_propagates() {
		let mut backend = MockStorageInterface::new();
		backend
			.expect_read()
			.returning(|_| Ok(Some(b"[]".to_vec())));
		backend
			.expect_write()
			.returning(|_, _| Err(StorageError::Backend("disk full".into())));

		let service = StorageService::new(Box::new(backend), CorruptionPolicy::Recover);
		let err = service
			.update(|apps: &mut Vec<LauncherApp>| {
				apps.push(app("u1", "Calc"));
				Ok::<_, StorageError>(())
			})
			.await
			.unwrap_err();

		assert!(matches!(err, StorageError::Backend(_)));
		assert!(matches!(LauncherError::from(err), LauncherError::Storage(_)));
	}

	#[tokio::test]
	async fn test_backend_name_passthrough() {
		let mut backend = MockStorageInterface::new();
		backend.expect_backend_name().return_const("mock");

		let service = StorageService::new(Box::new(backend), CorruptionPolicy::Recover);
		assert_eq!(service.backend_name(), "mock");
	}
}
