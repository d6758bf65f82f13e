//! File-based storage backend for the launcher service.
//!
//! Each collection lives in its own JSON document inside the data directory
//! (`users.json`, `apps.json`, `preferences.json`). Writes go to a temporary
//! sibling that is renamed over the target. Every operation holds an advisory
//! lock on a per-collection `.lock` file so cooperating processes never see
//! each other's half-finished renames.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use launcher_types::Collection;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy)]
enum LockMode {
	Shared,
	Exclusive,
}

/// File-based storage implementation.
#[derive(Debug, Clone)]
pub struct FileStorage {
	/// Directory holding the collection documents.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	pub fn base_path(&self) -> &Path {
		&self.base_path
	}

	fn document_path(&self, collection: Collection) -> PathBuf {
		self.base_path.join(collection.file_name())
	}

	fn lock_path(&self, collection: Collection) -> PathBuf {
		self.base_path.join(format!("{}.lock", collection.as_str()))
	}

	fn temp_path(&self, collection: Collection) -> PathBuf {
		self.base_path.join(format!("{}.tmp", collection.file_name()))
	}

	/// Executes an operation while holding the collection's lock file.
	///
	/// The lock is released when the lock file handle is dropped.
	async fn with_lock<F, Fut, R>(
		&self,
		collection: Collection,
		mode: LockMode,
		operation: F,
	) -> Result<R, StorageError>
	where
		F: FnOnce() -> Fut,
		Fut: std::future::Future<Output = Result<R, StorageError>>,
	{
		fs::create_dir_all(&self.base_path).await.map_err(|e| {
			StorageError::Backend(format!("Failed to create data directory: {e}"))
		})?;

		let lock_path = self.lock_path(collection);
		let lock_file = tokio::task::spawn_blocking(move || {
			let lock_file = std::fs::OpenOptions::new()
				.create(true)
				.truncate(false)
				.read(true)
				.write(true)
				.open(&lock_path)
				.map_err(|e| StorageError::Backend(format!("Failed to open lock file: {e}")))?;

			let locked = match mode {
				LockMode::Shared => FileExt::lock_shared(&lock_file),
				LockMode::Exclusive => FileExt::lock_exclusive(&lock_file),
			};
			locked.map_err(|e| StorageError::Backend(format!("Failed to acquire lock: {e}")))?;

			Ok::<_, StorageError>(lock_file)
		})
		.await
		.map_err(|e| StorageError::Backend(format!("Failed to spawn blocking task: {e}")))??;

		let result = operation().await;
		drop(lock_file);
		result
	}

	/// Picks a `<file>.corrupt-<micros>` name that no earlier quarantine has
	/// taken, appending `-<n>` on collision. Must run under the exclusive lock.
	async fn quarantine_target(&self, collection: Collection) -> Result<PathBuf, StorageError> {
		let stem = format!(
			"{}.corrupt-{}",
			collection.file_name(),
			Utc::now().timestamp_micros()
		);

		let mut candidate = self.base_path.join(&stem);
		let mut suffix = 1u32;
		while fs::try_exists(&candidate).await.map_err(|e| {
			StorageError::Backend(format!("Failed to check {}: {e}", candidate.display()))
		})? {
			candidate = self.base_path.join(format!("{stem}-{suffix}"));
			suffix += 1;
		}
		Ok(candidate)
	}

	/// Writes `value` to a temporary sibling and renames it over the target.
	async fn replace_document(
		&self,
		collection: Collection,
		value: &[u8],
	) -> Result<(), StorageError> {
		let path = self.document_path(collection);
		let temp_path = self.temp_path(collection);

		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(format!("Failed to write {}: {e}", temp_path.display())))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(format!("Failed to replace {}: {e}", path.display())))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
		let path = self.document_path(collection);

		self.with_lock(collection, LockMode::Shared, || async {
			match fs::read(&path).await {
				Ok(data) => Ok(Some(data)),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
				Err(e) => Err(StorageError::Backend(format!(
					"Failed to read {}: {e}",
					path.display()
				))),
			}
		})
		.await
	}

	async fn write(&self, collection: Collection, value: Vec<u8>) -> Result<(), StorageError> {
		self.with_lock(collection, LockMode::Exclusive, || {
			self.replace_document(collection, &value)
		})
		.await
	}

	async fn quarantine(&self, collection: Collection) -> Result<Option<String>, StorageError> {
		let path = self.document_path(collection);

		self.with_lock(collection, LockMode::Exclusive, || async {
			let target = self.quarantine_target(collection).await?;
			match fs::rename(&path, &target).await {
				Ok(()) => Ok(Some(target.display().to_string())),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
				Err(e) => Err(StorageError::Backend(format!(
					"Failed to quarantine {}: {e}",
					path.display()
				))),
			}
		})
		.await
	}

	/// Creates the data directory and seeds missing documents with empty
	/// collections of the right shape. Existing documents are left untouched.
	async fn initialize(&self) -> Result<(), StorageError> {
		for collection in Collection::all() {
			let path = self.document_path(collection);
			self.with_lock(collection, LockMode::Exclusive, || async {
				let exists = fs::try_exists(&path)
					.await
					.map_err(|e| StorageError::Backend(e.to_string()))?;
				if !exists {
					tracing::info!(path = %path.display(), "Seeding empty collection");
					self.replace_document(collection, collection.empty_document())
						.await?;
				}
				Ok(())
			})
			.await?;
		}
		Ok(())
	}

	fn backend_name(&self) -> &'static str {
		"json_files"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn create_test_storage() -> (FileStorage, TempDir) {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileStorage::new(temp_dir.path().join("data"));
		(storage, temp_dir)
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let (storage, _temp_dir) = create_test_storage();

		assert!(storage.read(Collection::Apps).await.unwrap().is_none());

		storage
			.write(Collection::Apps, b"[1]".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.read(Collection::Apps).await.unwrap().unwrap(),
			b"[1]".to_vec()
		);

		// Overwrite
		storage
			.write(Collection::Apps, b"[1,2]".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.read(Collection::Apps).await.unwrap().unwrap(),
			b"[1,2]".to_vec()
		);

		// No temp file left behind
		assert!(!storage.temp_path(Collection::Apps).exists());
		assert!(storage.base_path().join("apps.json").exists());
	}

	#[tokio::test]
	async fn test_initialize_seeds_missing_documents_only() {
		let (storage, _temp_dir) = create_test_storage();
		std::fs::create_dir_all(storage.base_path()).unwrap();
		std::fs::write(storage.base_path().join("users.json"), b"[{\"keep\":true}]").unwrap();

		storage.initialize().await.unwrap();

		let users = std::fs::read(storage.base_path().join("users.json")).unwrap();
		let apps = std::fs::read(storage.base_path().join("apps.json")).unwrap();
		let prefs = std::fs::read(storage.base_path().join("preferences.json")).unwrap();
		assert_eq!(users, b"[{\"keep\":true}]".to_vec());
		assert_eq!(apps, b"[]".to_vec());
		assert_eq!(prefs, b"{}".to_vec());

		// Idempotent
		storage.initialize().await.unwrap();
	}

	#[tokio::test]
	async fn test_quarantine_moves_document_aside() {
		let (storage, _temp_dir) = create_test_storage();
		storage
			.write(Collection::Preferences, b"{broken".to_vec())
			.await
			.unwrap();

		let moved_to = storage
			.quarantine(Collection::Preferences)
			.await
			.unwrap()
			.unwrap();
		assert!(moved_to.contains("preferences.json.corrupt-"));
		assert_eq!(std::fs::read(&moved_to).unwrap(), b"{broken".to_vec());
		assert!(storage.read(Collection::Preferences).await.unwrap().is_none());

		// Nothing left to move
		assert!(storage
			.quarantine(Collection::Preferences)
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_repeated_quarantine_keeps_every_document() {
		let (storage, _temp_dir) = create_test_storage();

		storage
			.write(Collection::Users, b"first-corrupt".to_vec())
			.await
			.unwrap();
		let first = storage.quarantine(Collection::Users).await.unwrap().unwrap();

		storage
			.write(Collection::Users, b"second-corrupt".to_vec())
			.await
			.unwrap();
		let second = storage.quarantine(Collection::Users).await.unwrap().unwrap();

		assert_ne!(first, second);
		assert_eq!(std::fs::read(&first).unwrap(), b"first-corrupt".to_vec());
		assert_eq!(std::fs::read(&second).unwrap(), b"second-corrupt".to_vec());

		let quarantined = std::fs::read_dir(storage.base_path())
			.unwrap()
			.filter_map(Result::ok)
			.filter(|entry| {
				entry
					.file_name()
					.to_string_lossy()
					.starts_with("users.json.corrupt-")
			})
			.count();
		assert_eq!(quarantined, 2);
	}

	#[tokio::test]
	async fn test_quarantine_target_skips_taken_names() {
		let (storage, _temp_dir) = create_test_storage();
		std::fs::create_dir_all(storage.base_path()).unwrap();

		let first = storage.quarantine_target(Collection::Apps).await.unwrap();
		std::fs::write(&first, b"taken").unwrap();
		let taken = first.to_string_lossy().into_owned();
		std::fs::write(format!("{taken}-1"), b"taken").unwrap();

		// Same microsecond or a later one: never an existing file
		let next = storage.quarantine_target(Collection::Apps).await.unwrap();
		assert!(!next.exists());
		assert_ne!(next, first);
	}

	#[tokio::test]
	async fn test_concurrent_writes_leave_a_whole_document() {
		let (storage, _temp_dir) = create_test_storage();

		let writes = (0..10).map(|i| {
			let storage = storage.clone();
			async move {
				let doc = serde_json::to_vec(&vec![i; 100]).unwrap();
				storage.write(Collection::Users, doc).await
			}
		});
		for result in futures::future::join_all(writes).await {
			result.unwrap();
		}

		let bytes = storage.read(Collection::Users).await.unwrap().unwrap();
		let doc: Vec<i32> = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(doc.len(), 100);
		assert!(doc.iter().all(|v| *v == doc[0]));
	}

	#[tokio::test]
	async fn test_service_over_files_recovers_from_corruption() {
		use crate::StorageService;
		use launcher_types::{CorruptionPolicy, User};

		let (storage, _temp_dir) = create_test_storage();
		let base = storage.base_path().to_path_buf();
		let service = StorageService::new(Box::new(storage), CorruptionPolicy::Recover);
		service.initialize().await.unwrap();
		std::fs::write(base.join("users.json"), b"not json").unwrap();

		let users: Vec<User> = service.load().await.unwrap();
		assert!(users.is_empty());

		let quarantined: Vec<_> = std::fs::read_dir(&base)
			.unwrap()
			.filter_map(Result::ok)
			.filter(|entry| {
				entry
					.file_name()
					.to_string_lossy()
					.starts_with("users.json.corrupt-")
			})
			.collect();
		assert_eq!(quarantined.len(), 1);
	}
}
