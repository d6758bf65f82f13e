//! In-memory storage backend for the launcher service.
//!
//! Useful for tests and ephemeral runs where persistence is not required.
//! Data is lost on restart. Clones share the same underlying store.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use launcher_types::Collection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
	documents: HashMap<Collection, Vec<u8>>,
	quarantined: HashMap<Collection, Vec<Vec<u8>>>,
}

/// In-memory storage implementation.
#[derive(Clone, Default)]
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self::default()
	}

	/// Documents moved aside by [`StorageInterface::quarantine`], oldest first.
	pub async fn quarantined(&self, collection: Collection) -> Vec<Vec<u8>> {
		self.state
			.read()
			.await
			.quarantined
			.get(&collection)
			.cloned()
			.unwrap_or_default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
		Ok(self.state.read().await.documents.get(&collection).cloned())
	}

	async fn write(&self, collection: Collection, value: Vec<u8>) -> Result<(), StorageError> {
		self.state.write().await.documents.insert(collection, value);
		Ok(())
	}

	async fn quarantine(&self, collection: Collection) -> Result<Option<String>, StorageError> {
		let mut state = self.state.write().await;
		let Some(document) = state.documents.remove(&collection) else {
			return Ok(None);
		};
		let slot = state.quarantined.entry(collection).or_default();
		slot.push(document);
		Ok(Some(format!("memory:{}#{}", collection, slot.len())))
	}

	fn backend_name(&self) -> &'static str {
		"memory"
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();
		assert!(storage.read(Collection::Users).await.unwrap().is_none());

		storage
			.write(Collection::Users, b"[]".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.read(Collection::Users).await.unwrap(),
			Some(b"[]".to_vec())
		);

		// Collections are independent
		assert!(storage.read(Collection::Apps).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_clones_share_state() {
		let storage = MemoryStorage::new();
		let other = storage.clone();

		other.write(Collection::Apps, b"[1]".to_vec()).await.unwrap();
		assert_eq!(
			storage.read(Collection::Apps).await.unwrap(),
			Some(b"[1]".to_vec())
		);
	}

	#[tokio::test]
	async fn test_quarantine() {
		let storage = MemoryStorage::new();
		assert!(storage.quarantine(Collection::Apps).await.unwrap().is_none());

		storage.write(Collection::Apps, b"{".to_vec()).await.unwrap();
		let location = storage.quarantine(Collection::Apps).await.unwrap();
		assert_eq!(location.as_deref(), Some("memory:apps#1"));
		assert!(storage.read(Collection::Apps).await.unwrap().is_none());
		assert_eq!(storage.quarantined(Collection::Apps).await, vec![b"{".to_vec()]);
	}
}
