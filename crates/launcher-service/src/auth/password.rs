//! bcrypt password hashing.
//!
//! Hashing and verification are CPU-bound and run on the blocking pool so
//! they do not stall the async runtime.

use launcher_types::LauncherError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
	#[error("Failed to hash password: {0}")]
	Hash(String),
	#[error("Password task failed: {0}")]
	Task(String),
}

impl From<PasswordError> for LauncherError {
	fn from(err: PasswordError) -> Self {
		LauncherError::Internal(err.to_string())
	}
}

/// Hashes and verifies passwords with a fixed bcrypt work factor.
///
/// Each hash embeds its own random salt and cost, so hashes stay valid
/// across restarts and cost changes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
	cost: u32,
}

impl PasswordHasher {
	pub fn new(cost: u32) -> Self {
		Self { cost }
	}

	pub async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
		let plaintext = plaintext.to_owned();
		let cost = self.cost;
		tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
			.await
			.map_err(|e| PasswordError::Task(e.to_string()))?
			.map_err(|e| PasswordError::Hash(e.to_string()))
	}

	/// Returns whether `plaintext` matches `hash`.
	///
	/// A malformed stored hash is logged and treated as a mismatch.
	pub async fn verify(&self, plaintext: &str, hash: &str) -> bool {
		let plaintext = plaintext.to_owned();
		let hash = hash.to_owned();
		match tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash)).await {
			Ok(Ok(matches)) => matches,
			Ok(Err(e)) => {
				tracing::warn!(error = %e, "Stored password hash could not be verified");
				false
			},
			Err(e) => {
				tracing::error!(error = %e, "Password verification task failed");
				false
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_hash_and_verify() {
		let hasher = PasswordHasher::new(4);
		let hash = hasher.hash("correct horse").await.unwrap();

		assert_ne!(hash, "correct horse");
		assert!(hasher.verify("correct horse", &hash).await);
		assert!(!hasher.verify("correct horse!", &hash).await);
	}

	#[tokio::test]
	async fn test_hashes_are_salted() {
		let hasher = PasswordHasher::new(4);
		let first = hasher.hash("pw").await.unwrap();
		let second = hasher.hash("pw").await.unwrap();

		assert_ne!(first, second);
		assert!(hasher.verify("pw", &first).await);
		assert!(hasher.verify("pw", &second).await);
	}

	#[tokio::test]
	async fn test_verify_accepts_hash_with_other_cost() {
		let hash = PasswordHasher::new(5).hash("pw").await.unwrap();
		assert!(PasswordHasher::new(4).verify("pw", &hash).await);
	}

	#[tokio::test]
	async fn test_malformed_hash_is_a_mismatch() {
		let hasher = PasswordHasher::new(4);
		assert!(!hasher.verify("pw", "not-a-bcrypt-hash").await);
		assert!(!hasher.verify("pw", "").await);
	}
}
