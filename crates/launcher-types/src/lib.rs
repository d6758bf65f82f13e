//! Common types module for the launcher service.
//!
//! This crate defines the records persisted by the record store, the
//! request/response shapes of the HTTP API and the error taxonomy shared by
//! every other crate in the workspace.

/// API request/response types and the error taxonomy.
pub mod api;
/// Launcher application shortcut records.
pub mod app;
/// Authentication configuration and token claims.
pub mod auth;
/// Per-user preference records.
pub mod preferences;
/// Secure string type for handling sensitive data.
pub mod secret_string;
/// Collection keys for the record store.
pub mod storage;
/// Timestamp serialization compatible with previously persisted data.
pub mod timestamp;
/// User account records.
pub mod user;
/// Input bounds enforced at the API boundary.
pub mod validation;

pub use api::*;
pub use app::{AppInput, LauncherApp};
pub use auth::{AuthConfig, JwtClaims, MASTER_SUBJECT};
pub use preferences::{default_preferences, PreferenceMap, PreferenceRecord};
pub use secret_string::SecretString;
pub use storage::{Collection, CorruptionPolicy};
pub use user::{User, UserResponse};
pub use validation::ValidationError;
