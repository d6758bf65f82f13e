//! Liveness endpoints for the launcher API.
//!
//! # Endpoints
//!
//! - `GET /` - Service banner with version and storage backend
//! - `GET /api/health` - Health check with a server timestamp

use crate::server::AppState;
use chrono::Utc;
use launcher_types::{HealthResponse, RootResponse};

/// GET / - Service banner.
///
/// # Response
///
/// ```json
/// {
///   "message": "Launcher API is running",
///   "version": "1.0.0",
///   "storage": "json_files"
/// }
/// ```
pub fn root(state: &AppState) -> RootResponse {
	RootResponse {
		message: "Launcher API is running".to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		storage: state.storage.backend_name().to_string(),
	}
}

/// GET /api/health - Health check.
///
/// Always reports `healthy` while the process can serve requests. Storage
/// problems surface on the endpoints that touch it.
pub fn health(state: &AppState) -> HealthResponse {
	HealthResponse {
		status: "healthy".to_string(),
		timestamp: Utc::now(),
		storage: state.storage.backend_name().to_string(),
		production: state.config.production,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::server::test_support::{test_config, test_state};

	#[tokio::test]
	async fn test_root_reports_backend() {
		let state = test_state(test_config()).await;
		let banner = root(&state);
		assert_eq!(banner.message, "Launcher API is running");
		assert_eq!(banner.version, "1.0.0");
		assert_eq!(banner.storage, "memory");
	}

	#[tokio::test]
	async fn test_health_is_healthy() {
		let state = test_state(test_config()).await;
		let before = Utc::now();
		let report = health(&state);
		assert_eq!(report.status, "healthy");
		assert!(!report.production);
		assert!(report.timestamp >= before);
	}
}
