//! Configuration module for the launcher service.
//!
//! Configuration is built once at startup and injected into the record store,
//! the token service and the HTTP server. It is read from environment
//! variables by default, or from a TOML file whose values may reference the
//! environment through `${VAR}` and `${VAR:-default}` placeholders.

use launcher_types::auth::{DEFAULT_JWT_SECRET, DEFAULT_MASTER_PASSWORD};
use launcher_types::{AuthConfig, CorruptionPolicy, SecretString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML or an environment value.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the launcher service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// Production mode tightens secret and CORS validation.
	#[serde(default)]
	pub production: bool,
	/// HTTP server settings.
	#[serde(default)]
	pub api: ApiConfig,
	/// Token, password and master-login settings.
	#[serde(default)]
	pub auth: AuthConfig,
	/// Record store settings.
	#[serde(default)]
	pub storage: StorageConfig,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration.
	#[serde(default)]
	pub cors: CorsConfig,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
			cors: CorsConfig::default(),
		}
	}
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins. `*` allows any origin without credentials.
	#[serde(default = "default_cors_origins")]
	pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
	fn default() -> Self {
		Self {
			allowed_origins: default_cors_origins(),
		}
	}
}

impl CorsConfig {
	pub fn allows_any_origin(&self) -> bool {
		self.allowed_origins.iter().any(|origin| origin == "*")
	}
}

/// Which record store implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	/// JSON documents in `data_dir`
	#[default]
	File,
	/// Process-local maps, lost on exit
	Memory,
}

impl FromStr for StorageBackend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"file" => Ok(Self::File),
			"memory" => Ok(Self::Memory),
			other => Err(format!("unknown storage backend: {other}")),
		}
	}
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	#[serde(default)]
	pub backend: StorageBackend,
	/// Directory holding the collection documents.
	#[serde(default = "default_data_dir")]
	pub data_dir: PathBuf,
	#[serde(default)]
	pub on_corrupt: CorruptionPolicy,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: StorageBackend::default(),
			data_dir: default_data_dir(),
			on_corrupt: CorruptionPolicy::default(),
		}
	}
}

fn default_api_host() -> String {
	"0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
	8001
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

fn default_cors_origins() -> Vec<String> {
	vec!["*".to_string()]
}

fn default_data_dir() -> PathBuf {
	PathBuf::from("./data")
}

const ALLOWED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];
const MAX_TOKEN_MINUTES: u64 = 7 * 24 * 60;

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars<F>(input: &str, lookup: F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();

		let value = match lookup(var_name) {
			Some(v) => v,
			None => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{var_name}' not found"
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

fn parse_env<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &str,
	default: T,
) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match lookup(key) {
		Some(raw) => raw
			.trim()
			.parse()
			.map_err(|e| ConfigError::Parse(format!("{key}={raw:?}: {e}"))),
		None => Ok(default),
	}
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" | "" => Ok(false),
		_ => Err(ConfigError::Parse(format!("{key}={raw:?}: expected a boolean"))),
	}
}

fn parse_origins(raw: &str) -> Vec<String> {
	raw.split(',')
		.map(str::trim)
		.filter(|origin| !origin.is_empty())
		.map(str::to_string)
		.collect()
}

impl Config {
	/// Builds the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds the configuration from an arbitrary variable source.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let production = match lookup("PRODUCTION") {
			Some(raw) => parse_bool("PRODUCTION", &raw)?,
			None => false,
		};

		let allowed_origins = lookup("CORS_ORIGINS")
			.map(|raw| parse_origins(&raw))
			.unwrap_or_else(default_cors_origins);

		let config = Config {
			production,
			api: ApiConfig {
				host: lookup("HOST").unwrap_or_else(default_api_host),
				port: parse_env(&lookup, "PORT", default_api_port())?,
				timeout_seconds: parse_env(&lookup, "API_TIMEOUT_SECONDS", default_api_timeout())?,
				max_request_size: parse_env(
					&lookup,
					"MAX_REQUEST_SIZE",
					default_max_request_size(),
				)?,
				cors: CorsConfig { allowed_origins },
			},
			auth: AuthConfig {
				jwt_secret: SecretString::new(
					lookup("JWT_SECRET_KEY").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
				),
				algorithm: lookup("JWT_ALGORITHM").unwrap_or_else(|| "HS256".to_string()),
				access_token_expire_minutes: parse_env(
					&lookup,
					"JWT_ACCESS_TOKEN_EXPIRE_MINUTES",
					30,
				)?,
				master_password: SecretString::new(
					lookup("MASTER_PASSWORD").unwrap_or_else(|| DEFAULT_MASTER_PASSWORD.to_string()),
				),
				bcrypt_cost: parse_env(&lookup, "BCRYPT_COST", 12)?,
			},
			storage: StorageConfig {
				backend: parse_env(&lookup, "STORAGE_BACKEND", StorageBackend::default())?,
				data_dir: lookup("DATA_DIR")
					.map(PathBuf::from)
					.unwrap_or_else(default_data_dir),
				on_corrupt: parse_env(&lookup, "STORAGE_ON_CORRUPT", CorruptionPolicy::default())?,
			},
		};

		config.finalize()
	}

	/// Loads configuration from a TOML file, resolving `${VAR}` placeholders
	/// against the process environment.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path.as_ref()).await?;
		contents.parse()
	}

	/// Applies production adjustments and validates the result.
	fn finalize(mut self) -> Result<Self, ConfigError> {
		if self.production && self.api.cors.allows_any_origin() {
			self.api.cors.allowed_origins.retain(|origin| origin != "*");
			if self.api.cors.allowed_origins.is_empty() {
				tracing::warn!("Wildcard CORS origin ignored in production; cross-origin requests are disabled");
			} else {
				tracing::warn!("Wildcard CORS origin ignored in production");
			}
		}
		self.validate()?;
		Ok(self)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		let auth = &self.auth;
		if auth.jwt_secret.is_empty() {
			return Err(ConfigError::Validation("JWT secret cannot be empty".into()));
		}
		if !ALLOWED_ALGORITHMS.contains(&auth.algorithm.as_str()) {
			return Err(ConfigError::Validation(format!(
				"Unsupported JWT algorithm '{}', expected one of {}",
				auth.algorithm,
				ALLOWED_ALGORITHMS.join(", ")
			)));
		}
		if auth.access_token_expire_minutes == 0 || auth.access_token_expire_minutes > MAX_TOKEN_MINUTES {
			return Err(ConfigError::Validation(format!(
				"Access token lifetime must be between 1 and {MAX_TOKEN_MINUTES} minutes"
			)));
		}
		if !(4..=31).contains(&auth.bcrypt_cost) {
			return Err(ConfigError::Validation(format!(
				"bcrypt cost must be between 4 and 31, got {}",
				auth.bcrypt_cost
			)));
		}

		if self.api.timeout_seconds == 0 {
			return Err(ConfigError::Validation("API timeout must be greater than zero".into()));
		}
		if self.api.max_request_size == 0 {
			return Err(ConfigError::Validation(
				"Maximum request size must be greater than zero".into(),
			));
		}

		if self.production {
			if auth.jwt_secret.expose_secret() == DEFAULT_JWT_SECRET {
				return Err(ConfigError::Validation(
					"The default JWT secret cannot be used in production".into(),
				));
			}
			if auth.master_password.expose_secret() == DEFAULT_MASTER_PASSWORD {
				return Err(ConfigError::Validation(
					"The default master password cannot be used in production".into(),
				));
			}
		}

		if self.storage.backend == StorageBackend::File
			&& self.storage.data_dir.as_os_str().is_empty()
		{
			return Err(ConfigError::Validation("Data directory cannot be empty".into()));
		}

		Ok(())
	}

	/// Socket address string the server binds to.
	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.api.host, self.api.port)
	}
}

/// Parses a TOML document. Environment variables are resolved and the
/// configuration is validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s, |key| std::env::var(key).ok())?;
		let config: Config = toml::from_str(&resolved)?;
		config.finalize()
	}
}
