//! HTTP server for the launcher API.
//!
//! Builds the axum router, wires the authentication middleware in front of
//! the protected routes and runs the server until Ctrl-C.

use crate::{
	apis::{self, ApiJson},
	auth::{auth_middleware, AuthError, AuthState, CurrentUser, JwtService, PasswordHasher},
};
use axum::{
	extract::{DefaultBodyLimit, Extension, Path, State},
	http::{header, HeaderValue, Method, StatusCode},
	middleware,
	response::Json,
	routing::{get, post, put},
	Router, ServiceExt,
};
use chrono::Utc;
use launcher_config::{ApiConfig, Config, CorsConfig};
use launcher_storage::{StorageError, StorageService};
use launcher_types::{
	APIError, AppInput, HealthResponse, LauncherApp, LauncherInfo, LoginRequest, MessageResponse,
	PreferenceMap, RegisterRequest, RootResponse, SimpleLoginRequest, TokenResponse, User,
	UserResponse,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
	cors::{Any, CorsLayer},
	normalize_path::NormalizePath,
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Complete configuration.
	pub config: Config,
	/// Record store for users, apps and preferences.
	pub storage: Arc<StorageService>,
	/// bcrypt hasher at the configured cost.
	pub passwords: PasswordHasher,
	/// Token service and identity resolution, shared with the middleware.
	pub auth: AuthState,
}

/// Errors raised while assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Auth error: {0}")]
	Auth(#[from] AuthError),
}

impl AppState {
	/// Assembles the state from configuration and an initialized store.
	pub fn new(config: Config, storage: StorageService) -> Result<Self, AuthError> {
		let storage = Arc::new(storage);
		let jwt_service = Arc::new(JwtService::new(&config.auth)?);

		let master_identity = if config.auth.master_login_enabled() {
			Some(Arc::new(User::master(Utc::now())))
		} else {
			tracing::info!("Master password not set; simple login disabled");
			None
		};

		Ok(Self {
			passwords: PasswordHasher::new(config.auth.bcrypt_cost),
			auth: AuthState {
				jwt_service,
				storage: Arc::clone(&storage),
				master_identity,
			},
			storage,
			config,
		})
	}

	/// Opens and initializes the configured store, then assembles the state.
	pub async fn from_config(config: Config) -> Result<Self, StartupError> {
		let storage = StorageService::from_config(&config.storage).await?;
		tracing::info!(backend = storage.backend_name(), "Storage initialized");
		Ok(Self::new(config, storage)?)
	}
}

/// Builds the API router with every route and layer attached.
pub fn build_router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/api/auth/me", get(handle_me))
		.route("/api/launcher-info", get(handle_launcher_info))
		.route(
			"/api/launcher-apps",
			get(handle_list_apps).post(handle_create_app),
		)
		.route(
			"/api/launcher-apps/{app_id}",
			put(handle_update_app).delete(handle_delete_app),
		)
		.route("/api/user/preferences", put(handle_update_preferences))
		.route_layer(middleware::from_fn_with_state(
			state.auth.clone(),
			auth_middleware,
		));

	let public = Router::new()
		.route("/", get(handle_root))
		.route("/api/health", get(handle_health))
		.route("/api/auth/register", post(handle_register))
		.route("/api/auth/login", post(handle_login))
		.route("/api/auth/simple-login", post(handle_simple_login));

	let routes = public.merge(protected);
	with_http_layers(routes, &state.config.api).with_state(state)
}

/// Applies the body limit, request timeout, CORS and tracing layers.
fn with_http_layers<S>(router: Router<S>, api: &ApiConfig) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	let timeout = Duration::from_secs(api.timeout_seconds);

	router
		.layer(DefaultBodyLimit::max(api.max_request_size))
		.layer(TimeoutLayer::with_status_code(
			StatusCode::REQUEST_TIMEOUT,
			timeout,
		))
		.layer(cors_layer(&api.cors))
		.layer(TraceLayer::new_for_http())
}

/// Router wrapped so that trailing slashes are ignored.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
	NormalizePath::trim_trailing_slash(build_router(state))
}

/// Starts the HTTP server and serves until Ctrl-C.
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	let bind_address = config.bind_address();
	let production = config.production;
	let state = AppState::from_config(config).await?;

	let app = build_app(state);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!(production, "Launcher API server starting on {}", bind_address);

	let service = ServiceExt::<axum::extract::Request>::into_make_service(app);
	axum::serve(listener, service)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("Launcher API server stopped");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
		return;
	}
	tracing::info!("Shutdown signal received");
}

/// Wildcard origins allow anything without credentials; explicit origins
/// allow credentials.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
	if config.allows_any_origin() {
		return CorsLayer::new()
			.allow_origin(Any)
			.allow_methods(Any)
			.allow_headers(Any);
	}

	let origins: Vec<HeaderValue> = config
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(origins)
		.allow_credentials(true)
		.allow_methods([
			Method::GET,
			Method::POST,
			Method::PUT,
			Method::DELETE,
			Method::OPTIONS,
		])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn handle_root(State(state): State<AppState>) -> Json<RootResponse> {
	Json(apis::health::root(&state))
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(apis::health::health(&state))
}

/// Handles POST /api/auth/register requests.
async fn handle_register(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<TokenResponse>, APIError> {
	match apis::auth::register_user(&state, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Registration failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles POST /api/auth/login requests.
async fn handle_login(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, APIError> {
	apis::auth::login_user(&state, request)
		.await
		.map(Json)
		.map_err(APIError::from)
}

/// Handles POST /api/auth/simple-login requests.
async fn handle_simple_login(
	State(state): State<AppState>,
	ApiJson(request): ApiJson<SimpleLoginRequest>,
) -> Result<Json<TokenResponse>, APIError> {
	apis::auth::simple_login(&state, request)
		.map(Json)
		.map_err(APIError::from)
}

async fn handle_me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
	Json(apis::auth::current_user(&user))
}

/// Handles GET /api/launcher-info requests.
async fn handle_launcher_info(
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<LauncherInfo>, APIError> {
	match apis::launcher::get_launcher_info(&state, &user).await {
		Ok(info) => Ok(Json(info)),
		Err(e) => {
			tracing::warn!(user_id = %user.user_id, "Launcher info failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

async fn handle_list_apps(
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<LauncherApp>>, APIError> {
	match apis::apps::list_apps(&state, &user).await {
		Ok(apps) => Ok(Json(apps)),
		Err(e) => {
			tracing::warn!(user_id = %user.user_id, "Listing apps failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

async fn handle_create_app(
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
	ApiJson(input): ApiJson<AppInput>,
) -> Result<Json<LauncherApp>, APIError> {
	match apis::apps::create_app(&state, &user, input).await {
		Ok(app) => Ok(Json(app)),
		Err(e) => {
			tracing::warn!(user_id = %user.user_id, "App creation failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles PUT /api/launcher-apps/{app_id} requests.
async fn handle_update_app(
	Path(app_id): Path<String>,
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
	ApiJson(input): ApiJson<AppInput>,
) -> Result<Json<LauncherApp>, APIError> {
	apis::apps::update_app(&state, &user, &app_id, input)
		.await
		.map(Json)
		.map_err(APIError::from)
}

/// Handles DELETE /api/launcher-apps/{app_id} requests.
async fn handle_delete_app(
	Path(app_id): Path<String>,
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, APIError> {
	apis::apps::delete_app(&state, &user, &app_id)
		.await
		.map_err(APIError::from)?;
	Ok(Json(MessageResponse::new("App deleted successfully")))
}

/// Handles PUT /api/user/preferences requests.
async fn handle_update_preferences(
	State(state): State<AppState>,
	Extension(CurrentUser(user)): Extension<CurrentUser>,
	ApiJson(preferences): ApiJson<PreferenceMap>,
) -> Result<Json<MessageResponse>, APIError> {
	if let Err(e) = apis::preferences::update_preferences(&state, &user, preferences).await {
		tracing::warn!(user_id = %user.user_id, "Preference update failed: {}", e);
		return Err(APIError::from(e));
	}
	Ok(Json(MessageResponse::new("Preferences updated successfully")))
}
