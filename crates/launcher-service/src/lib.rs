//! Launcher Service Library
//!
//! This library provides the core functionality for the launcher API service,
//! including API handlers, authentication, and server components.

pub mod apis;
pub mod auth;
pub mod server;

pub use server::{build_app, build_router, start_server, AppState};
