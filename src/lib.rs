//! Custodian Server
//!
//! Equipment reservation and custody tracking: assets are requested for a
//! date window, approved without double-booking, handed out and returned with
//! a condition report. A REST JSON API exposes the whole lifecycle.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
