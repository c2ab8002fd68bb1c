//! Admin listener.
//!
//! # Responsibilities
//! - Report gateway status
//! - Expose static metadata diagnostics (raw sources, merged maps, location)
//!
//! # Design Decisions
//! - Separate listener and router from the data path
//! - Every route requires the configured bearer token

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_metadata, get_status};
use crate::config::GatewayConfig;
use crate::metadata::{ServiceIdentity, StaticMetadataManager};

#[derive(Debug, Clone)]
pub struct AdminState {
    pub api_key: Arc<str>,
    pub statics: Arc<StaticMetadataManager>,
    pub identity: ServiceIdentity,
    pub routes: usize,
    pub services: usize,
    pub label_rules: usize,
}

impl AdminState {
    pub fn new(config: &GatewayConfig, statics: Arc<StaticMetadataManager>) -> Self {
        Self {
            api_key: Arc::from(config.admin.api_key.as_str()),
            statics,
            identity: config.service.clone(),
            routes: config.routes.len(),
            services: config.services.len(),
            label_rules: config.router.rules.len(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/metadata", get(get_metadata))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
