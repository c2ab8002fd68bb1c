use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::metadata::{Location, MetadataMap, ServiceIdentity};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub service: ServiceIdentity,
    pub routes: usize,
    pub services: usize,
    pub label_rules: usize,
}

/// Static metadata diagnostics.
#[derive(Serialize)]
pub struct StaticMetadataSnapshot {
    pub env: MetadataMap,
    pub env_transitive: MetadataMap,
    pub env_disposable: MetadataMap,
    pub config: MetadataMap,
    pub config_transitive: MetadataMap,
    pub config_disposable: MetadataMap,
    pub merged: MetadataMap,
    pub merged_transitive: MetadataMap,
    pub merged_disposable: MetadataMap,
    pub location: Location,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        service: state.identity.clone(),
        routes: state.routes,
        services: state.services,
        label_rules: state.label_rules,
    })
}

pub async fn get_metadata(State(state): State<AdminState>) -> Json<StaticMetadataSnapshot> {
    let statics = &state.statics;
    Json(StaticMetadataSnapshot {
        env: MetadataMap::clone(statics.env_metadata()),
        env_transitive: MetadataMap::clone(statics.env_transitive_metadata()),
        env_disposable: MetadataMap::clone(statics.env_disposable_metadata()),
        config: MetadataMap::clone(statics.config_metadata()),
        config_transitive: MetadataMap::clone(statics.config_transitive_metadata()),
        config_disposable: MetadataMap::clone(statics.config_disposable_metadata()),
        merged: MetadataMap::clone(statics.merged_metadata()),
        merged_transitive: MetadataMap::clone(statics.merged_transitive_metadata()),
        merged_disposable: MetadataMap::clone(statics.merged_disposable_metadata()),
        location: statics.location().clone(),
    })
}
