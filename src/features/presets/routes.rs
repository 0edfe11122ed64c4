use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::presets::handlers::{self, PresetState};
use crate::features::presets::models::PresetKind;
use crate::features::presets::services::PresetService;

fn preset_routes(base: &str, service: Arc<PresetService>, kind: PresetKind) -> Router {
    Router::new()
        .route(
            base,
            get(handlers::list_presets).post(handlers::create_preset),
        )
        .route(
            &format!("{}/inicializar", base),
            post(handlers::initialize_presets),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(handlers::get_preset)
                .put(handlers::update_preset)
                .delete(handlers::delete_preset),
        )
        .route(
            &format!("{}/{{id}}/uso", base),
            post(handlers::record_preset_usage),
        )
        .with_state(PresetState { service, kind })
}

/// Contract templates
pub fn contract_routes(service: Arc<PresetService>) -> Router {
    preset_routes("/api/contratos", service, PresetKind::Contract)
}

/// Report templates
pub fn report_routes(service: Arc<PresetService>) -> Router {
    preset_routes("/api/relatorios", service, PresetKind::Report)
}
