use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::report_builder::handlers;
use crate::features::report_builder::services::ReportSessionService;

const BASE: &str = "/api/relatorio-tecnico/sessoes";

/// Report session routes; `body_limit` caps photo upload requests
pub fn routes(service: Arc<ReportSessionService>, body_limit: usize) -> Router {
    Router::new()
        .route(BASE, post(handlers::create_session))
        .route(
            &format!("{}/{{id}}", BASE),
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route(
            &format!("{}/{{id}}/campos", BASE),
            patch(handlers::update_fields),
        )
        .route(&format!("{}/{{id}}/itens", BASE), post(handlers::add_item))
        .route(
            &format!("{}/{{id}}/itens/{{item_id}}", BASE),
            put(handlers::update_item).delete(handlers::remove_item),
        )
        .route(
            &format!("{}/{{id}}/fotos", BASE),
            post(handlers::upload_photos).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            &format!("{}/{{id}}/fotos/{{photo_id}}", BASE),
            delete(handlers::remove_photo),
        )
        .route(
            &format!("{}/{{id}}/fotos/{{photo_id}}/vinculo", BASE),
            put(handlers::link_photo).delete(handlers::unlink_photo),
        )
        .route(
            &format!("{}/{{id}}/modelos", BASE),
            post(handlers::save_as_preset),
        )
        .route(
            &format!("{}/{{id}}/modelos/aplicar", BASE),
            post(handlers::apply_preset),
        )
        .route(
            &format!("{}/{{id}}/pdf", BASE),
            post(handlers::generate_pdf)
                .get(handlers::get_preview)
                .delete(handlers::release_preview),
        )
        .with_state(service)
}
