use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::companies::{handlers, services::CompanyService};

pub fn routes(service: Arc<CompanyService>) -> Router {
    Router::new()
        .route(
            "/api/empresas",
            get(handlers::list_companies).post(handlers::create_company),
        )
        .route("/api/empresas/buscar", get(handlers::find_company_by_tax_id))
        .route(
            "/api/empresas/inicializar",
            post(handlers::initialize_default_company),
        )
        .route(
            "/api/empresas/{id}",
            get(handlers::get_company)
                .put(handlers::update_company)
                .delete(handlers::delete_company),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::company_service;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server() -> TestServer {
        TestServer::new(routes(company_service())).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup_company() {
        let server = server();

        let response = server
            .post("/api/empresas")
            .json(&json!({ "legal_name": "ACME LTDA", "tax_id": "12.345.678/0001-90" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let id = response.json::<Value>()["data"]["id"].clone();

        let response = server
            .get("/api/empresas/buscar")
            .add_query_param("cnpj", "12345678000190")
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["id"], id);

        let response = server
            .get("/api/empresas")
            .add_query_param("cnpj", "12.345.678/0001-90")
            .await;
        assert_eq!(response.json::<Value>()["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_buscar_requires_cnpj() {
        let response = server().get("/api/empresas/buscar").await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["error"], "CNPJ is required");
    }

    #[tokio::test]
    async fn test_buscar_unknown_cnpj_is_not_found() {
        let response = server()
            .get("/api/empresas/buscar")
            .add_query_param("cnpj", "11.111.111/1111-11")
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_invalid_cnpj_rejected() {
        let response = server()
            .post("/api/empresas")
            .json(&json!({ "legal_name": "ACME", "tax_id": "abc" }))
            .await;
        response.assert_status_bad_request();
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert!(body["errors"][0].as_str().unwrap().starts_with("tax_id"));
    }

    #[tokio::test]
    async fn test_initialize_then_delete_default_company() {
        let server = server();
        let response = server.post("/api/empresas/inicializar").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["tax_id"], "37.097.718/0001-58");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        server
            .delete(&format!("/api/empresas/{}", id))
            .await
            .assert_status_ok();
        server
            .get(&format!("/api/empresas/{}", id))
            .await
            .assert_status_not_found();
    }
}
