use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::core::error::AppError;

/// Custom JSON extractor that provides consistent error responses
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppJsonRejection;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppJsonRejection(rejection)),
        }
    }
}

pub struct AppJsonRejection(JsonRejection);

impl IntoResponse for AppJsonRejection {
    fn into_response(self) -> Response {
        let message = match self.0 {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err),
            JsonRejection::MissingJsonContentType(err) => {
                format!("Missing JSON content type: {}", err)
            }
            _ => "Failed to parse JSON body".to_string(),
        };

        AppError::BadRequest(message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use axum_test::TestServer;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        name: String,
    }

    async fn echo(AppJson(payload): AppJson<Payload>) -> String {
        payload.name
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let server = TestServer::new(Router::new().route("/", post(echo))).unwrap();

        let response = server
            .post("/")
            .text("{not json")
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON syntax"));
    }

    #[tokio::test]
    async fn test_valid_json_passes_through() {
        let server = TestServer::new(Router::new().route("/", post(echo))).unwrap();

        let response = server
            .post("/")
            .json(&serde_json::json!({ "name": "GM" }))
            .await;
        response.assert_status_ok();
        response.assert_text("GM");
    }
}
