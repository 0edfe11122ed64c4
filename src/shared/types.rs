use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope returned by every JSON endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Human readable failure reason, present only when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            error: None,
            errors: None,
        }
    }

    pub fn error(message: String, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: None,
            meta: None,
            error: Some(message),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error(
            "Empresa não encontrada".to_string(),
            None,
        ))
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "Empresa não encontrada" })
        );
    }

    #[test]
    fn test_success_envelope_with_meta() {
        let body = serde_json::to_value(ApiResponse::success(
            Some(vec![1, 2]),
            None,
            Some(Meta { total: 2 }),
        ))
        .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert_eq!(body["meta"]["total"], 2);
        assert!(body.get("error").is_none());
    }
}
