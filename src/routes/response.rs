/// Response bodies of the token management API
///
/// Every operation answers with `{status, jwt?, reason?}`; failures never
/// carry more than a fixed public reason.

use actix_web::error::{JsonPayloadError, QueryPayloadError, ResponseError};
use actix_web::{http::StatusCode, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::{IssuanceError, ValidationError, REASON_REGISTRATION_FAILED};
use crate::issuance::{IssuedToken, RegistrationStatus};
use crate::listing::DisplayRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failure,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OperationResponse {
    pub fn success() -> Self {
        Self {
            status: OperationStatus::Success,
            jwt: None,
            reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Failure,
            jwt: None,
            reason: Some(reason.into()),
        }
    }

    /// A minted token is always returned, even when its registration failed
    pub fn issued(issued: IssuedToken) -> Self {
        match issued.registration {
            RegistrationStatus::Failed => Self {
                status: OperationStatus::Failure,
                jwt: Some(issued.token),
                reason: Some(REASON_REGISTRATION_FAILED.to_string()),
            },
            _ => Self {
                status: OperationStatus::Success,
                jwt: Some(issued.token),
                reason: None,
            },
        }
    }
}

/// DataTables-shaped listing of a subject's registered tokens
#[derive(Debug, Serialize)]
pub struct ListResponse {
    #[serde(rename = "recordsTotal")]
    pub records_total: usize,
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<i64>,
    pub data: Vec<DisplayRow>,
}

impl ListResponse {
    pub fn new(rows: Vec<DisplayRow>, draw: Option<i64>) -> Self {
        Self {
            records_total: rows.len(),
            records_filtered: rows.len(),
            draw,
            data: rows,
        }
    }
}

impl ResponseError for IssuanceError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.http_status()).json(OperationResponse::failure(self.public_reason()))
    }
}

/// Malformed request bodies answer with a fixed failure reason
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected request body");
    IssuanceError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
}

/// Malformed query strings answer with a fixed failure reason
pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected query string");
    IssuanceError::Validation(ValidationError::InvalidFormat("query string".to_string())).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_body_shape() {
        let body = serde_json::to_value(OperationResponse::failure("nope")).unwrap();
        assert_eq!(body, json!({"status": "failure", "reason": "nope"}));
    }

    #[test]
    fn test_issued_with_failed_registration_keeps_token() {
        let body = serde_json::to_value(OperationResponse::issued(IssuedToken {
            token: "a.b.c".to_string(),
            registration: RegistrationStatus::Failed,
        }))
        .unwrap();

        assert_eq!(
            body,
            json!({"status": "failure", "jwt": "a.b.c", "reason": "Failed to register JWT token"})
        );
    }

    #[test]
    fn test_list_response_counts() {
        let body = serde_json::to_value(ListResponse::new(vec![], Some(3))).unwrap();
        assert_eq!(
            body,
            json!({"recordsTotal": 0, "recordsFiltered": 0, "draw": 3, "data": []})
        );
    }

    #[test]
    fn test_issuance_error_renders_contract_body() {
        let response = IssuanceError::RevocationFailed.error_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
