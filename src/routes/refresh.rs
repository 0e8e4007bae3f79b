/// Token Refresh Route
///
/// Public endpoint: the presented token is the credential. Implements token
/// rotation, so a refreshed token cannot be refreshed a second time.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ErrorContext, IssuanceError};
use crate::issuance::IssuanceService;
use crate::routes::response::OperationResponse;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// POST /jwt/refresh
///
/// # Errors
/// - 400: Token is not refreshable
/// - 401: Token is invalid or expired
/// - 403: Token has been revoked
pub async fn refresh_token(
    form: web::Json<RefreshRequest>,
    issuance: web::Data<IssuanceService>,
) -> Result<HttpResponse, IssuanceError> {
    let context = ErrorContext::new("refresh_token");

    match issuance.refresh(&form.token).await {
        Ok(issued) => Ok(HttpResponse::Ok().json(OperationResponse::issued(issued))),
        Err(e) => {
            context.log_issuance_error(&e);
            Err(e)
        }
    }
}
