/// Token Management Routes
///
/// Generate, register, revoke and list tokens for a target subject. The
/// requester is the subject named by the bearer token, injected by
/// `JwtMiddleware`. Every operation requires the requester's privilege level
/// to be at least the target's.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{parse_timestamp, Claims};
use crate::error::{
    ErrorContext, IssuanceError, REASON_ISSUE_DENIED, REASON_MANAGE_DENIED, REASON_TARGET_DENIED,
};
use crate::issuance::{IssuanceService, IssueOptions};
use crate::listing::ListingProjector;
use crate::routes::response::{ListResponse, OperationResponse};
use crate::subjects::{Subject, SubjectDirectory};

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub subject_id: i64,
    /// Unix timestamp, as a number or a numeric string
    pub expires: Option<serde_json::Value>,
    #[serde(default)]
    pub refreshable: bool,
    #[serde(default)]
    pub register: bool,
    #[serde(default)]
    pub trigger: Vec<String>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub subject_id: i64,
    pub token: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub subject_id: i64,
    pub draw: Option<i64>,
}

/// Resolve the authenticated caller and require the manage-tokens capability
async fn authorized_requester(
    claims: &Claims,
    subjects: &dyn SubjectDirectory,
    issuance: &IssuanceService,
) -> Result<Subject, IssuanceError> {
    let requester = subjects
        .find(claims.subject_id)
        .await?
        .ok_or_else(|| IssuanceError::Forbidden(REASON_MANAGE_DENIED.to_string()))?;

    issuance.authorize_manage(&requester)?;
    Ok(requester)
}

/// Resolve the authenticated caller and the target subject, and require the
/// caller to be allowed to manage the target's tokens
async fn authorized_pair(
    claims: &Claims,
    target_id: i64,
    subjects: &dyn SubjectDirectory,
    issuance: &IssuanceService,
    denied_reason: &str,
) -> Result<(Subject, Subject), IssuanceError> {
    let requester = authorized_requester(claims, subjects, issuance).await?;
    let target = subjects
        .find(target_id)
        .await?
        .ok_or(IssuanceError::UnknownSubject(target_id))?;

    issuance.authorize_target(&requester, &target, denied_reason)?;
    Ok((requester, target))
}

/// Log the internal detail of a failure before it is rendered with its public reason
fn logged<T>(context: &ErrorContext, result: Result<T, IssuanceError>) -> Result<T, IssuanceError> {
    if let Err(e) = &result {
        context.log_issuance_error(e);
    }
    result
}

/// POST /api/jwt/generate
///
/// Mint a token for the target subject. Fails with 403 when the caller lacks
/// the manage-tokens capability or is outranked by the target. The expiry is
/// only parsed once the caller is authorized.
pub async fn generate_token(
    claims: web::ReqData<Claims>,
    form: web::Json<GenerateRequest>,
    subjects: web::Data<dyn SubjectDirectory>,
    issuance: web::Data<IssuanceService>,
) -> Result<HttpResponse, IssuanceError> {
    let context = ErrorContext::new("generate_token").with_subject_id(form.subject_id);
    let form = form.into_inner();

    let result = async {
        let (requester, target) = authorized_pair(
            &claims,
            form.subject_id,
            subjects.get_ref(),
            issuance.get_ref(),
            REASON_ISSUE_DENIED,
        )
        .await?;
        let expires_at = form.expires.as_ref().map(parse_timestamp).transpose()?;

        issuance
            .issue(
                &requester,
                &target,
                IssueOptions {
                    expires_at,
                    refreshable: form.refreshable,
                    register: form.register,
                    trigger: form.trigger,
                },
            )
            .await
    }
    .await;

    let issued = logged(&context, result)?;
    Ok(HttpResponse::Ok().json(OperationResponse::issued(issued)))
}

/// POST /api/jwt/register
pub async fn register_token(
    claims: web::ReqData<Claims>,
    form: web::Json<TokenRequest>,
    subjects: web::Data<dyn SubjectDirectory>,
    issuance: web::Data<IssuanceService>,
) -> Result<HttpResponse, IssuanceError> {
    let context = ErrorContext::new("register_token").with_subject_id(form.subject_id);

    let result = async {
        authorized_pair(
            &claims,
            form.subject_id,
            subjects.get_ref(),
            issuance.get_ref(),
            REASON_TARGET_DENIED,
        )
        .await?;
        issuance.register_existing(form.subject_id, &form.token).await
    }
    .await;

    logged(&context, result)?;
    Ok(HttpResponse::Ok().json(OperationResponse::success()))
}

/// POST /api/jwt/revoke
pub async fn revoke_token(
    claims: web::ReqData<Claims>,
    form: web::Json<TokenRequest>,
    subjects: web::Data<dyn SubjectDirectory>,
    issuance: web::Data<IssuanceService>,
) -> Result<HttpResponse, IssuanceError> {
    let context = ErrorContext::new("revoke_token").with_subject_id(form.subject_id);

    let result = async {
        authorized_pair(
            &claims,
            form.subject_id,
            subjects.get_ref(),
            issuance.get_ref(),
            REASON_TARGET_DENIED,
        )
        .await?;
        issuance.revoke(form.subject_id, &form.token).await
    }
    .await;

    logged(&context, result)?;
    Ok(HttpResponse::Ok().json(OperationResponse::success()))
}

/// GET /api/jwt/list?subject_id=&draw=
pub async fn list_tokens(
    claims: web::ReqData<Claims>,
    query: web::Query<ListQuery>,
    subjects: web::Data<dyn SubjectDirectory>,
    issuance: web::Data<IssuanceService>,
    listing: web::Data<ListingProjector>,
) -> Result<HttpResponse, IssuanceError> {
    let context = ErrorContext::new("list_tokens").with_subject_id(query.subject_id);

    let result = async {
        authorized_pair(
            &claims,
            query.subject_id,
            subjects.get_ref(),
            issuance.get_ref(),
            REASON_TARGET_DENIED,
        )
        .await?;
        listing
            .project(query.subject_id)
            .await
            .map_err(IssuanceError::from)
    }
    .await;

    let rows = logged(&context, result)?;
    Ok(HttpResponse::Ok().json(ListResponse::new(rows, query.draw)))
}
