/// JWT Authentication Middleware
///
/// Accepts a token from the `Authorization: Bearer` header or from the access
/// URL query parameter. A token is accepted only while its signature and
/// expiry check pass and, for revocable tokens, while it is still registered
/// under its own subject. Accepted claims are injected into request
/// extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::error::{AppError, AuthError, TokenError};
use crate::registry::TokenRegistry;
use crate::triggers::TriggerDispatcher;

#[derive(Clone)]
pub struct JwtMiddleware {
    codec: Arc<TokenCodec>,
    registry: Arc<dyn TokenRegistry>,
    dispatcher: Arc<dyn TriggerDispatcher>,
    query_param: String,
}

impl JwtMiddleware {
    pub fn new(
        codec: Arc<TokenCodec>,
        registry: Arc<dyn TokenRegistry>,
        dispatcher: Arc<dyn TriggerDispatcher>,
        query_param: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            registry,
            dispatcher,
            query_param: query_param.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            config: self.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    config: JwtMiddleware,
}

impl<S> JwtMiddlewareService<S> {
    fn extract_token(&self, req: &ServiceRequest) -> Option<String> {
        let from_header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());

        from_header.or_else(|| {
            web::Query::<HashMap<String, String>>::from_query(req.query_string())
                .ok()
                .and_then(|q| q.get(&self.config.query_param).cloned())
        })
    }
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = self.extract_token(&req);
        let service = self.service.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let token = match token {
                Some(token) if !token.is_empty() => token,
                _ => {
                    tracing::warn!("Missing or invalid Authorization header");
                    return Err(AppError::Auth(AuthError::MissingToken).into());
                }
            };

            let claims = match config.codec.decode(&token) {
                Ok(claims) => claims,
                Err(TokenError::Expired) => {
                    dispatch_expiry_trigger(&config, &token).await;
                    return Err(AppError::Auth(AuthError::TokenExpired).into());
                }
                Err(e) => {
                    tracing::warn!("JWT validation failed: {}", e);
                    return Err(AppError::Auth(AuthError::TokenInvalid).into());
                }
            };

            if claims.revocable
                && !config
                    .registry
                    .contains(claims.subject_id, &token)
                    .await
                    .map_err(AppError::from)?
            {
                tracing::warn!(subject_id = claims.subject_id, "Revoked token presented");
                return Err(AppError::Auth(AuthError::TokenRevoked).into());
            }

            tracing::debug!(subject_id = claims.subject_id, "JWT validated successfully");
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}

/// Hand the trigger of an expired but authentic, still-registered token to the dispatcher
async fn dispatch_expiry_trigger(config: &JwtMiddleware, token: &str) {
    let claims = match config.codec.decode_ignoring_expiry(token) {
        Ok(claims) => claims,
        Err(_) => return,
    };

    let Some(actions) = claims.trigger.as_ref().filter(|a| !a.is_empty()) else {
        return;
    };

    if claims.revocable {
        match config.registry.contains(claims.subject_id, token).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::error!(subject_id = claims.subject_id, error = %e, "Registry lookup failed");
                return;
            }
        }
    }

    config.dispatcher.dispatch(claims.subject_id, actions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::configuration::JwtSettings;
    use crate::registry::MemoryTokenRegistry;
    use crate::triggers::tests::RecordingDispatcher;
    use actix_web::http::StatusCode;
    use actix_web::{test, App, HttpResponse};

    async fn whoami(claims: web::ReqData<Claims>) -> HttpResponse {
        HttpResponse::Ok().body(claims.subject_id.to_string())
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(&JwtSettings {
                secret: "test-secret-key-at-least-32-characters-long".to_string(),
                issuer: "test".to_string(),
                algorithm: "HS256".to_string(),
                registry_limit: 10,
                query_param: "jwt".to_string(),
                refresh_ttl: None,
            })
            .unwrap(),
        )
    }

    fn token(codec: &TokenCodec, subject_id: i64, expires_in: i64, trigger: Option<Vec<String>>) -> String {
        let now = chrono::Utc::now().timestamp();
        codec
            .encode(&Claims {
                subject_id,
                revocable: true,
                refreshable: false,
                exp: now + expires_in,
                iat: now,
                iss: "test".to_string(),
                trigger,
                jti: Some(uuid::Uuid::new_v4().to_string()),
            })
            .unwrap()
    }

    struct Fixture {
        codec: Arc<TokenCodec>,
        registry: Arc<MemoryTokenRegistry>,
        dispatcher: Arc<RecordingDispatcher>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                codec: codec(),
                registry: Arc::new(MemoryTokenRegistry::new(10)),
                dispatcher: Arc::new(RecordingDispatcher::default()),
            }
        }

        fn middleware(&self) -> JwtMiddleware {
            JwtMiddleware::new(
                self.codec.clone(),
                self.registry.clone(),
                self.dispatcher.clone(),
                "jwt",
            )
        }
    }

    async fn status_of(fixture: &Fixture, req: test::TestRequest) -> StatusCode {
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(fixture.middleware())
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        match app.call(req.to_request()).await {
            Ok(res) => res.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    }

    #[actix_web::test]
    async fn test_registered_token_accepted_from_header_and_query() {
        let fixture = Fixture::new();
        let jwt = token(&fixture.codec, 4, 3600, None);
        fixture.registry.register(4, &jwt).await.unwrap();

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", jwt)));
        assert_eq!(status_of(&fixture, req).await, StatusCode::OK);

        let req = test::TestRequest::get().uri(&format!("/api/whoami?jwt={}", jwt));
        assert_eq!(status_of(&fixture, req).await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_unregistered_token_rejected() {
        let fixture = Fixture::new();
        let jwt = token(&fixture.codec, 4, 3600, None);
        // registered under another subject only
        fixture.registry.register(5, &jwt).await.unwrap();

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", jwt)));
        assert_eq!(status_of(&fixture, req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_missing_token_rejected() {
        let fixture = Fixture::new();
        let req = test::TestRequest::get().uri("/api/whoami");

        assert_eq!(status_of(&fixture, req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_expired_token_dispatches_trigger() {
        let fixture = Fixture::new();
        let jwt = token(&fixture.codec, 4, -60, Some(vec!["lock".to_string()]));
        fixture.registry.register(4, &jwt).await.unwrap();

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", jwt)));
        assert_eq!(status_of(&fixture, req).await, StatusCode::UNAUTHORIZED);

        let calls = fixture.dispatcher.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(4, vec!["lock".to_string()])]);
    }

    #[actix_web::test]
    async fn test_revoked_expired_token_does_not_dispatch() {
        let fixture = Fixture::new();
        let jwt = token(&fixture.codec, 4, -60, Some(vec!["lock".to_string()]));

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {}", jwt)));
        assert_eq!(status_of(&fixture, req).await, StatusCode::UNAUTHORIZED);

        assert!(fixture.dispatcher.calls.lock().unwrap().is_empty());
    }
}
