/// Registry listing projection
///
/// Turns a subject's registry contents into display rows, validating every
/// token on read. Expired or untrustworthy tokens stay listed (only explicit
/// revocation removes them) and are flagged as no longer valid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::TokenCodec;
use crate::error::{DatabaseError, REASON_TOKEN_INVALID};
use crate::registry::TokenRegistry;

/// Actions offered for every row
pub const ROW_ACTIONS: &[&str] = &["view", "delete"];

const EXPIRY_FORMAT: &str = "%m/%d/%Y, %H:%M %z";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub token: String,
    pub access_url: String,
    pub is_valid: bool,
    /// Formatted UTC expiry for valid tokens, a reason otherwise
    pub expiry_or_reason: String,
    pub available_actions: &'static [&'static str],
}

pub struct ListingProjector {
    codec: Arc<TokenCodec>,
    registry: Arc<dyn TokenRegistry>,
    base_url: String,
    query_param: String,
}

impl ListingProjector {
    pub fn new(
        codec: Arc<TokenCodec>,
        registry: Arc<dyn TokenRegistry>,
        base_url: impl Into<String>,
        query_param: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            registry,
            base_url: base_url.into(),
            query_param: query_param.into(),
        }
    }

    pub async fn project(&self, subject_id: i64) -> Result<Vec<DisplayRow>, DatabaseError> {
        let tokens = self.registry.list(subject_id).await?;

        Ok(tokens
            .into_iter()
            .map(|token| {
                let expiry = match self.codec.decode(&token) {
                    Ok(claims) => Some(format_expiry(claims.exp)),
                    Err(e) => {
                        tracing::debug!(subject_id, error = %e, "Registered token no longer valid");
                        None
                    }
                };

                DisplayRow {
                    access_url: self.access_url(&token),
                    is_valid: expiry.is_some(),
                    expiry_or_reason: expiry.unwrap_or_else(|| REASON_TOKEN_INVALID.to_string()),
                    available_actions: ROW_ACTIONS,
                    token,
                }
            })
            .collect())
    }

    /// URL granting access with the token as a query parameter
    pub fn access_url(&self, token: &str) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.base_url,
            separator,
            self.query_param,
            urlencoding::encode(token)
        )
    }
}

/// Expiries past the calendar range are shown as the raw timestamp
fn format_expiry(exp: i64) -> String {
    DateTime::<Utc>::from_timestamp(exp, 0)
        .map(|dt| dt.format(EXPIRY_FORMAT).to_string())
        .unwrap_or_else(|| exp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::configuration::JwtSettings;
    use crate::registry::MemoryTokenRegistry;

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

    fn token_expiring_at(codec: &TokenCodec, subject_id: i64, exp: i64) -> String {
        codec
            .encode(&Claims {
                subject_id,
                revocable: true,
                refreshable: false,
                exp,
                iat: exp - 3600,
                iss: "test".to_string(),
                trigger: None,
                jti: Some(uuid::Uuid::new_v4().to_string()),
            })
            .unwrap()
    }

    #[test]
    fn test_expiry_format() {
        assert_eq!(
            format_expiry(1700000000),
            "11/14/2023, 22:13 +0000"
        );
    }

    #[tokio::test]
    async fn test_project_flags_expired_tokens() {
        let codec = codec();
        let registry = Arc::new(MemoryTokenRegistry::new(10));
        let projector =
            ListingProjector::new(codec.clone(), registry.clone(), "https://example.com/", "jwt");

        let now = Utc::now().timestamp();
        let expired = token_expiring_at(&codec, 3, now - 60);
        let valid = token_expiring_at(&codec, 3, now + 3600);
        registry.register(3, &expired).await.unwrap();
        registry.register(3, &valid).await.unwrap();
        registry.register(3, "not.a.jwt").await.unwrap();

        let rows = projector.project(3).await.unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].token, expired);
        assert!(!rows[0].is_valid);
        assert_eq!(rows[0].expiry_or_reason, "Token is no longer valid");

        assert_eq!(rows[1].token, valid);
        assert!(rows[1].is_valid);
        assert_eq!(rows[1].expiry_or_reason, format_expiry(now + 3600));
        assert!(rows[1].expiry_or_reason.ends_with("+0000"));

        assert!(!rows[2].is_valid);

        for row in &rows {
            assert_eq!(row.available_actions, &["view", "delete"]);
        }
    }

    #[tokio::test]
    async fn test_far_future_expiry_is_still_valid() {
        let codec = codec();
        let registry = Arc::new(MemoryTokenRegistry::new(10));
        let projector =
            ListingProjector::new(codec.clone(), registry.clone(), "https://example.com/", "jwt");

        let exp = i64::MAX / 2;
        let token = token_expiring_at(&codec, 3, exp);
        registry.register(3, &token).await.unwrap();

        let rows = projector.project(3).await.unwrap();
        assert!(rows[0].is_valid);
        assert_eq!(rows[0].expiry_or_reason, exp.to_string());
    }

    #[tokio::test]
    async fn test_project_empty_subject() {
        let projector = ListingProjector::new(
            codec(),
            Arc::new(MemoryTokenRegistry::new(10)),
            "https://example.com/",
            "jwt",
        );

        assert!(projector.project(9).await.unwrap().is_empty());
    }

    #[test]
    fn test_access_url() {
        let projector = ListingProjector::new(
            codec(),
            Arc::new(MemoryTokenRegistry::new(10)),
            "https://example.com/",
            "jwt",
        );
        assert_eq!(projector.access_url("a.b.c"), "https://example.com/?jwt=a.b.c");

        let projector = ListingProjector::new(
            codec(),
            Arc::new(MemoryTokenRegistry::new(10)),
            "https://example.com/?lang=en",
            "access",
        );
        assert_eq!(
            projector.access_url("a.b.c"),
            "https://example.com/?lang=en&access=a.b.c"
        );
    }
}
