/// JWT Claims structure
///
/// The payload signed into every issued token: the owning subject, the
/// revocation/refresh flags, the expiry and an optional expiry trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject the token was issued for
    #[serde(alias = "userId")]
    pub subject_id: i64,
    /// Acceptance additionally depends on registry membership
    #[serde(default)]
    pub revocable: bool,
    #[serde(default)]
    pub refreshable: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Action identifiers to run once the token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Vec<String>>,
    /// Token id, distinct for every issued or renewed token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Build the claims of a freshly issued token.
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if the expiry is missing or not in the future
    pub fn for_issue(
        subject_id: i64,
        expires_at: Option<i64>,
        refreshable: bool,
        trigger: Vec<String>,
        issuer: &str,
    ) -> Result<Self, TokenError> {
        let now = Utc::now().timestamp();
        let exp = expires_at
            .ok_or_else(|| TokenError::Encoding("Token expiration is required".to_string()))?;

        if exp <= now {
            return Err(TokenError::Encoding(
                "Token expiration must be in the future".to_string(),
            ));
        }
        let exp = representable(exp)?;

        Ok(Self {
            subject_id,
            revocable: true,
            refreshable,
            exp,
            iat: now,
            iss: issuer.to_string(),
            trigger: if trigger.is_empty() { None } else { Some(trigger) },
            jti: Some(Uuid::new_v4().to_string()),
        })
    }

    /// Copy of these claims with a new lifetime, as handed out on refresh
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if the new expiry is out of range
    pub fn renewed(&self, ttl_seconds: i64) -> Result<Self, TokenError> {
        let now = Utc::now().timestamp();
        let exp = now
            .checked_add(ttl_seconds)
            .ok_or_else(|| TokenError::Encoding("Token expiration is out of range".to_string()))?;

        Ok(Self {
            exp: representable(exp)?,
            iat: now,
            jti: Some(Uuid::new_v4().to_string()),
            ..self.clone()
        })
    }

    /// Lifetime the token was originally issued with
    pub fn lifetime(&self) -> i64 {
        self.exp - self.iat
    }

    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

/// Reject expiries that cannot be shown as a calendar date
fn representable(exp: i64) -> Result<i64, TokenError> {
    DateTime::<Utc>::from_timestamp(exp, 0)
        .map(|_| exp)
        .ok_or_else(|| TokenError::Encoding("Token expiration is out of range".to_string()))
}

/// Parse an expiry supplied either as a JSON integer or as a numeric string
pub fn parse_timestamp(value: &serde_json::Value) -> Result<i64, TokenError> {
    let invalid = || TokenError::Encoding("Token expiration must be a Unix timestamp".to_string());

    match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(invalid),
        serde_json::Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_for_issue() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = Claims::for_issue(7, Some(exp), true, vec![], "test").unwrap();

        assert_eq!(claims.subject_id, 7);
        assert!(claims.revocable);
        assert!(claims.refreshable);
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.iss, "test");
        assert!(claims.trigger.is_none());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_missing_expiry_is_rejected() {
        let result = Claims::for_issue(7, None, false, vec![], "test");
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 1;
        let result = Claims::for_issue(7, Some(exp), false, vec![], "test");
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_trigger_omitted_from_payload_when_absent() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let claims = Claims::for_issue(1, Some(exp), false, vec![], "test").unwrap();
        let payload = serde_json::to_value(&claims).unwrap();

        assert!(payload.get("trigger").is_none());
        assert_eq!(payload["revocable"], json!(true));
    }

    #[test]
    fn test_legacy_user_id_alias() {
        let claims: Claims = serde_json::from_value(json!({
            "userId": 12,
            "revocable": true,
            "refreshable": false,
            "exp": 2000000000,
            "iss": "test"
        }))
        .unwrap();

        assert_eq!(claims.subject_id, 12);
    }

    #[test]
    fn test_renewed_keeps_identity() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let claims =
            Claims::for_issue(3, Some(exp), true, vec!["lock".to_string()], "test").unwrap();
        let renewed = claims.renewed(7200).unwrap();

        assert_eq!(renewed.subject_id, 3);
        assert_eq!(renewed.trigger, claims.trigger);
        assert_eq!(renewed.lifetime(), 7200);
        assert_ne!(renewed.jti, claims.jti);
    }

    #[test]
    fn test_unrepresentable_expiry_is_rejected() {
        let result = Claims::for_issue(7, Some(i64::MAX), false, vec![], "test");
        assert!(matches!(result, Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_renewal_overflow_is_an_encoding_error() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let claims = Claims::for_issue(3, Some(exp), true, vec![], "test").unwrap();

        assert!(matches!(claims.renewed(i64::MAX), Err(TokenError::Encoding(_))));
        assert!(matches!(claims.renewed(i64::MAX / 2), Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp(&json!(1700000000)).unwrap(), 1700000000);
        assert_eq!(parse_timestamp(&json!("1700000000")).unwrap(), 1700000000);
        assert!(parse_timestamp(&json!("tomorrow")).is_err());
        assert!(parse_timestamp(&json!(1.5)).is_err());
        assert!(parse_timestamp(&json!(null)).is_err());
    }
}
