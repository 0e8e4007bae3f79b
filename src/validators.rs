/// Input validators for token management requests
/// - Token strings must look like a compact JWS before they reach the registry
/// - Trigger identifiers are opaque, but restricted to a safe character set
/// - Length limits keep oversized payloads out of storage

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_TOKEN_LENGTH: usize = 4096;
const MAX_TRIGGER_LENGTH: usize = 64;

lazy_static! {
    // header.payload.signature, each part base64url without padding
    static ref COMPACT_JWS_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$").unwrap();

    static ref TRIGGER_ACTION_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.:-]+$").unwrap();
}

/// Validates a token string supplied by a caller
pub fn is_valid_token(token: &str) -> Result<String, ValidationError> {
    let trimmed = token.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("token".to_string()));
    }

    if trimmed.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::TooLong("token".to_string(), MAX_TOKEN_LENGTH));
    }

    if !COMPACT_JWS_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("token".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an ordered list of trigger action identifiers.
///
/// Order is preserved; an empty list is returned as-is and dropped from the claims later.
pub fn is_valid_trigger(actions: &[String]) -> Result<Vec<String>, ValidationError> {
    actions
        .iter()
        .map(|action| {
            let trimmed = action.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyField("trigger".to_string()));
            }
            if trimmed.len() > MAX_TRIGGER_LENGTH {
                return Err(ValidationError::TooLong(
                    "trigger".to_string(),
                    MAX_TRIGGER_LENGTH,
                ));
            }
            if !TRIGGER_ACTION_REGEX.is_match(trimmed) {
                return Err(ValidationError::InvalidFormat("trigger".to_string()));
            }
            Ok(trimmed.to_string())
        })
        .collect()
}
