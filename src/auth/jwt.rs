/// JWT Token Encoding and Decoding
///
/// `TokenCodec` owns the signing keys loaded from configuration at startup.
/// It is constructed once and shared; there is no ambient key state.

use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{ConfigError, TokenError};

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
}

impl TokenCodec {
    /// Build a codec from the JWT settings
    ///
    /// # Errors
    /// Returns error if the secret is empty or the algorithm is not an HMAC algorithm
    pub fn new(config: &JwtSettings) -> Result<Self, ConfigError> {
        if config.secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }

        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| ConfigError::InvalidValue(format!("jwt.algorithm {}", config.algorithm)))?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.algorithm {} requires a key pair",
                config.algorithm
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            issuer: config.issuer.clone(),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign claims into a compact token string
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if the expiry is not a usable timestamp or signing fails
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        if claims.exp <= 0 {
            return Err(TokenError::Encoding(
                "Token expiration must be a Unix timestamp".to_string(),
            ));
        }

        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(format!("Token generation failed: {}", e)))
    }

    /// Verify signature, structure, issuer and expiry
    ///
    /// # Errors
    /// `TokenError::Expired` for a trustworthy but stale token, `TokenError::Invalid` otherwise
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, self.validation(true))
    }

    /// Verify signature, structure and issuer but accept tokens past their expiry.
    ///
    /// Only used to read the trigger of an expired token.
    pub fn decode_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, self.validation(false))
    }

    fn decode_with(&self, token: &str, validation: Validation) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!("JWT validation error: {}", e);
                    TokenError::Invalid(e.to_string())
                }
            })
    }

    fn validation(&self, check_expiry: bool) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[&self.issuer]);
        validation
    }
}
