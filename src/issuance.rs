/// Token issuance, registration, revocation and refresh
///
/// Orchestrates the permission and privilege checks, claim construction,
/// signing and registry writes. Every operation returns an `IssuanceError`
/// rather than failing the process; HTTP mapping happens in the routes.

use std::sync::Arc;

use crate::auth::{AuthorizationGate, Claims, TokenCodec};
use crate::error::{
    IssuanceError, TokenError, REASON_ISSUE_DENIED, REASON_MANAGE_DENIED, REASON_TOKEN_REVOKED,
};
use crate::registry::TokenRegistry;
use crate::subjects::{Subject, MANAGE_TOKENS_CAPABILITY};
use crate::validators::{is_valid_token, is_valid_trigger};

/// Caller-supplied issuance options
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    /// Unix timestamp; required and must lie in the future
    pub expires_at: Option<i64>,
    pub refreshable: bool,
    /// Also add the minted token to the target subject's registry
    pub register: bool,
    pub trigger: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    NotRequested,
    Registered,
    /// The token was minted but the registry write failed
    Failed,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub registration: RegistrationStatus,
}

impl IssuedToken {
    pub fn registered(&self) -> bool {
        self.registration == RegistrationStatus::Registered
    }
}

pub struct IssuanceService {
    codec: Arc<TokenCodec>,
    registry: Arc<dyn TokenRegistry>,
    refresh_ttl: Option<i64>,
}

impl IssuanceService {
    pub fn new(
        codec: Arc<TokenCodec>,
        registry: Arc<dyn TokenRegistry>,
        refresh_ttl: Option<i64>,
    ) -> Self {
        Self {
            codec,
            registry,
            refresh_ttl,
        }
    }

    /// Require the manage-tokens capability
    pub fn authorize_manage(&self, requester: &Subject) -> Result<(), IssuanceError> {
        if requester.can(MANAGE_TOKENS_CAPABILITY) {
            Ok(())
        } else {
            Err(IssuanceError::Forbidden(REASON_MANAGE_DENIED.to_string()))
        }
    }

    /// Require the manage-tokens capability and a privilege level at least
    /// equal to the target's. `denied_reason` is reported when the target
    /// outranks the requester.
    pub fn authorize_target(
        &self,
        requester: &Subject,
        target: &Subject,
        denied_reason: &str,
    ) -> Result<(), IssuanceError> {
        self.authorize_manage(requester)?;

        if AuthorizationGate::can_issue_for(requester.max_level, target.max_level) {
            return Ok(());
        }

        tracing::warn!(
            requester_id = requester.id,
            subject_id = target.id,
            "Token operation denied: target outranks requester"
        );
        Err(IssuanceError::Forbidden(denied_reason.to_string()))
    }

    /// Mint a token for `target` on behalf of `requester`.
    ///
    /// A failed registry write does not invalidate the minted token; it is
    /// reported through `IssuedToken::registration` instead.
    pub async fn issue(
        &self,
        requester: &Subject,
        target: &Subject,
        options: IssueOptions,
    ) -> Result<IssuedToken, IssuanceError> {
        self.authorize_target(requester, target, REASON_ISSUE_DENIED)?;

        let trigger = is_valid_trigger(&options.trigger)?;
        let claims = Claims::for_issue(
            target.id,
            options.expires_at,
            options.refreshable,
            trigger,
            self.codec.issuer(),
        )?;
        let token = self.codec.encode(&claims)?;

        let registration = if options.register {
            match self.registry.register(target.id, &token).await {
                Ok(_) => RegistrationStatus::Registered,
                Err(e) => {
                    tracing::error!(subject_id = target.id, error = %e, "Failed to register issued token");
                    RegistrationStatus::Failed
                }
            }
        } else {
            RegistrationStatus::NotRequested
        };

        tracing::info!(
            requester_id = requester.id,
            subject_id = target.id,
            exp = claims.exp,
            registration = ?registration,
            "JWT issued"
        );

        Ok(IssuedToken {
            token,
            registration,
        })
    }

    /// Make a token issued elsewhere revocable by adding it to the registry.
    ///
    /// The token must carry this issuer's signature and name `subject_id` as
    /// its subject. Expired tokens are accepted; they list as no longer valid.
    pub async fn register_existing(
        &self,
        subject_id: i64,
        token: &str,
    ) -> Result<(), IssuanceError> {
        let token = is_valid_token(token)?;
        let claims = self.codec.decode_ignoring_expiry(&token)?;

        if claims.subject_id != subject_id {
            tracing::warn!(
                subject_id,
                token_subject_id = claims.subject_id,
                "Refusing to register token under a different subject"
            );
            return Err(IssuanceError::SubjectMismatch);
        }

        self.registry.register(subject_id, &token).await.map_err(|e| {
            tracing::error!(subject_id, error = %e, "Failed to register token");
            IssuanceError::RegistrationFailed
        })?;

        tracing::info!(subject_id, "JWT registered");
        Ok(())
    }

    /// Remove a token from the subject's registry
    pub async fn revoke(&self, subject_id: i64, token: &str) -> Result<(), IssuanceError> {
        let token = is_valid_token(token)?;

        if self.registry.revoke(subject_id, &token).await? {
            tracing::info!(subject_id, "JWT revoked");
            Ok(())
        } else {
            Err(IssuanceError::RevocationFailed)
        }
    }

    /// Exchange a refreshable, still-registered token for a new one.
    ///
    /// The new token keeps the subject, flags and trigger. It takes the
    /// presented token's place in the registry in one atomic swap, so of
    /// several concurrent refreshes of the same token only one succeeds.
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, IssuanceError> {
        let token = is_valid_token(token)?;
        let claims = self.codec.decode(&token)?;

        if !claims.refreshable {
            return Err(IssuanceError::NotRefreshable);
        }

        let ttl = self.refresh_ttl.unwrap_or_else(|| claims.lifetime());
        if ttl <= 0 {
            return Err(TokenError::Encoding("Token lifetime must be positive".to_string()).into());
        }

        let renewed = claims.renewed(ttl)?;
        let new_token = self.codec.encode(&renewed)?;

        let registration = if claims.revocable {
            if !self
                .registry
                .replace(claims.subject_id, &token, &new_token)
                .await?
            {
                tracing::warn!(subject_id = claims.subject_id, "Refresh attempted with revoked token");
                return Err(IssuanceError::Forbidden(REASON_TOKEN_REVOKED.to_string()));
            }
            RegistrationStatus::Registered
        } else {
            RegistrationStatus::NotRequested
        };

        tracing::info!(subject_id = renewed.subject_id, exp = renewed.exp, "JWT refreshed");

        Ok(IssuedToken {
            token: new_token,
            registration,
        })
    }
}
