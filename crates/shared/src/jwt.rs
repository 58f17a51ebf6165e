//! JWT token service: issuance, verification, and revocation.
//!
//! Access tokens are short-lived and stateless. Refresh tokens carry no
//! expiry and are valid only while present in the live set owned by this
//! service; logout removes them. The live set holds SHA-256 digests rather
//! than raw tokens and is guarded by a single mutex, so concurrent issue,
//! verify, and revoke calls observe consistent membership.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, RefreshClaims, Role};

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing access tokens.
    pub access_secret: String,
    /// Secret key for signing refresh tokens.
    pub refresh_secret: String,
    /// Access token expiration in minutes.
    pub access_token_expires_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: "change-me-in-production".to_string(),
            refresh_secret: "change-me-too-in-production".to_string(),
            access_token_expires_minutes: 15,
        }
    }
}

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// Access token has expired.
    #[error("token has expired")]
    Expired,

    /// Signature verification failed, or a refresh token is not live.
    #[error("invalid token")]
    Invalid,

    /// Revocation target is not currently live.
    #[error("refresh token is not active")]
    NotActive,
}

/// Token service for the access/refresh lifecycle.
pub struct JwtService {
    config: JwtConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    /// SHA-256 digests of refresh tokens that have been issued and not
    /// revoked. Never exposed; all access goes through this service.
    live_refresh: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &"[hidden]")
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a new token service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(config.refresh_secret.as_bytes());
        Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
            live_refresh: Mutex::new(HashSet::new()),
        }
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn live_set(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.live_refresh
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Issues an access token carrying the account's roles.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encoding` if token generation fails.
    pub fn issue_access_token(
        &self,
        account_id: Uuid,
        roles: &[Role],
    ) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::minutes(self.config.access_token_expires_minutes);
        let claims = Claims::new(account_id, roles.to_vec(), expires_at);

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Issues a refresh token and adds it to the live set.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encoding` if token generation fails.
    pub fn issue_refresh_token(&self, account_id: Uuid) -> Result<String, JwtError> {
        let claims = RefreshClaims::new(account_id);

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;

        self.live_set().insert(Self::hash_token(&token));
        Ok(token)
    }

    /// Verifies an access token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired and
    /// `JwtError::Invalid` on any other verification failure.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.access_decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid,
            })
    }

    /// Verifies a refresh token and returns the account ID it was issued to.
    ///
    /// Expiry is not checked: refresh tokens stay valid until revoked. A
    /// token whose signature verifies but whose digest is absent from the
    /// live set (revoked, or never issued by this process) is `Invalid`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Invalid` on signature failure or a non-live token.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| JwtError::Invalid)?;

        if !self.live_set().contains(&Self::hash_token(token)) {
            return Err(JwtError::Invalid);
        }

        Ok(claims.sub)
    }

    /// Revokes a refresh token, removing it from the live set.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::NotActive` if the token is not currently live;
    /// revoking the same token twice fails the second time.
    pub fn revoke_refresh_token(&self, token: &str) -> Result<(), JwtError> {
        if self.live_set().remove(&Self::hash_token(token)) {
            Ok(())
        } else {
            Err(JwtError::NotActive)
        }
    }

    /// Returns the access token expiration in seconds.
    #[must_use]
    pub const fn access_token_expires_in(&self) -> i64 {
        self.config.access_token_expires_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new(JwtConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            access_token_expires_minutes: 15,
        })
    }

    #[test]
    fn access_token_round_trip() {
        let service = create_test_service();
        let account_id = Uuid::new_v4();

        let token = service
            .issue_access_token(account_id, &[Role::Viewer, Role::Editor])
            .unwrap();
        let claims = service.verify_access_token(&token).unwrap();

        assert_eq!(claims.account_id(), account_id);
        assert_eq!(claims.roles, vec![Role::Viewer, Role::Editor]);
    }

    #[test]
    fn expired_access_token_is_reported_as_expired() {
        let service = JwtService::new(JwtConfig {
            access_secret: "access-test-secret".to_string(),
            refresh_secret: "refresh-test-secret".to_string(),
            // Far enough in the past to beat the default decode leeway.
            access_token_expires_minutes: -2,
        });

        let token = service
            .issue_access_token(Uuid::new_v4(), &[Role::Viewer])
            .unwrap();
        assert!(matches!(
            service.verify_access_token(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn garbage_access_token_is_invalid() {
        let service = create_test_service();
        assert!(matches!(
            service.verify_access_token("not.a.token"),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn access_token_rejected_as_refresh_token() {
        // Different signing secrets per token class.
        let service = create_test_service();
        let token = service
            .issue_access_token(Uuid::new_v4(), &[Role::Viewer])
            .unwrap();
        assert!(matches!(
            service.verify_refresh_token(&token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn refresh_token_lifecycle() {
        let service = create_test_service();
        let account_id = Uuid::new_v4();

        let token = service.issue_refresh_token(account_id).unwrap();
        assert_eq!(service.verify_refresh_token(&token).unwrap(), account_id);

        service.revoke_refresh_token(&token).unwrap();
        assert!(matches!(
            service.verify_refresh_token(&token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn revoking_twice_fails_the_second_time() {
        let service = create_test_service();
        let token = service.issue_refresh_token(Uuid::new_v4()).unwrap();

        assert!(service.revoke_refresh_token(&token).is_ok());
        assert!(matches!(
            service.revoke_refresh_token(&token),
            Err(JwtError::NotActive)
        ));
    }

    #[test]
    fn never_issued_refresh_token_is_invalid() {
        let issuing = create_test_service();
        let verifying = create_test_service();

        // Signature verifies (same secret) but the token was issued by a
        // different service instance, so it is absent from the live set.
        let token = issuing.issue_refresh_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            verifying.verify_refresh_token(&token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn revoking_unknown_token_is_not_active() {
        let service = create_test_service();
        assert!(matches!(
            service.revoke_refresh_token("never-seen"),
            Err(JwtError::NotActive)
        ));
    }
}
