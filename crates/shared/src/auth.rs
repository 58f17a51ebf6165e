//! Roles, JWT claims, and auth payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles.
///
/// Roles are a flat capability set, not a hierarchy: `Editor` does not imply
/// `Viewer`. Registration grants `[Viewer]` only; `Editor` is assigned
/// out-of-band (see the seeder binary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May list currencies and perform conversions.
    Viewer,
    /// May additionally create/delete currencies and rates.
    Editor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Viewer => write!(f, "viewer"),
            Self::Editor => write!(f, "editor"),
        }
    }
}

/// JWT claims for access tokens.
///
/// Access tokens are stateless: validity is determined entirely by signature
/// and expiry, never by a store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID).
    pub sub: Uuid,
    /// Roles held by the account at issuance.
    pub roles: Vec<Role>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new access-token claims for an account.
    #[must_use]
    pub fn new(account_id: Uuid, roles: Vec<Role>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: account_id,
            roles,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the account ID from claims.
    #[must_use]
    pub const fn account_id(&self) -> Uuid {
        self.sub
    }
}

/// JWT claims for refresh tokens.
///
/// Deliberately carries no `exp` and no roles: a refresh token stays valid
/// until revoked, and roles are re-resolved from the credential store at
/// rotation time so a role change cannot be laundered through an old token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (account ID).
    pub sub: Uuid,
    /// Unique token ID; keeps tokens issued to the same account in the same
    /// second distinct in the live set.
    pub jti: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
}

impl RefreshClaims {
    /// Creates new refresh-token claims for an account.
    #[must_use]
    pub fn new(account_id: Uuid) -> Self {
        Self {
            sub: account_id,
            jti: Uuid::new_v4(),
            iat: Utc::now().timestamp(),
        }
    }
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Authenticated account info.
    pub user: UserInfo,
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (revocable, no expiry).
    pub refresh_token: String,
    /// Access token expiration in seconds.
    pub expires_in: i64,
}

/// Account info returned in auth responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// Account ID.
    pub id: Uuid,
    /// Account email.
    pub email: String,
    /// Roles held by the account.
    pub roles: Vec<Role>,
}

/// Refresh token request.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    /// The refresh token to revoke.
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_carry_account_id_and_roles() {
        let account_id = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::minutes(15);
        let claims = Claims::new(account_id, vec![Role::Viewer], expires_at);

        assert_eq!(claims.account_id(), account_id);
        assert_eq!(claims.roles, vec![Role::Viewer]);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert!(claims.iat <= Utc::now().timestamp());
    }

    #[test]
    fn refresh_claims_have_no_expiry_field() {
        let claims = RefreshClaims::new(Uuid::new_v4());
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("exp").is_none());
        assert!(json.get("roles").is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"viewer\"");
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
        assert_eq!(Role::Editor.to_string(), "editor");
    }
}
