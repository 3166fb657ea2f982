//! Authentication and authorization
//!
//! A JWT only carries identifiers. It is honoured while the session row it
//! names exists and has not expired, so signing out or revoking a session
//! invalidates the token immediately.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{TenantContext, TenantId, UserId};
use domain_identity::Role;

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Tenant ID
    pub tid: Uuid,
    /// Session ID
    pub sid: Uuid,
    pub role: Role,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Session is no longer active")]
    SessionInactive,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Creates a new JWT token for a session
pub fn create_token(
    user_id: Uuid,
    tenant_id: Uuid,
    session_id: Uuid,
    role: Role,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id,
        tid: tenant_id,
        sid: session_id,
        role,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// The authenticated caller, inserted into request extensions by the auth
/// middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub tenant: TenantContext,
    pub session_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            tenant: TenantContext::new(TenantId::from_uuid(claims.tid), UserId::from_uuid(claims.sub)),
            session_id: claims.sid,
            role: claims.role,
        }
    }

    pub fn user_id(&self) -> Uuid {
        *self.tenant.user_id.as_uuid()
    }

    /// Fails unless the caller's role grants `permitted`
    pub fn require(&self, permitted: fn(&Role) -> bool, action: &str) -> Result<(), AuthError> {
        if permitted(&self.role) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(format!("{} is not allowed for role '{}'", action, self.role)))
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let (user, tenant, session) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let token = create_token(user, tenant, session, Role::Member, SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.tid, tenant);
        assert_eq!(claims.sid, session);
        assert_eq!(claims.role, Role::Member);

        let auth = AuthContext::from_claims(&claims);
        assert_eq!(auth.user_id(), user);
        assert!(auth.require(Role::can_invite, "Inviting members").is_err());
        assert!(auth.require(|_| true, "Reading").is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Role::Owner, SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
        assert!(matches!(validate_token("not-a-jwt", SECRET), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            tid: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            role: Role::Admin,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(AuthError::TokenExpired)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn role() -> impl Strategy<Value = Role> {
            prop_oneof![Just(Role::Owner), Just(Role::Admin), Just(Role::Member)]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn tokens_carry_their_identifiers(
                user in any::<u128>(),
                tenant in any::<u128>(),
                session in any::<u128>(),
                role in role(),
            ) {
                let (user, tenant, session) =
                    (Uuid::from_u128(user), Uuid::from_u128(tenant), Uuid::from_u128(session));
                let token = create_token(user, tenant, session, role, SECRET, 300).unwrap();
                let claims = validate_token(&token, SECRET).unwrap();
                prop_assert_eq!(claims.sub, user);
                prop_assert_eq!(claims.tid, tenant);
                prop_assert_eq!(claims.sid, session);
                prop_assert_eq!(claims.role, role);
                prop_assert!(claims.exp > claims.iat);
            }
        }
    }
}
