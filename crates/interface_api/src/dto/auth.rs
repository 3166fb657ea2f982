//! Auth DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_identity::{NewMember, Role, SignIn, SignUp};
use infra_db::repositories::{ProfileRow, SessionRow, TenantRow, UserRow};

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 120))]
    pub organization_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
}

impl From<SignUpRequest> for SignUp {
    fn from(request: SignUpRequest) -> Self {
        SignUp {
            organization_name: request.organization_name,
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl From<SignInRequest> for SignIn {
    fn from(request: SignInRequest) -> Self {
        SignIn {
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_member_role")]
    pub role: Role,
}

fn default_member_role() -> Role {
    Role::Member
}

impl From<InviteMemberRequest> for NewMember {
    fn from(request: InviteMemberRequest) -> Self {
        NewMember {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            role: request.role,
        }
    }
}

/// Returned by sign-up and sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub tenant: TenantRow,
    pub user: UserRow,
    pub profile: ProfileRow,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub tenant: TenantRow,
    pub user: UserRow,
    pub profile: ProfileRow,
    pub session_id: uuid::Uuid,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user: UserRow,
    pub profile: ProfileRow,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionRow,
    /// True for the session the request was made with
    pub current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_request_validation() {
        let request: SignUpRequest = serde_json::from_value(serde_json::json!({
            "organization_name": "Riverside Neighbors",
            "email": "not-an-email",
            "password": "short"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("organization_name"));
    }

    #[test]
    fn test_invited_role_defaults_to_member() {
        let request: InviteMemberRequest = serde_json::from_value(serde_json::json!({
            "email": "new@example.org",
            "password": "longenough1",
            "first_name": "Pat"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(NewMember::from(request).role, Role::Member);
    }
}
