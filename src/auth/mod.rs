//! Admin authentication: the built-in admin from configuration, Argon2
//! password checks for stored admin users, and signed bearer tokens.

pub mod password;
pub mod token;

use chrono::{DateTime, Utc};

use crate::config::AuthConfig;
use crate::models::{AdminRole, AdminUserResponse};

pub use token::{Claims, TokenError};

/// Id carried in tokens issued to the configured admin.
pub const BUILTIN_ADMIN_ID: &str = "builtin-admin";

#[derive(Clone)]
pub struct AuthSettings {
    admin_username: String,
    admin_password: String,
    secret: Vec<u8>,
    token_ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("admin_username", &self.admin_username)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthSettings {
    pub fn new(
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        token_ttl: chrono::Duration,
    ) -> Self {
        AuthSettings {
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            secret: secret.into(),
            token_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let ttl_secs = i64::try_from(config.token_ttl.as_secs()).unwrap_or(i64::MAX);
        Self::new(
            config.admin_username.clone(),
            config.admin_password.clone(),
            config.jwt_secret.as_bytes(),
            chrono::Duration::seconds(ttl_secs),
        )
    }

    /// Credentials match the configured admin.
    pub fn is_builtin_admin(&self, username: &str, password: &str) -> bool {
        let username_ok =
            password::constant_time_eq(username.as_bytes(), self.admin_username.as_bytes());
        let password_ok =
            password::constant_time_eq(password.as_bytes(), self.admin_password.as_bytes());
        username_ok && password_ok
    }

    /// The configured admin, shaped like a stored admin user.
    pub fn builtin_admin(&self) -> AdminUserResponse {
        AdminUserResponse {
            id: BUILTIN_ADMIN_ID.to_string(),
            username: self.admin_username.clone(),
            email: String::new(),
            role: AdminRole::SuperAdmin,
            is_active: true,
            last_login_at: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    pub fn issue_token(
        &self,
        user: &AdminUserResponse,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iss: token::ISSUER.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.token_ttl.num_seconds()),
        };
        token::sign(&claims, &self.secret)
    }

    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        token::verify(token, &self.secret, now.timestamp())
    }
}
