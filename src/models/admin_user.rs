use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, new_id, required_text};

/// 管理画面にログインできるユーザーの権限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[default]
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "admin" => Some(AdminRole::Admin),
            "super_admin" => Some(AdminRole::SuperAdmin),
            _ => None,
        }
    }
}

/// 管理ユーザーを表すドメインモデル。
/// ストアにはパスワードハッシュごと保存するが、API には `AdminUserResponse` を返す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    pub email: String,
    /// 旧データでは `password` キーに入っていることがある。
    #[serde(default, alias = "password", skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// クライアントへ返す管理ユーザー。パスワードハッシュを含まない。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminUserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AdminUser> for AdminUserResponse {
    fn from(user: AdminUser) -> Self {
        AdminUserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 管理ユーザー作成 API が受け取るペイロード。
/// 平文パスワードはハンドラ側でハッシュ化してから `into_admin_user` に渡す。
#[derive(Debug, Default, Deserialize)]
pub struct CreateAdminUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// 管理ユーザー更新 API の入力。
/// 更新しないフィールドは `None` のまま渡す。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAdminUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminUserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

const MIN_PASSWORD_LEN: usize = 6;

impl CreateAdminUserRequest {
    /// 必須項目 (ユーザー名・メール・パスワード) と形式を検証する。
    /// 失敗時は `Err(String)` を返し、API 層で `ApiError::Validation` に変換される。
    pub fn validate(&self) -> Result<(), String> {
        let username = required_text(&self.username, "username")?;
        check_length(&username, "Username", 100)?;

        let email = required_text(&self.email, "email")?;
        validate_email(&email)?;

        let password = self.password.as_deref().unwrap_or_default();
        if password.is_empty() {
            return Err("Missing required field: password".to_string());
        }
        validate_password(password)?;

        validate_role(self.role.as_deref())?;

        Ok(())
    }

    /// 入力をトリム・小文字化して `AdminUser` に変換する。
    pub fn into_admin_user(self, password_hash: String, now: DateTime<Utc>) -> AdminUser {
        AdminUser {
            id: new_id(),
            username: self.username.unwrap_or_default().trim().to_string(),
            email: self.email.unwrap_or_default().trim().to_lowercase(),
            password_hash: Some(password_hash),
            role: self
                .role
                .as_deref()
                .and_then(AdminRole::parse)
                .unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl UpdateAdminUserRequest {
    /// 指定されたフィールドだけ検証する。空のパスワードは「変更なし」として扱う。
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref username) = self.username {
            if username.trim().is_empty() {
                return Err("Username cannot be empty".to_string());
            }
            check_length(username.trim(), "Username", 100)?;
        }

        if let Some(ref email) = self.email {
            validate_email(email.trim())?;
        }

        if let Some(password) = self.new_password() {
            validate_password(password)?;
        }

        validate_role(self.role.as_deref())?;

        Ok(())
    }

    /// 変更対象の平文パスワード。空文字は無視する。
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn into_patch(self, password_hash: Option<String>) -> AdminUserPatch {
        AdminUserPatch {
            username: self.username.map(|u| u.trim().to_string()),
            email: self.email.map(|e| e.trim().to_lowercase()),
            password_hash,
            role: self.role.as_deref().and_then(AdminRole::parse),
            is_active: self.is_active,
        }
    }
}

impl AdminUserPatch {
    /// 指定フィールドだけを書き換え、`updated_at` は常に最新にする。
    pub fn apply(&self, user: &mut AdminUser, now: DateTime<Utc>) {
        if let Some(ref username) = self.username {
            user.username = username.clone();
        }
        if let Some(ref email) = self.email {
            user.email = email.clone();
        }
        if let Some(ref hash) = self.password_hash {
            user.password_hash = Some(hash.clone());
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }

        user.updated_at = now;
    }
}

fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if !is_valid_email(email) {
        return Err("Invalid email format".to_string());
    }
    check_length(email, "Email", 255)
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

fn validate_role(role: Option<&str>) -> Result<(), String> {
    match role {
        Some(role) if AdminRole::parse(role).is_none() => Err(format!("Unknown role: {}", role)),
        _ => Ok(()),
    }
}

/// シンプルなメールフォーマット検証。
/// 正規表現を使わず、`split('@')` などで最小限のルールをチェックしている。
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }

    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || ".-_+".contains(c);
    local.chars().all(valid_local)
        && domain.chars().all(|c| c.is_alphanumeric() || ".-".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> CreateAdminUserRequest {
        CreateAdminUserRequest {
            username: Some(" editor ".to_string()),
            email: Some("Editor@Example.com".to_string()),
            password: Some("secret1".to_string()),
            role: None,
            is_active: None,
        }
    }

    #[test]
    fn test_create_admin_user_request_validation() {
        assert!(request().validate().is_ok());

        let missing_password = CreateAdminUserRequest {
            password: None,
            ..request()
        };
        assert_eq!(
            missing_password.validate(),
            Err("Missing required field: password".to_string())
        );

        let short_password = CreateAdminUserRequest {
            password: Some("12345".to_string()),
            ..request()
        };
        assert!(short_password.validate().is_err());

        let invalid_email = CreateAdminUserRequest {
            email: Some("invalid-email".to_string()),
            ..request()
        };
        assert!(invalid_email.validate().is_err());

        let bad_role = CreateAdminUserRequest {
            role: Some("root".to_string()),
            ..request()
        };
        assert!(bad_role.validate().is_err());
    }

    #[test]
    fn test_into_admin_user_normalizes_fields() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let user = request().into_admin_user("hash".to_string(), now);

        assert_eq!(user.username, "editor");
        assert_eq!(user.email, "editor@example.com");
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
        assert_eq!(user.role, AdminRole::Admin);
        assert!(user.is_active);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_update_admin_user_request_validation() {
        let valid = UpdateAdminUserRequest {
            role: Some("super_admin".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let blank_password = UpdateAdminUserRequest {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(blank_password.validate().is_ok());
        assert_eq!(blank_password.new_password(), None);

        let empty_username = UpdateAdminUserRequest {
            username: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(empty_username.validate().is_err());

        let invalid_email = UpdateAdminUserRequest {
            email: Some("user@domain".to_string()),
            ..Default::default()
        };
        assert!(invalid_email.validate().is_err());
    }

    #[test]
    fn test_patch_apply() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let mut user = request().into_admin_user("old".to_string(), created);

        let patch = UpdateAdminUserRequest {
            role: Some("super_admin".to_string()),
            is_active: Some(false),
            ..Default::default()
        }
        .into_patch(Some("new".to_string()));
        patch.apply(&mut user, later);

        assert_eq!(user.role, AdminRole::SuperAdmin);
        assert!(!user.is_active);
        assert_eq!(user.password_hash.as_deref(), Some("new"));
        assert_eq!(user.created_at, created);
        assert_eq!(user.updated_at, later);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name@domain.co.uk"));
        assert!(is_valid_email("user+tag@example.org"));

        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@domain"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = request().into_admin_user("argon-hash".to_string(), Utc::now());
        let json = serde_json::to_string(&AdminUserResponse::from(user)).unwrap();

        assert!(!json.contains("argon-hash"));
        assert!(!json.contains("password"));
        assert!(json.contains(r#""role":"admin""#));
    }

    #[test]
    fn test_legacy_password_key_is_read() {
        let json = r#"{"id":"u1","username":"admin","email":"a@b.com","password":"$argon2id$x","role":"super_admin"}"#;
        let user: AdminUser = serde_json::from_str(json).expect("Failed to deserialize admin user");

        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$x"));
        assert_eq!(user.role, AdminRole::SuperAdmin);
        assert!(user.is_active);
    }
}
