// Models module

pub mod admin_user;
pub mod category;
pub mod feedback;
pub mod link;
pub mod registered_user;
pub mod skill;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

// Re-export commonly used types
pub use admin_user::{
    AdminRole, AdminUser, AdminUserPatch, AdminUserResponse, CreateAdminUserRequest,
    UpdateAdminUserRequest,
};
pub use category::{Category, CategoryPatch, CreateCategoryRequest, UpdateCategoryRequest};
pub use feedback::{CreateFeedbackRequest, Feedback};
pub use link::{CreateLinkRequest, Link, LinkPatch, UpdateLinkRequest};
pub use registered_user::{AuthorInfo, RegisteredRole, RegisteredUser};
pub use skill::{
    CreateSkillRequest, DifficultyLevel, Skill, SkillPatch, SkillStatus, UpdateSkillRequest,
};

/// Current time truncated to microseconds, the precision Postgres keeps for
/// `timestamptz`, so records read back from either store compare equal.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fresh record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trim a required text field, rejecting missing or blank values.
pub(crate) fn required_text(value: &Option<String>, field: &str) -> Result<String, String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(format!("Missing required field: {}", field)),
    }
}

/// Trim an optional text field; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub(crate) fn check_length(value: &str, field: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} cannot exceed {} characters", field, max));
    }
    Ok(())
}

/// `http://` or `https://` followed by a host.
pub(crate) fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !url.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
