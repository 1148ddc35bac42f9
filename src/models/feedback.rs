use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, new_id, optional_text, required_text};

const MAX_CONTENT_CHARS: usize = 2000;

/// Visitor feedback submitted from the public site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFeedbackRequest {
    pub content: Option<String>,
    pub contact: Option<String>,
    pub page_url: Option<String>,
}

impl CreateFeedbackRequest {
    pub fn validate(&self) -> Result<(), String> {
        let content = required_text(&self.content, "content")?;
        check_length(&content, "Content", MAX_CONTENT_CHARS)?;

        if let Some(ref contact) = self.contact {
            check_length(contact.trim(), "Contact", 200)?;
        }

        Ok(())
    }

    pub fn into_feedback(self, now: DateTime<Utc>) -> Feedback {
        Feedback {
            id: new_id(),
            content: self.content.unwrap_or_default().trim().to_string(),
            contact: optional_text(self.contact),
            page_url: optional_text(self.page_url),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_validation() {
        let valid = CreateFeedbackRequest {
            content: Some("搜索结果很好用".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let empty = CreateFeedbackRequest {
            content: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let too_long = CreateFeedbackRequest {
            content: Some("好".repeat(MAX_CONTENT_CHARS + 1)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let at_limit = CreateFeedbackRequest {
            content: Some("好".repeat(MAX_CONTENT_CHARS)),
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_into_feedback() {
        let now = crate::models::now();
        let feedback = CreateFeedbackRequest {
            content: Some(" nice ".to_string()),
            contact: Some("".to_string()),
            page_url: Some("/skills/1".to_string()),
        }
        .into_feedback(now);

        assert_eq!(feedback.content, "nice");
        assert_eq!(feedback.contact, None);
        assert_eq!(feedback.page_url.as_deref(), Some("/skills/1"));
        assert_eq!(feedback.created_at, now);
    }
}
