use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use crate::{
    error::ApiError,
    handlers::{item, ValidJson},
    models::{self, CreateFeedbackRequest},
    state::AppState,
};

/// Visitor feedback from the public site
/// POST /api/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().map_err(ApiError::Validation)?;

    let feedback = state
        .store
        .create_feedback(&request.into_feedback(models::now()))
        .await?;

    info!("Stored feedback {}", feedback.id);
    Ok((StatusCode::CREATED, item(feedback)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::handlers::testing::{send, test_app};

    #[tokio::test]
    async fn test_submit_feedback() {
        let (app, _state, dir) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/feedback",
            None,
            Some(json!({"content": "  Great catalog  ", "contact": "me@example.com"})),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(body["item"]["content"], "Great catalog");

        let stored = std::fs::read_to_string(dir.path().join("feedback.dev.json")).unwrap();
        assert!(stored.contains("Great catalog"));
    }

    #[tokio::test]
    async fn test_feedback_limits() {
        let (app, _state, _dir) = test_app();

        let (status, _) = send(&app, "POST", "/api/feedback", None, Some(json!({"content": "  "}))).await;
        assert_eq!(status, 400);

        let (status, body) = send(
            &app,
            "POST",
            "/api/feedback",
            None,
            Some(json!({"content": "x".repeat(2001)})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
