/// Feedback endpoint
use crate::{
    error::{AppError, AppResult},
    AppContext,
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub status: &'static str,
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/feedback", post(submit_feedback))
}

pub async fn submit_feedback(
    State(ctx): State<AppContext>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if req.message.trim().is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    ctx.mailer
        .send_feedback(req.name.as_deref(), &req.email, req.message.trim())
        .await?;

    Ok(Json(FeedbackResponse { status: "received" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, message: &str) -> FeedbackRequest {
        FeedbackRequest {
            name: Some("Ola".to_string()),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_valid_feedback() {
        assert!(request("ola@example.no", "Savner søk på adresse").validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        assert!(request("not-an-email", "Hei").validate().is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(request("ola@example.no", "").validate().is_err());
    }
}
