use crate::web::server::AppState;
use crate::web::storage::{is_valid_video_name, CommentIndex};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Error body: `{"error": ..., "details": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn bad_request(error: &str, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.to_string(),
            details: Some(details.into()),
        }
    }

    fn internal(error: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.to_string(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub message: String,
}

pub async fn get_comments(State(state): State<Arc<AppState>>) -> Result<Json<CommentIndex>, ApiError> {
    let index = state.repository.load_index().map_err(|e| {
        tracing::error!("Failed to load comment index: {}", e);
        ApiError::internal(e.public_message())
    })?;
    Ok(Json(index))
}

pub async fn save_comments(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request("Invalid JSON", e.to_string()))?;
    let (video_name, comments) = validate_save_request(body)?;

    tracing::info!("Saving {} comments for {}", comments.len(), video_name);
    state
        .repository
        .append(&video_name, comments)
        .await
        .map_err(|e| {
            tracing::error!("{}", e);
            ApiError::internal(e.public_message())
        })?;

    Ok(Json(SaveResponse {
        message: "Comments saved successfully".to_string(),
    }))
}

/// Checks in order: videoName, comments array, then every comment.
/// The first failure wins and nothing is written.
pub fn validate_save_request(body: Value) -> Result<(String, Vec<Value>), ApiError> {
    let Value::Object(mut body) = body else {
        return Err(ApiError::bad_request(
            "Invalid videoName",
            "videoName must be a non-empty string",
        ));
    };

    // Names that would escape the comments root get the same answer as empty ones
    let video_name = match body.remove("videoName") {
        Some(Value::String(name)) if is_valid_video_name(&name) => name,
        _ => {
            return Err(ApiError::bad_request(
                "Invalid videoName",
                "videoName must be a non-empty string",
            ))
        }
    };

    let comments = match body.remove("comments") {
        Some(Value::Array(comments)) => comments,
        _ => {
            return Err(ApiError::bad_request(
                "Invalid comments",
                "comments must be an array",
            ))
        }
    };

    if let Some(position) = comments.iter().position(|c| !is_valid_comment(c)) {
        return Err(ApiError::bad_request(
            "Invalid comment format",
            format!(
                "Each comment must have text and timeRange properties (comment {})",
                position
            ),
        ));
    }

    Ok((video_name, comments))
}

fn is_valid_comment(comment: &Value) -> bool {
    let has_text = comment.get("text").map(Value::is_string).unwrap_or(false);
    let has_range = comment
        .get("timeRange")
        .map(|range| {
            range.get("start").map(Value::is_number).unwrap_or(false)
                && range.get("end").map(Value::is_number).unwrap_or(false)
        })
        .unwrap_or(false);
    has_text && has_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::server::build_router;
    use crate::web::storage::CommentRepository;
    use axum::{body::Body, http::Request, Router};
    use serde_json::json;
    use std::path::Path;
    use tower::ServiceExt;

    fn app(root: &Path) -> Router {
        build_router(Arc::new(AppState {
            repository: CommentRepository::new(root),
        }))
    }

    async fn post(app: &Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/save-comments")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_index(app: &Router) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri("/api/comments")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn comment(text: &str, start: f64, end: f64) -> Value {
        json!({
            "text": text,
            "timeRange": {"start": start, "end": end},
            "shapeInfo": null,
            "timestamp": "2024-03-09T14:05:00Z"
        })
    }

    #[tokio::test]
    async fn test_comments_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, body) = post(&app, r#"{"videoName":"x","comments":"not-an-array"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid comments");
        assert_eq!(body["details"], "comments must be an array");
        assert!(!dir.path().join("x.json").exists());
    }

    #[tokio::test]
    async fn test_video_name_is_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        for body in [
            r#"{"comments":[]}"#,
            r#"{"videoName":"","comments":[]}"#,
            r#"{"videoName":42,"comments":"nope"}"#,
            r#"{"videoName":"../escape","comments":[]}"#,
            r#"{"videoName":"nested/clip","comments":[]}"#,
            r#"[1,2,3]"#,
        ] {
            let (status, response) = post(&app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(response["error"], "Invalid videoName", "{}", body);
            assert_eq!(
                response["details"], "videoName must be a non-empty string",
                "{}",
                body
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post(&app(dir.path()), "{ nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON");
    }

    #[tokio::test]
    async fn test_any_bad_comment_rejects_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let payload = json!({
            "videoName": "clip",
            "comments": [comment("fine", 1.0, 2.0), {"text": "no range"}]
        });
        let (status, body) = post(&app, &payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid comment format");
        assert!(!dir.path().join("clip.json").exists());

        let payload = json!({
            "videoName": "clip",
            "comments": [{"text": 7, "timeRange": {"start": 0, "end": 1}}]
        });
        let (status, _) = post(&app, &payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_saves_append_and_index_lists_them() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let first = json!({"videoName": "clip", "comments": [comment("a", 0.0, 1.0), comment("b", 1.0, 2.0)]});
        let (status, body) = post(&app, &first.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Comments saved successfully");

        let second = json!({"videoName": "clip", "comments": [comment("c", 2.0, 3.0)]});
        post(&app, &second.to_string()).await;

        let empty = json!({"videoName": "other", "comments": []});
        let (status, _) = post(&app, &empty.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, index) = get_index(&app).await;
        assert_eq!(status, StatusCode::OK);
        let texts: Vec<&str> = index["clip"]["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(index["other"]["comments"], json!([]));
    }

    #[tokio::test]
    async fn test_unwritable_root_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let app = app(&blocker.join("comments"));

        let payload = json!({"videoName": "clip", "comments": [comment("a", 0.0, 1.0)]});
        let (status, body) = post(&app, &payload.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to create comments directory");
    }

    #[tokio::test]
    async fn test_empty_store_has_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let (status, index) = get_index(&app(&dir.path().join("missing"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(index, json!({}));
    }
}
