use super::{CommentPayload, CommentSink, SaveReceipt};
use crate::error::{AnnotateError, AnnotateResult};
use crate::web::storage::CommentIndex;
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct SuccessBody {
    message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    details: Option<String>,
}

/// HTTP sink for the comment service. One request per save, no retries.
#[derive(Debug, Clone)]
pub struct CommentsClient {
    http: reqwest::Client,
    base_url: String,
}

impl CommentsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn save_payload(&self, payload: &CommentPayload) -> AnnotateResult<SaveReceipt> {
        let url = format!("{}/api/save-comments", self.base_url);
        tracing::debug!(
            "POST {} ({} comments for {})",
            url,
            payload.comments.len(),
            payload.video_id
        );

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| AnnotateError::persistence(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorBody>().await {
                Ok(ErrorBody {
                    error,
                    details: Some(details),
                }) => format!("{}: {}", error, details),
                Ok(ErrorBody { error, details: None }) => error,
                Err(_) => "unreadable error response".to_string(),
            };
            return Err(AnnotateError::persistence(format!("{} ({})", reason, status)));
        }

        let body: SuccessBody = response
            .json()
            .await
            .map_err(|e| AnnotateError::persistence(format!("unexpected response: {}", e)))?;
        Ok(SaveReceipt {
            saved: payload.comments.len(),
            message: body.message,
        })
    }

    pub async fn fetch_index(&self) -> AnnotateResult<CommentIndex> {
        let url = format!("{}/api/comments", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnnotateError::persistence(format!("request to {} failed: {}", url, e)))?;

        response
            .json()
            .await
            .map_err(|e| AnnotateError::persistence(format!("unexpected response: {}", e)))
    }
}

impl CommentSink for CommentsClient {
    fn save(&self, payload: CommentPayload) -> BoxFuture<'_, AnnotateResult<SaveReceipt>> {
        async move { self.save_payload(&payload).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::{Comment, CommentStore};
    use crate::geometry::{fit, Point, Rectangle, ShapeCapture};
    use crate::timeline::TimeRange;
    use crate::web::server::{build_router, AppState};
    use crate::web::storage::CommentRepository;
    use std::path::Path;
    use std::sync::Arc;

    async fn spawn_service(root: &Path) -> String {
        let state = Arc::new(AppState {
            repository: CommentRepository::new(root),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_store_persists_through_service() {
        let dir = tempfile::tempdir().unwrap();
        let client = CommentsClient::new(spawn_service(dir.path()).await);

        let geometry = fit(1280.0, 720.0, 640.0, 360.0).unwrap();
        let shape = ShapeCapture::new(
            Rectangle::new(Point::new(5.0, 5.0), Point::new(50.0, 40.0)),
            geometry,
        )
        .unwrap();

        let mut store = CommentStore::new("rally");
        store
            .add(Comment::new("serve", TimeRange { start: 1.0, end: 2.0 }, Some(shape)))
            .unwrap();
        store
            .add(Comment::new("return", TimeRange::at(2.5), None))
            .unwrap();

        let receipt = store.persist(&client).await.unwrap().unwrap();
        assert_eq!(receipt.saved, 2);
        assert_eq!(receipt.message, "Comments saved successfully");

        store
            .add(Comment::new("winner", TimeRange::at(4.0), None))
            .unwrap();
        store.persist(&client).await.unwrap();

        let index = client.fetch_index().await.unwrap();
        let stored = &index["rally"].comments;
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0]["shapeInfo"]["shape"]["end"]["x"], 50.0);
        assert!(stored[1]["shapeInfo"].is_null());
        assert_eq!(stored[2]["text"], "winner");
    }

    #[tokio::test]
    async fn test_rejection_surfaces_service_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = CommentsClient::new(spawn_service(dir.path()).await);

        let mut store = CommentStore::new("../outside");
        store
            .add(Comment::new("x", TimeRange::at(0.0), None))
            .unwrap();

        let err = store.persist(&client).await.unwrap_err();
        match err {
            AnnotateError::PersistenceFailed(msg) => {
                assert!(msg.contains("Invalid videoName"), "{}", msg);
                assert!(msg.contains("400"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.unsaved(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_persistence_failure() {
        // Grab a free port, then close it again
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = CommentsClient::new(format!("http://{}", addr));
        let payload = CommentPayload {
            video_id: "clip".to_string(),
            comments: Vec::new(),
        };
        let err = client.save(payload).await.unwrap_err();
        assert!(matches!(err, AnnotateError::PersistenceFailed(_)));
        assert!(matches!(
            client.fetch_index().await.unwrap_err(),
            AnnotateError::PersistenceFailed(_)
        ));
    }
}
