// Comments: in-memory session store and the persistence contract
//
// The wire format matches the comment service:
// {videoName, comments: [{text, timeRange, shapeInfo, timestamp}]}

pub mod client;
pub mod store;

use crate::error::AnnotateResult;
use crate::geometry::{Rectangle, ShapeCapture};
use crate::timeline::TimeRange;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub use client::CommentsClient;
pub use store::{CommentStore, PendingSave, SaveOutcome};

/// A submitted comment. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    text: String,
    time_range: TimeRange,
    shape: Option<ShapeCapture>,
    created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: impl Into<String>, time_range: TimeRange, shape: Option<ShapeCapture>) -> Self {
        Self {
            text: text.into(),
            time_range,
            shape,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn shape(&self) -> Option<&ShapeCapture> {
        self.shape.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Wire record; the capture geometry is dropped, only the corners remain.
    pub fn to_record(&self) -> CommentRecord {
        CommentRecord {
            text: self.text.clone(),
            time_range: self.time_range,
            shape_info: self.shape.as_ref().map(|capture| ShapeInfo {
                shape: *capture.shape(),
            }),
            timestamp: self.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShapeInfo {
    pub shape: Rectangle,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub text: String,
    pub time_range: TimeRange,
    pub shape_info: Option<ShapeInfo>,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/save-comments`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommentPayload {
    #[serde(rename = "videoName")]
    pub video_id: String,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    pub saved: usize,
    pub message: String,
}

/// Where persistable payloads go. Implementations report every failure as
/// `PersistenceFailed` and never retry.
pub trait CommentSink: Send + Sync {
    fn save(&self, payload: CommentPayload) -> BoxFuture<'_, AnnotateResult<SaveReceipt>>;
}

/// `video_YYYYMMDD_HHMMSS`, for sessions without a video identifier.
pub fn default_video_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("video_%Y%m%d_%H%M%S").to_string()
}
