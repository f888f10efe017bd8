use super::{Comment, CommentPayload, CommentSink, SaveReceipt};
use crate::error::{AnnotateError, AnnotateResult};
use crate::geometry::{OverlayRect, ViewportGeometry};
use tracing::{info, warn};

/// Comments of one video session, in submission order.
///
/// The comment service appends whatever it receives, so only comments it
/// has not acknowledged yet are sent; see [`CommentStore::prepare_save`].
#[derive(Debug, Clone)]
pub struct CommentStore {
    video_id: String,
    comments: Vec<Comment>,
    /// Comments before this index are known to be persisted.
    acknowledged: usize,
    save_outstanding: bool,
    /// A save was asked for while another was in flight.
    resave_requested: bool,
}

/// A save handed to a sink and not yet finished.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub payload: CommentPayload,
    upto: usize,
}

/// What [`CommentStore::finish_save`] reports back.
#[derive(Debug)]
pub struct SaveOutcome {
    pub result: AnnotateResult<SaveReceipt>,
    /// Save owed to a request that arrived while this one was in flight.
    pub follow_up: Option<PendingSave>,
}

impl CommentStore {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            comments: Vec::new(),
            acknowledged: 0,
            save_outstanding: false,
            resave_requested: false,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Number of comments not yet acknowledged by the sink.
    pub fn unsaved(&self) -> usize {
        self.comments.len() - self.acknowledged
    }

    pub fn add(&mut self, comment: Comment) -> AnnotateResult<usize> {
        if comment.text().trim().is_empty() {
            return Err(AnnotateError::invalid_comment("text must not be empty"));
        }
        let range = comment.time_range();
        if !range.is_valid() {
            return Err(AnnotateError::invalid_comment(format!(
                "time range {}..{} is inverted or not finite",
                range.start, range.end
            )));
        }

        self.comments.push(comment);
        Ok(self.comments.len() - 1)
    }

    /// Snapshot of the whole session, shapes reduced to their corners.
    pub fn to_persistable_payload(&self, video_id: &str) -> CommentPayload {
        CommentPayload {
            video_id: video_id.to_string(),
            comments: self.comments.iter().map(Comment::to_record).collect(),
        }
    }

    /// Payload with every comment the sink has not acknowledged, as of now.
    ///
    /// Returns `None` when there is nothing to send or a save is already
    /// outstanding. In the latter case the request is remembered and
    /// [`finish_save`](Self::finish_save) hands back the follow-up save.
    pub fn prepare_save(&mut self) -> Option<PendingSave> {
        if self.save_outstanding {
            self.resave_requested = true;
            return None;
        }
        if self.acknowledged == self.comments.len() {
            return None;
        }
        let upto = self.comments.len();
        let payload = CommentPayload {
            video_id: self.video_id.clone(),
            comments: self.comments[self.acknowledged..upto]
                .iter()
                .map(Comment::to_record)
                .collect(),
        };
        self.save_outstanding = true;
        Some(PendingSave { payload, upto })
    }

    /// Record the sink's answer for `pending`. Local comments are kept
    /// either way; failed comments are resent by the next save.
    ///
    /// If a save was requested while `pending` was in flight, a successful
    /// answer comes back with the follow-up save already prepared. After a
    /// failure the request is dropped and the error is left to the caller.
    pub fn finish_save(&mut self, pending: PendingSave, result: AnnotateResult<SaveReceipt>) -> SaveOutcome {
        self.save_outstanding = false;
        let resave = std::mem::take(&mut self.resave_requested);
        match result {
            Ok(receipt) => {
                self.acknowledged = self.acknowledged.max(pending.upto);
                info!(
                    "Saved {} comments for {} ({} unsaved)",
                    receipt.saved,
                    self.video_id,
                    self.unsaved()
                );
                let follow_up = if resave { self.prepare_save() } else { None };
                SaveOutcome {
                    result: Ok(receipt),
                    follow_up,
                }
            }
            Err(e) => {
                warn!("Saving comments for {} failed: {}", self.video_id, e);
                SaveOutcome {
                    result: Err(e),
                    follow_up: None,
                }
            }
        }
    }

    /// Send unsaved comments to `sink`, including any follow-up owed to a
    /// request made while an earlier save was in flight.
    ///
    /// `Ok(None)` when there was nothing to send, or when another save is
    /// outstanding; that save's [`finish_save`](Self::finish_save) then
    /// carries these comments as its follow-up.
    pub async fn persist<S: CommentSink + ?Sized>(&mut self, sink: &S) -> AnnotateResult<Option<SaveReceipt>> {
        let Some(mut pending) = self.prepare_save() else {
            return Ok(None);
        };
        loop {
            let result = sink.save(pending.payload.clone()).await;
            let outcome = self.finish_save(pending, result);
            let receipt = outcome.result?;
            match outcome.follow_up {
                Some(next) => pending = next,
                None => return Ok(Some(receipt)),
            }
        }
    }

    /// Comments whose time range covers `time`, in display order.
    pub fn active_at(&self, time: f64) -> impl Iterator<Item = &Comment> {
        self.comments
            .iter()
            .filter(move |c| c.time_range().contains(time))
    }

    /// Draw instructions for the shapes of comments active at `time`,
    /// mapped into the `current` container.
    pub fn overlays_at(&self, time: f64, current: &ViewportGeometry) -> AnnotateResult<Vec<OverlayRect>> {
        self.active_at(time)
            .filter_map(|c| c.shape().map(|shape| (c, shape)))
            .map(|(c, shape)| -> AnnotateResult<OverlayRect> {
                let rect = shape.replay(current)?;
                Ok(OverlayRect::from_rectangle(&rect, c.text()))
            })
            .collect()
    }
}
