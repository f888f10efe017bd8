// Preview sampler: thumbnails for a timeline selection
//
// All seeks go through the one shared decode resource, strictly one at a
// time. A newer request (or `cancel`) bumps the generation token; the
// request in flight notices at its next suspend point and gives up.

use super::{DecodeResource, SeekCompletion};
use crate::error::{AnnotateError, AnnotateResult};
use crate::timeline::TimeRange;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Upper bound on waiting for the position-restoring seek to land.
const RESTORE_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest preview strip a single request may ask for.
pub const MAX_PREVIEW_FRAMES: usize = 120;

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 90,
            jpeg_quality: 70,
        }
    }
}

/// One thumbnail of the preview strip. `image` holds JPEG bytes.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub time: f64,
    pub image: Vec<u8>,
}

pub struct PreviewSampler<R: DecodeResource> {
    resource: Arc<Mutex<R>>,
    generation: watch::Sender<u64>,
    /// Restore seek left behind by a lease that was dropped without being released.
    settling: StdMutex<Option<SeekCompletion>>,
    thumbnail: ThumbnailConfig,
}

impl<R: DecodeResource> PreviewSampler<R> {
    pub fn new(resource: Arc<Mutex<R>>) -> Self {
        Self::with_thumbnail(resource, ThumbnailConfig::default())
    }

    pub fn with_thumbnail(resource: Arc<Mutex<R>>, thumbnail: ThumbnailConfig) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            resource,
            generation,
            settling: StdMutex::new(None),
            thumbnail,
        }
    }

    pub fn resource(&self) -> &Arc<Mutex<R>> {
        &self.resource
    }

    /// Abandon whatever sample is in flight, e.g. when the player goes away.
    pub fn cancel(&self) {
        let generation = self.next_generation();
        debug!("Preview sampling cancelled (generation {})", generation);
    }

    fn next_generation(&self) -> u64 {
        let mut current = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            current = *g;
        });
        current
    }

    /// Capture `count` thumbnails evenly spaced over `range`, both ends included.
    ///
    /// Returns `SampleAbandoned` if a newer request or [`cancel`](Self::cancel)
    /// supersedes this one; partial results are never returned. The playback
    /// position, volume and play state are restored on every exit path.
    pub async fn sample(&self, range: TimeRange, count: usize) -> AnnotateResult<Vec<PreviewFrame>> {
        if !(2..=MAX_PREVIEW_FRAMES).contains(&count) {
            return Err(AnnotateError::sample_failed(format!(
                "frame count must be between 2 and {}, got {}",
                MAX_PREVIEW_FRAMES, count
            )));
        }
        if !range.is_valid() || range.start < 0.0 {
            return Err(AnnotateError::sample_failed(format!(
                "invalid range {:.3}..{:.3}",
                range.start, range.end
            )));
        }

        let generation = self.next_generation();
        let mut token = self.generation.subscribe();

        let guard = tokio::select! {
            biased;
            _ = superseded(&mut token, generation) => return Err(AnnotateError::SampleAbandoned),
            guard = self.resource.lock() => guard,
        };

        let leftover = self
            .settling
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(completion) = leftover {
            // Dropping the wait (superseded) parks the restore again for the next sample
            let parked = ParkedRestore::new(&self.settling, completion);
            tokio::select! {
                biased;
                _ = superseded(&mut token, generation) => return Err(AnnotateError::SampleAbandoned),
                _ = parked.wait() => {}
            }
        }

        let mut lease = PlaybackLease::acquire(guard, &self.settling);
        let outcome = self
            .capture_frames(&mut lease, range, count, &mut token, generation)
            .await;
        lease.release().await;

        match &outcome {
            Ok(frames) => info!(
                "Sampled {} preview frames over {:.2}s..{:.2}s",
                frames.len(),
                range.start,
                range.end
            ),
            Err(AnnotateError::SampleAbandoned) => {
                debug!("Preview sample generation {} abandoned", generation)
            }
            Err(e) => warn!("Preview sampling failed: {}", e),
        }
        outcome
    }

    async fn capture_frames(
        &self,
        lease: &mut PlaybackLease<'_, R>,
        range: TimeRange,
        count: usize,
        token: &mut watch::Receiver<u64>,
        generation: u64,
    ) -> AnnotateResult<Vec<PreviewFrame>> {
        let mut frames = Vec::new();

        for time in sample_times(range, count) {
            let completion = lease.resource.seek(time);
            // The frame may only be read after this exact seek reports back
            let seeked = tokio::select! {
                biased;
                _ = superseded(token, generation) => return Err(AnnotateError::SampleAbandoned),
                seeked = completion => seeked,
            };
            match seeked {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(AnnotateError::sample_failed(format!(
                        "seek to {:.3}s failed: {:#}",
                        time, e
                    )))
                }
                Err(_) => {
                    return Err(AnnotateError::sample_failed(format!(
                        "seek to {:.3}s was dropped before completing",
                        time
                    )))
                }
            }

            let frame = lease.resource.capture_frame().map_err(|e| {
                AnnotateError::sample_failed(format!("frame capture at {:.3}s failed: {:#}", time, e))
            })?;
            frames.push(PreviewFrame {
                time,
                image: encode_thumbnail(&frame, &self.thumbnail)?,
            });
        }

        Ok(frames)
    }
}

/// Evenly spaced timestamps; the last one is exactly `range.end`.
pub fn sample_times(range: TimeRange, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![range.start];
    }
    let interval = range.duration() / (count - 1) as f64;
    (0..count)
        .map(|i| {
            if i == count - 1 {
                range.end
            } else {
                range.start + i as f64 * interval
            }
        })
        .collect()
}

fn encode_thumbnail(frame: &RgbImage, config: &ThumbnailConfig) -> AnnotateResult<Vec<u8>> {
    let thumb = imageops::resize(frame, config.width, config.height, FilterType::Triangle);
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, config.jpeg_quality)
        .encode_image(&thumb)
        .map_err(|e| AnnotateError::sample_failed(format!("thumbnail encoding failed: {}", e)))?;
    Ok(bytes)
}

/// Resolves once `generation` is no longer the latest request.
async fn superseded(token: &mut watch::Receiver<u64>, generation: u64) {
    loop {
        let latest = *token.borrow_and_update();
        if latest != generation {
            return;
        }
        if token.changed().await.is_err() {
            // Sampler dropped; nothing can supersede us any more
            std::future::pending::<()>().await;
        }
    }
}

async fn settle(completion: &mut SeekCompletion) {
    match tokio::time::timeout(RESTORE_SETTLE_TIMEOUT, completion).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Restoring playback position failed: {:#}", e),
        Ok(Err(_)) => debug!("Restore seek superseded before completing"),
        Err(_) => warn!("Restore seek did not complete within {:?}", RESTORE_SETTLE_TIMEOUT),
    }
}

fn park(slot: &StdMutex<Option<SeekCompletion>>, completion: SeekCompletion) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(completion);
}

/// A restore seek that has been issued but not seen through.
///
/// Goes back into the sampler's slot if dropped before `wait` finishes, so
/// whoever takes the resource next still waits for it before seeking.
struct ParkedRestore<'a> {
    slot: &'a StdMutex<Option<SeekCompletion>>,
    completion: Option<SeekCompletion>,
}

impl<'a> ParkedRestore<'a> {
    fn new(slot: &'a StdMutex<Option<SeekCompletion>>, completion: SeekCompletion) -> Self {
        Self {
            slot,
            completion: Some(completion),
        }
    }

    async fn wait(mut self) {
        if let Some(completion) = self.completion.as_mut() {
            settle(completion).await;
        }
        self.completion = None;
    }
}

impl Drop for ParkedRestore<'_> {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            park(self.slot, completion);
        }
    }
}

/// Exclusive use of the decode resource for one sample.
///
/// Saves play state, position and volume on acquisition and puts them back
/// exactly once: in `release`, or in `Drop` if the owning future went away.
struct PlaybackLease<'a, R: DecodeResource> {
    resource: MutexGuard<'a, R>,
    settling: &'a StdMutex<Option<SeekCompletion>>,
    saved_time: f64,
    saved_volume: f32,
    was_playing: bool,
    restored: bool,
}

impl<'a, R: DecodeResource> PlaybackLease<'a, R> {
    fn acquire(mut resource: MutexGuard<'a, R>, settling: &'a StdMutex<Option<SeekCompletion>>) -> Self {
        let was_playing = resource.is_playing();
        let saved_time = resource.current_time();
        let saved_volume = resource.volume();
        if was_playing {
            resource.pause();
        }
        debug!(
            "Acquired decode resource at {:.3}s (playing: {})",
            saved_time, was_playing
        );
        Self {
            resource,
            settling,
            saved_time,
            saved_volume,
            was_playing,
            restored: false,
        }
    }

    fn restore(&mut self) -> SeekCompletion {
        self.restored = true;
        let completion = self.resource.seek(self.saved_time);
        self.resource.set_volume(self.saved_volume);
        if self.was_playing {
            if let Err(e) = self.resource.play() {
                warn!("Failed to resume playback after sampling: {:#}", e);
            }
        }
        completion
    }

    /// Restore and wait for the position to land before giving up the resource.
    async fn release(mut self) {
        let completion = self.restore();
        ParkedRestore::new(self.settling, completion).wait().await;
    }
}

impl<R: DecodeResource> Drop for PlaybackLease<'_, R> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        let completion = self.restore();
        park(self.settling, completion);
    }
}
