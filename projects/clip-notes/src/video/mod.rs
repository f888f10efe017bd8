pub mod frame_dir;
pub mod sampler;

use anyhow::Result;
use image::RgbImage;
use tokio::sync::oneshot;

pub use frame_dir::{export_previews, FrameDirectory};
pub use sampler::{PreviewFrame, PreviewSampler, ThumbnailConfig};

/// Resolves once the seek it was returned for has finished (or failed).
pub type SeekCompletion = oneshot::Receiver<Result<()>>;

/// The single playback/seek capability behind a player.
///
/// Only one seek may be pending at a time: callers must wait on the
/// returned [`SeekCompletion`] before seeking again or capturing a frame.
pub trait DecodeResource: Send {
    fn is_playing(&self) -> bool;
    fn current_time(&self) -> f64;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, time: f64) -> SeekCompletion;
    /// The frame currently decoded at the playback position.
    fn capture_frame(&mut self) -> Result<RgbImage>;
}
