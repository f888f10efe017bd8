use super::{DecodeResource, PreviewSampler, SeekCompletion};
use crate::timeline::TimeRange;
use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use walkdir::WalkDir;

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Default)]
struct SeekState {
    position: f64,
    frame: Option<RgbImage>,
    /// Serial of the most recent seek; older seeks finishing late are ignored.
    latest: u64,
}

/// Decode resource over a directory of extracted frames
/// (`frame_001.jpg`, `frame_002.jpg`, ...) sampled at a fixed rate.
///
/// Seeks decode the target frame on a blocking task and complete
/// asynchronously, so the resource behaves like a media element.
pub struct FrameDirectory {
    frames: Arc<Vec<PathBuf>>,
    fps: f64,
    playing: bool,
    volume: f32,
    state: Arc<Mutex<SeekState>>,
}

pub fn list_frames(dir: &Path) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| FRAME_EXTENSIONS.contains(&s.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    frames.sort();
    frames
}

impl FrameDirectory {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(anyhow!("Invalid frame rate: {}", fps));
        }
        if !dir.is_dir() {
            return Err(anyhow!("Frame directory not found: {:?}", dir));
        }

        let frames = list_frames(dir);
        if frames.is_empty() {
            return Err(anyhow!("No frame images found in {:?}", dir));
        }
        tracing::info!("Opened {} frames at {} fps from {:?}", frames.len(), fps, dir);

        Ok(Self {
            frames: Arc::new(frames),
            fps,
            playing: false,
            volume: 1.0,
            state: Arc::new(Mutex::new(SeekState::default())),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    fn frame_index(&self, time: f64) -> usize {
        let index = (time * self.fps).floor() as usize;
        index.min(self.frames.len() - 1)
    }

    /// Intrinsic size of the content, read from the first frame's header.
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        image::image_dimensions(&self.frames[0])
            .with_context(|| format!("Failed to read frame size from {:?}", self.frames[0]))
    }
}

impl DecodeResource for FrameDirectory {
    fn is_playing(&self) -> bool {
        self.playing
    }

    fn current_time(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .position
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn play(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time: f64) -> SeekCompletion {
        let (tx, rx) = oneshot::channel();

        let duration = self.duration();
        if !time.is_finite() || time < 0.0 || time > duration {
            let _ = tx.send(Err(anyhow!(
                "Seek to {:.3}s outside 0..{:.3}s",
                time,
                duration
            )));
            return rx;
        }

        let serial = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.latest += 1;
            state.latest
        };
        let path = self.frames[self.frame_index(time)].clone();
        let state = self.state.clone();

        tokio::task::spawn_blocking(move || {
            let decoded = image::open(&path)
                .map(|img| img.to_rgb8())
                .with_context(|| format!("Failed to decode frame {:?}", path));
            let result = match decoded {
                Ok(frame) => {
                    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    if state.latest == serial {
                        state.position = time;
                        state.frame = Some(frame);
                        Ok(())
                    } else {
                        Err(anyhow!("Seek to {:.3}s superseded", time))
                    }
                }
                Err(e) => Err(e),
            };
            let _ = tx.send(result);
        });

        rx
    }

    fn capture_frame(&mut self) -> Result<RgbImage> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frame
            .clone()
            .ok_or_else(|| anyhow!("No frame decoded yet"))
    }
}

/// Sample `count` previews over `range` from the frames in `frames_dir` and
/// write them to `output_dir` as `preview_001.jpg`, `preview_002.jpg`, ...
pub async fn export_previews(
    frames_dir: &Path,
    fps: f64,
    range: TimeRange,
    count: usize,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let frames = FrameDirectory::open(frames_dir, fps)?;
    if range.end > frames.duration() {
        return Err(anyhow!(
            "Range end {:.3}s is past the last frame ({:.3}s)",
            range.end,
            frames.duration()
        ));
    }

    let sampler = PreviewSampler::new(Arc::new(AsyncMutex::new(frames)));
    let previews = sampler.sample(range, count).await?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let mut written = Vec::with_capacity(previews.len());
    for (i, preview) in previews.iter().enumerate() {
        let path = output_dir.join(format!("preview_{:03}.jpg", i + 1));
        fs::write(&path, &preview.image)
            .with_context(|| format!("Failed to write preview {:?}", path))?;
        tracing::debug!("Wrote preview at {:.2}s to {:?}", preview.time, path);
        written.push(path);
    }

    tracing::info!("Wrote {} previews to {:?}", written.len(), output_dir);
    Ok(written)
}
