/// Horizontal seek bar as laid out on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekBar {
    pub left: f64,
    pub width: f64,
    pub duration: f64,
}

impl SeekBar {
    pub fn new(left: f64, width: f64, duration: f64) -> Self {
        Self {
            left,
            width,
            duration,
        }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.width > 0.0 && self.duration.is_finite() && self.duration > 0.0
    }

    /// Media time under a pointer. Positions left or right of the bar clamp
    /// to its ends. `None` until the bar has a width and the media a duration.
    pub fn time_at(&self, client_x: f64) -> Option<f64> {
        if !self.is_usable() || !client_x.is_finite() {
            return None;
        }
        let x = (client_x - self.left).clamp(0.0, self.width);
        Some(x / self.width * self.duration)
    }

    /// Relative position of `time` along the bar, in [0, 1].
    pub fn fraction(&self, time: f64) -> f64 {
        if !self.is_usable() {
            return 0.0;
        }
        (time / self.duration).clamp(0.0, 1.0)
    }
}

/// `m:ss` label for a playback position.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
