// Timeline: seek-bar pointer mapping and drag selection

pub mod seek_bar;
pub mod selection;

use serde::{Deserialize, Serialize};

pub use seek_bar::{format_time, SeekBar};
pub use selection::{SelectionState, TimelineSelection, MIN_SELECTION_SECS};

/// Closed time interval in seconds, `start <= end`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Ordered range from two endpoints given in any order.
    pub fn ordered(a: f64, b: f64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Zero-length range at a single playback position.
    pub fn at(time: f64) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }
}
