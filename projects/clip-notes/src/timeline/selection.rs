use super::TimeRange;
use serde::Serialize;

/// Drags shorter than this are treated as taps.
pub const MIN_SELECTION_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SelectionState {
    Idle,
    Selecting { start: f64 },
    Selected { start: f64, end: f64 },
}

/// Turns begin/drag/end pointer input on the seek bar into a time range.
///
/// Synchronous and side-effect free: starting preview sampling for a
/// finished selection is up to the caller.
#[derive(Debug, Clone)]
pub struct TimelineSelection {
    state: SelectionState,
    /// Where the pointer currently is during a drag; not part of the committed state.
    preview_end: Option<f64>,
    duration: Option<f64>,
}

impl Default for TimelineSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineSelection {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
            preview_end: None,
            duration: None,
        }
    }

    pub fn with_duration(duration: f64) -> Self {
        let mut selection = Self::new();
        selection.set_duration(duration);
        selection
    }

    /// Called once the media metadata is known. Non-positive durations
    /// disable clamping.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn preview_end(&self) -> Option<f64> {
        self.preview_end
    }

    fn clamp(&self, time: f64) -> f64 {
        match self.duration {
            Some(duration) => time.clamp(0.0, duration),
            None => time.max(0.0),
        }
    }

    /// Pointer pressed on the bar. Discards any previous selection.
    pub fn begin(&mut self, time: f64) -> SelectionState {
        if !time.is_finite() {
            return self.state;
        }
        let start = self.clamp(time);
        self.state = SelectionState::Selecting { start };
        self.preview_end = Some(start);
        self.state
    }

    pub fn drag_to(&mut self, time: f64) -> SelectionState {
        if let SelectionState::Selecting { .. } = self.state {
            if time.is_finite() {
                self.preview_end = Some(self.clamp(time));
            }
        }
        self.state
    }

    /// Pointer released. Returns the committed range, if the drag was long enough.
    pub fn end(&mut self, time: f64) -> Option<TimeRange> {
        let SelectionState::Selecting { start } = self.state else {
            return None;
        };
        self.preview_end = None;

        if !time.is_finite() {
            self.state = SelectionState::Idle;
            return None;
        }

        let end = self.clamp(time);
        if (end - start).abs() < MIN_SELECTION_SECS {
            self.state = SelectionState::Idle;
            return None;
        }

        let range = TimeRange::ordered(start, end);
        self.state = SelectionState::Selected {
            start: range.start,
            end: range.end,
        };
        Some(range)
    }

    /// Pointer left the bar, or the content was unloaded.
    pub fn cancel(&mut self) {
        self.state = SelectionState::Idle;
        self.preview_end = None;
    }

    pub fn selected(&self) -> Option<TimeRange> {
        match self.state {
            SelectionState::Selected { start, end } => Some(TimeRange { start, end }),
            _ => None,
        }
    }

    /// Range for a new comment: the committed selection, or the current
    /// playback position when nothing is selected.
    pub fn comment_range(&self, current_time: f64) -> TimeRange {
        self.selected()
            .unwrap_or_else(|| TimeRange::at(self.clamp(current_time)))
    }
}
