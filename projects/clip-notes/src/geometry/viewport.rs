use crate::error::{AnnotateError, AnnotateResult};
use serde::{Deserialize, Serialize};

/// Placement of letterboxed content inside its container.
///
/// `display_*` and `offset_*` are derived by [`fit`]; build this through
/// `fit` whenever the container or the content size changes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewportGeometry {
    pub content_w: f64,
    pub content_h: f64,
    pub container_w: f64,
    pub container_h: f64,
    pub display_w: f64,
    pub display_h: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewportGeometry {
    pub fn has_display_area(&self) -> bool {
        self.display_w.is_finite()
            && self.display_h.is_finite()
            && self.display_w > 0.0
            && self.display_h > 0.0
    }
}

fn check_dimension(name: &str, value: f64) -> AnnotateResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnnotateError::invalid_dimension(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

/// Fit content of intrinsic size `content_w x content_h` into a container,
/// preserving the content aspect ratio. The spare space is split evenly on
/// the two sides that need it (pillarbox or letterbox).
pub fn fit(
    content_w: f64,
    content_h: f64,
    container_w: f64,
    container_h: f64,
) -> AnnotateResult<ViewportGeometry> {
    check_dimension("content width", content_w)?;
    check_dimension("content height", content_h)?;
    check_dimension("container width", container_w)?;
    check_dimension("container height", container_h)?;

    let container_aspect = container_w / container_h;
    let content_aspect = content_w / content_h;

    let (display_w, display_h, offset_x, offset_y) = if container_aspect > content_aspect {
        // Container is wider: bars on the left and right
        let display_h = container_h;
        let display_w = display_h * content_aspect;
        (display_w, display_h, (container_w - display_w) / 2.0, 0.0)
    } else {
        let display_w = container_w;
        let display_h = display_w / content_aspect;
        (display_w, display_h, 0.0, (container_h - display_h) / 2.0)
    };

    Ok(ViewportGeometry {
        content_w,
        content_h,
        container_w,
        container_h,
        display_w,
        display_h,
        offset_x: offset_x.max(0.0),
        offset_y: offset_y.max(0.0),
    })
}
