// Geometry engine
//
// Everything that converts between pointer space, capture space and the
// current container goes through `viewport::fit` and `mapping::remap`.

pub mod mapping;
pub mod viewport;

use geo_types::{coord, Rect};
use serde::{Deserialize, Serialize};

pub use mapping::{from_normalized, map_rectangle, remap, to_normalized, OverlayRect, ShapeCapture};
pub use viewport::{fit, ViewportGeometry};

/// A 2D point in container pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Pointer position relative to the element whose bounding box starts at
    /// (`rect_left`, `rect_top`).
    pub fn from_client(client_x: f64, client_y: f64, rect_left: f64, rect_top: f64) -> Self {
        Self {
            x: client_x - rect_left,
            y: client_y - rect_top,
        }
    }
}

/// Rectangle given by two opposite corners in drawing order.
/// `start` is not necessarily the top-left corner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub start: Point,
    pub end: Point,
}

impl Rectangle {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Normalized bounds; `geo_types::Rect` orders the corners for us.
    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.start.x, y: self.start.y },
            coord! { x: self.end.x, y: self.end.y },
        )
    }

    pub fn width(&self) -> f64 {
        self.bounds().width()
    }

    pub fn height(&self) -> f64 {
        self.bounds().height()
    }

    /// True when the drag never moved (a click on the canvas).
    pub fn is_empty(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }
}
