use super::viewport::ViewportGeometry;
use super::{Point, Rectangle};
use crate::error::{AnnotateError, AnnotateResult};
use serde::{Deserialize, Serialize};

fn require_display_area(geometry: &ViewportGeometry, role: &str) -> AnnotateResult<()> {
    if geometry.has_display_area() {
        Ok(())
    } else {
        Err(AnnotateError::degenerate(format!(
            "{} geometry has no display area ({} x {})",
            role, geometry.display_w, geometry.display_h
        )))
    }
}

/// Move a point from the display space of `from` into the display space of `to`.
///
/// The letterbox margin of `from` is stripped, the remainder is scaled per
/// axis by the ratio of display sizes, and the margin of `to` is added back.
pub fn remap(point: Point, from: &ViewportGeometry, to: &ViewportGeometry) -> AnnotateResult<Point> {
    require_display_area(from, "source")?;
    require_display_area(to, "target")?;

    let scale_x = to.display_w / from.display_w;
    let scale_y = to.display_h / from.display_h;

    Ok(Point {
        x: (point.x - from.offset_x) * scale_x + to.offset_x,
        y: (point.y - from.offset_y) * scale_y + to.offset_y,
    })
}

/// Point captured under `captured` expressed in the `current` container.
pub fn to_normalized(
    point: Point,
    captured: &ViewportGeometry,
    current: &ViewportGeometry,
) -> AnnotateResult<Point> {
    remap(point, captured, current)
}

/// Inverse of [`to_normalized`]: a point in the `current` container expressed
/// in the space that was active at capture time.
pub fn from_normalized(
    point: Point,
    current: &ViewportGeometry,
    captured: &ViewportGeometry,
) -> AnnotateResult<Point> {
    remap(point, current, captured)
}

/// Both corners are mapped independently; rectangles are never rotated.
pub fn map_rectangle(
    shape: &Rectangle,
    from: &ViewportGeometry,
    to: &ViewportGeometry,
) -> AnnotateResult<Rectangle> {
    Ok(Rectangle {
        start: remap(shape.start, from, to)?,
        end: remap(shape.end, from, to)?,
    })
}

/// A rectangle plus the geometry that was active when it was drawn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ShapeCapture {
    shape: Rectangle,
    geometry: ViewportGeometry,
}

impl ShapeCapture {
    pub fn new(shape: Rectangle, geometry: ViewportGeometry) -> AnnotateResult<Self> {
        require_display_area(&geometry, "capture")?;
        Ok(Self { shape, geometry })
    }

    pub fn shape(&self) -> &Rectangle {
        &self.shape
    }

    pub fn geometry(&self) -> &ViewportGeometry {
        &self.geometry
    }

    /// The shape in pixels of the `current` container.
    pub fn replay(&self, current: &ViewportGeometry) -> AnnotateResult<Rectangle> {
        map_rectangle(&self.shape, &self.geometry, current)
    }
}

/// Draw instruction for replaying a comment shape over the video.
/// Coordinates are top-left based, in current-container pixels.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
}

impl OverlayRect {
    pub fn from_rectangle(rect: &Rectangle, label: impl Into<String>) -> Self {
        let bounds = rect.bounds();
        Self {
            x: bounds.min().x,
            y: bounds.min().y,
            width: bounds.width(),
            height: bounds.height(),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::viewport::fit;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_replay_into_larger_container() {
        // Drawn on a 16:9 video in an 800x600 box (letterboxed by 75px),
        // replayed in a 1600x900 box (exact fit).
        let captured = fit(1920.0, 1080.0, 800.0, 600.0).unwrap();
        let current = fit(1920.0, 1080.0, 1600.0, 900.0).unwrap();

        let p = to_normalized(Point::new(400.0, 75.0), &captured, &current).unwrap();
        assert_close(p, Point::new(800.0, 0.0));

        let p = to_normalized(Point::new(0.0, 525.0), &captured, &current).unwrap();
        assert_close(p, Point::new(0.0, 900.0));
    }

    #[test]
    fn test_round_trip_across_geometries() {
        let geometries = [
            fit(1920.0, 1080.0, 800.0, 600.0).unwrap(),
            fit(1920.0, 1080.0, 375.0, 812.0).unwrap(),
            fit(1920.0, 1080.0, 2560.0, 1080.0).unwrap(),
            fit(640.0, 480.0, 1000.0, 1000.0).unwrap(),
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(123.456, 78.9),
            Point::new(-20.0, 610.0),
            Point::new(799.0, 1.0),
        ];

        for g1 in &geometries {
            for g2 in &geometries {
                for &p in &points {
                    let there = to_normalized(p, g1, g2).unwrap();
                    let back = from_normalized(there, g2, g1).unwrap();
                    assert_close(back, p);
                }
            }
        }
    }

    #[test]
    fn test_rectangle_corners_map_independently() {
        let captured = fit(1000.0, 1000.0, 500.0, 500.0).unwrap();
        let current = fit(1000.0, 1000.0, 1000.0, 500.0).unwrap();
        // Corners given bottom-right first
        let shape = Rectangle::new(Point::new(400.0, 300.0), Point::new(100.0, 50.0));
        let mapped = map_rectangle(&shape, &captured, &current).unwrap();

        // Current container pillarboxes the square video by 250px
        assert_close(mapped.start, Point::new(650.0, 300.0));
        assert_close(mapped.end, Point::new(350.0, 50.0));
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        let good = fit(1920.0, 1080.0, 800.0, 600.0).unwrap();
        let mut zero = good;
        zero.display_w = 0.0;
        zero.display_h = 0.0;

        let err = to_normalized(Point::new(1.0, 1.0), &zero, &good).unwrap_err();
        assert!(matches!(err, AnnotateError::DegenerateGeometry(_)));

        let shape = Rectangle::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!(matches!(
            ShapeCapture::new(shape, zero),
            Err(AnnotateError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_overlay_uses_normalized_bounds() {
        let captured = fit(1920.0, 1080.0, 960.0, 540.0).unwrap();
        let current = fit(1920.0, 1080.0, 1920.0, 1080.0).unwrap();
        let capture = ShapeCapture::new(
            Rectangle::new(Point::new(200.0, 100.0), Point::new(100.0, 50.0)),
            captured,
        )
        .unwrap();

        let replayed = capture.replay(&current).unwrap();
        let overlay = OverlayRect::from_rectangle(&replayed, "ball");
        assert!((overlay.x - 200.0).abs() < 1e-9);
        assert!((overlay.y - 100.0).abs() < 1e-9);
        assert!((overlay.width - 200.0).abs() < 1e-9);
        assert!((overlay.height - 100.0).abs() < 1e-9);
        assert_eq!(overlay.label, "ball");
    }
}
