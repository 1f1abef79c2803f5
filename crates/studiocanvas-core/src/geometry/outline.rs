//! Outline generation for shape items.

use crate::items::ShapeKind;
use kurbo::{BezPath, Ellipse, Point, Rect, RoundedRect, Shape as KurboShape, Size};
use std::f64::consts::PI;

/// Ratio of the inner to the outer radius of the five-point star.
pub const STAR_INNER_RATIO: f64 = 0.382;

/// Fraction of an arrow's length taken by the shaft; the head takes the rest.
pub const ARROW_SHAFT_RATIO: f64 = 0.7;

/// Cross-axis extent of the arrow shaft (from 30% to 70% of the box).
const ARROW_SHAFT_NEAR: f64 = 0.3;
const ARROW_SHAFT_FAR: f64 = 0.7;

/// Corner radius of rounded rectangles as a fraction of the shorter side.
pub const ROUNDED_CORNER_RATIO: f64 = 0.12;

/// Geometry of a shape, in local coordinates (origin at the item's top-left).
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f64 },
    Ellipse(Rect),
    /// Closed polygon, vertices in drawing order.
    Polygon(Vec<Point>),
    Path(BezPath),
}

impl Outline {
    /// Closed path for this outline.
    pub fn to_path(&self) -> BezPath {
        match self {
            Outline::Rect(rect) => rect.to_path(0.1),
            Outline::RoundedRect { rect, radius } => {
                RoundedRect::from_rect(*rect, *radius).to_path(0.1)
            }
            Outline::Ellipse(rect) => Ellipse::from_rect(*rect).to_path(0.1),
            Outline::Polygon(points) => polygon_path(points),
            Outline::Path(path) => path.clone(),
        }
    }
}

/// Closed path through `points`.
pub fn polygon_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(*first);
        for p in iter {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// Floor both dimensions at 1 so ratios never divide by zero.
fn floored(size: Size) -> Size {
    Size::new(size.width.max(1.0), size.height.max(1.0))
}

/// Outline of `kind` filling a box of `size`.
pub fn shape_outline(kind: ShapeKind, size: Size) -> Outline {
    let size = floored(size);
    let rect = Rect::from_origin_size(Point::ZERO, size);
    match kind {
        ShapeKind::Rectangle => Outline::Rect(rect),
        ShapeKind::RoundedRectangle => Outline::RoundedRect {
            rect,
            radius: size.width.min(size.height) * ROUNDED_CORNER_RATIO,
        },
        ShapeKind::Circle => Outline::Ellipse(rect),
        ShapeKind::Heart => Outline::Path(heart_path(size)),
        _ => Outline::Polygon(polygon_points(kind, size).unwrap_or_default()),
    }
}

/// Vertex list for polygonal shape kinds; `None` for curved kinds.
pub fn polygon_points(kind: ShapeKind, size: Size) -> Option<Vec<Point>> {
    let Size { width: w, height: h } = floored(size);
    let points = match kind {
        ShapeKind::Triangle => vec![
            Point::new(w / 2.0, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ],
        ShapeKind::Diamond => vec![
            Point::new(w / 2.0, 0.0),
            Point::new(w, h / 2.0),
            Point::new(w / 2.0, h),
            Point::new(0.0, h / 2.0),
        ],
        ShapeKind::Pentagon => regular_polygon(5, -PI / 2.0, w, h),
        ShapeKind::Hexagon => regular_polygon(6, 0.0, w, h),
        ShapeKind::Octagon => regular_polygon(8, PI / 8.0, w, h),
        ShapeKind::Star => star_points(5, STAR_INNER_RATIO, w, h),
        ShapeKind::ArrowRight => arrow_right(w, h),
        ShapeKind::ArrowLeft => arrow_right(w, h)
            .into_iter()
            .map(|p| Point::new(w - p.x, p.y))
            .collect(),
        ShapeKind::ArrowDown => arrow_down(w, h),
        ShapeKind::ArrowUp => arrow_down(w, h)
            .into_iter()
            .map(|p| Point::new(p.x, h - p.y))
            .collect(),
        ShapeKind::Rectangle
        | ShapeKind::RoundedRectangle
        | ShapeKind::Circle
        | ShapeKind::Heart => return None,
    };
    Some(points)
}

/// `n` points evenly spaced on the ellipse inscribed in a `w`×`h` box,
/// starting at `start_angle` (radians, clockwise in screen space).
pub fn regular_polygon(n: usize, start_angle: f64, w: f64, h: f64) -> Vec<Point> {
    let n = n.max(3);
    let (cx, cy) = (w / 2.0, h / 2.0);
    (0..n)
        .map(|i| {
            let angle = start_angle + 2.0 * PI * i as f64 / n as f64;
            Point::new(cx + cx * angle.cos(), cy + cy * angle.sin())
        })
        .collect()
}

/// Star with `spikes` outer points alternating with inner points, first spike up.
pub fn star_points(spikes: usize, inner_ratio: f64, w: f64, h: f64) -> Vec<Point> {
    let spikes = spikes.max(3);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let steps = spikes * 2;
    (0..steps)
        .map(|i| {
            let angle = -PI / 2.0 + PI * i as f64 / spikes as f64;
            let scale = if i % 2 == 0 { 1.0 } else { inner_ratio };
            Point::new(cx + cx * scale * angle.cos(), cy + cy * scale * angle.sin())
        })
        .collect()
}

fn arrow_right(w: f64, h: f64) -> Vec<Point> {
    let shaft = w * ARROW_SHAFT_RATIO;
    vec![
        Point::new(0.0, h * ARROW_SHAFT_NEAR),
        Point::new(shaft, h * ARROW_SHAFT_NEAR),
        Point::new(shaft, 0.0),
        Point::new(w, h / 2.0),
        Point::new(shaft, h),
        Point::new(shaft, h * ARROW_SHAFT_FAR),
        Point::new(0.0, h * ARROW_SHAFT_FAR),
    ]
}

fn arrow_down(w: f64, h: f64) -> Vec<Point> {
    let shaft = h * ARROW_SHAFT_RATIO;
    vec![
        Point::new(w * ARROW_SHAFT_NEAR, 0.0),
        Point::new(w * ARROW_SHAFT_FAR, 0.0),
        Point::new(w * ARROW_SHAFT_FAR, shaft),
        Point::new(w, shaft),
        Point::new(w / 2.0, h),
        Point::new(0.0, shaft),
        Point::new(w * ARROW_SHAFT_NEAR, shaft),
    ]
}

/// Two-lobed heart built from cubic curves.
fn heart_path(size: Size) -> BezPath {
    let (w, h) = (size.width, size.height);
    let mut path = BezPath::new();
    path.move_to((w * 0.5, h * 0.3));
    path.curve_to((w * 0.5, h * 0.05), (w * 0.05, h * 0.0), (w * 0.05, h * 0.3));
    path.curve_to((w * 0.05, h * 0.6), (w * 0.45, h * 0.75), (w * 0.5, h));
    path.curve_to((w * 0.55, h * 0.75), (w * 0.95, h * 0.6), (w * 0.95, h * 0.3));
    path.curve_to((w * 0.95, h * 0.0), (w * 0.5, h * 0.05), (w * 0.5, h * 0.3));
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_vertex_counts() {
        let size = Size::new(100.0, 80.0);
        let count = |k| polygon_points(k, size).map(|p| p.len());
        assert_eq!(count(ShapeKind::Triangle), Some(3));
        assert_eq!(count(ShapeKind::Diamond), Some(4));
        assert_eq!(count(ShapeKind::Pentagon), Some(5));
        assert_eq!(count(ShapeKind::Hexagon), Some(6));
        assert_eq!(count(ShapeKind::Octagon), Some(8));
        assert_eq!(count(ShapeKind::Star), Some(10));
        assert_eq!(count(ShapeKind::ArrowUp), Some(7));
        assert_eq!(count(ShapeKind::Circle), None);
    }

    #[test]
    fn test_pentagon_points_up() {
        let points = polygon_points(ShapeKind::Pentagon, Size::new(100.0, 100.0)).unwrap();
        assert!(approx(points[0], Point::new(50.0, 0.0)));
    }

    #[test]
    fn test_hexagon_pointy_sides() {
        let points = polygon_points(ShapeKind::Hexagon, Size::new(120.0, 60.0)).unwrap();
        assert!(approx(points[0], Point::new(120.0, 30.0)));
        assert!(approx(points[3], Point::new(0.0, 30.0)));
        // flat bottom edge
        assert!((points[1].y - points[2].y).abs() < 1e-9);
    }

    #[test]
    fn test_octagon_flat_top() {
        let points = polygon_points(ShapeKind::Octagon, Size::new(100.0, 100.0)).unwrap();
        assert!((points[5].y - points[6].y).abs() < 1e-9);
        assert!(points[5].y < 50.0);
    }

    #[test]
    fn test_polygons_stay_inside_box() {
        let size = Size::new(90.0, 40.0);
        for kind in [
            ShapeKind::Triangle,
            ShapeKind::Pentagon,
            ShapeKind::Hexagon,
            ShapeKind::Octagon,
            ShapeKind::Star,
            ShapeKind::ArrowLeft,
            ShapeKind::ArrowDown,
        ] {
            for p in polygon_points(kind, size).unwrap() {
                assert!(p.x >= -1e-9 && p.x <= 90.0 + 1e-9, "{kind:?} {p:?}");
                assert!(p.y >= -1e-9 && p.y <= 40.0 + 1e-9, "{kind:?} {p:?}");
            }
        }
    }

    #[test]
    fn test_right_arrow_proportions() {
        let points = polygon_points(ShapeKind::ArrowRight, Size::new(200.0, 100.0)).unwrap();
        let expected = [
            Point::new(0.0, 30.0),
            Point::new(140.0, 30.0),
            Point::new(140.0, 0.0),
            Point::new(200.0, 50.0),
            Point::new(140.0, 100.0),
            Point::new(140.0, 70.0),
            Point::new(0.0, 70.0),
        ];
        assert_eq!(points.len(), expected.len());
        for (p, e) in points.iter().zip(expected) {
            assert!(approx(*p, e), "{p:?} != {e:?}");
        }
    }

    #[test]
    fn test_left_arrow_mirrors_right() {
        let points = polygon_points(ShapeKind::ArrowLeft, Size::new(200.0, 100.0)).unwrap();
        assert!(approx(points[3], Point::new(0.0, 50.0)));
        assert!(approx(points[1], Point::new(60.0, 30.0)));
    }

    #[test]
    fn test_up_arrow_head_at_top() {
        let points = polygon_points(ShapeKind::ArrowUp, Size::new(100.0, 200.0)).unwrap();
        assert!(approx(points[4], Point::new(50.0, 0.0)));
        assert!(approx(points[3], Point::new(100.0, 60.0)));
    }

    #[test]
    fn test_degenerate_box_is_floored() {
        let points = polygon_points(ShapeKind::Hexagon, Size::new(0.0, -20.0)).unwrap();
        assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(approx(points[0], Point::new(1.0, 0.5)));

        let outline = shape_outline(ShapeKind::RoundedRectangle, Size::ZERO);
        match outline {
            Outline::RoundedRect { radius, .. } => assert!(radius > 0.0),
            other => panic!("unexpected outline {other:?}"),
        }
    }

    #[test]
    fn test_outline_paths_are_closed() {
        for kind in [ShapeKind::Star, ShapeKind::Heart, ShapeKind::Circle] {
            let path = shape_outline(kind, Size::new(50.0, 50.0)).to_path();
            assert!(path.elements().len() > 2);
        }
    }
}
