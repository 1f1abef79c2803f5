//! Pan/zoom mapping between screen and canvas (world) coordinates.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// View transform and on-screen size of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Translation in screen pixels.
    pub offset: Vec2,
    pub zoom: f64,
    /// Size of the canvas element in screen pixels.
    pub size: Size,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            size: Size::new(1280.0, 800.0),
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Viewport {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// World to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to world.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Convert a screen distance to world units.
    pub fn screen_to_world_distance(&self, distance: f64) -> f64 {
        distance / self.zoom
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `screen_point` fixed on screen.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let anchor = self.screen_to_world(screen_point);
        self.zoom = new_zoom;
        self.offset += screen_point - self.world_to_screen(anchor);
    }

    /// World-space rectangle currently on screen.
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(self.size.width, self.size.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// World point at the center of the screen.
    pub fn world_center(&self) -> Point {
        self.visible_world_rect().center()
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Zoom and pan so `bounds` fills the screen minus `padding`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let available = Size::new(
            (self.size.width - padding * 2.0).max(1.0),
            (self.size.height - padding * 2.0).max(1.0),
        );
        self.zoom = (available.width / bounds.width())
            .min(available.height / bounds.height())
            .clamp(self.min_zoom, self.max_zoom);

        let screen_center = Point::new(self.size.width / 2.0, self.size.height / 2.0);
        self.offset = screen_center.to_vec2() - bounds.center().to_vec2() * self.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut viewport = Viewport::default();
        viewport.offset = Vec2::new(30.0, -20.0);
        viewport.zoom = 1.5;

        let original = Point::new(123.0, 456.0);
        let back = viewport.world_to_screen(viewport.screen_to_world(original));
        assert!(close(back, original));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut viewport = Viewport::default();
        let anchor = Point::new(200.0, 150.0);
        let before = viewport.screen_to_world(anchor);
        viewport.zoom_at(anchor, 2.0);
        assert!((viewport.zoom - 2.0).abs() < f64::EPSILON);
        assert!(close(viewport.world_to_screen(before), anchor));
    }

    #[test]
    fn test_zoom_clamp() {
        let mut viewport = Viewport::default();
        viewport.zoom_at(Point::ZERO, 0.001);
        assert!((viewport.zoom - viewport.min_zoom).abs() < f64::EPSILON);
    }

    #[test]
    fn test_visible_rect_and_center() {
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        assert_eq!(viewport.visible_world_rect(), Rect::new(0.0, 0.0, 800.0, 600.0));

        viewport.pan(Vec2::new(-100.0, -50.0));
        viewport.zoom = 2.0;
        // screen (0,0) -> world (50,25); screen (800,600) -> world (450,325)
        assert!(close(viewport.world_center(), Point::new(250.0, 175.0)));
    }

    #[test]
    fn test_fit_to_bounds_centers() {
        let mut viewport = Viewport::new(Size::new(1000.0, 500.0));
        let bounds = Rect::new(0.0, 0.0, 400.0, 400.0);
        viewport.fit_to_bounds(bounds, 50.0);
        assert!((viewport.zoom - 1.0).abs() < 1e-9);
        assert!(close(viewport.world_to_screen(bounds.center()), Point::new(500.0, 250.0)));
    }
}
