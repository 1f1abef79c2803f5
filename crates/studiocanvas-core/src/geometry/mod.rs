//! Geometry and layout engine: sizes, outlines, connector routes and text.

mod connector;
mod layout;
mod outline;
mod text;

pub use connector::{connector_route, route_connector, Route, CURVE_LIFT, ELBOW_BEND_RATIO};
pub use layout::{
    default_size, floor_size, mind_map_layout, min_size, resolve_font_size, resolve_size,
    MindMapLayout, MindMapMetrics, DEFAULT_FONT_SIZE, MIN_IMAGE_SIZE, MIN_ITEM_SIZE,
};
pub use outline::{
    polygon_path, polygon_points, regular_polygon, shape_outline, star_points, Outline,
    ARROW_SHAFT_RATIO, ROUNDED_CORNER_RATIO, STAR_INNER_RATIO,
};
pub use text::{line_height, measure, wrap_text, AVG_ADVANCE_RATIO, LINE_HEIGHT_RATIO};

use crate::items::{ItemKind, ItemList, SceneItem};
use kurbo::{Affine, Rect};

/// Unrotated world-space box of an item: its position and resolved size.
pub fn item_box(item: &SceneItem) -> Rect {
    Rect::from_origin_size(item.position, resolve_size(item))
}

/// Rotation of an item about its box center.
pub fn item_rotation(item: &SceneItem) -> Affine {
    let radians = item.style.rotation_radians();
    if radians == 0.0 {
        Affine::IDENTITY
    } else {
        Affine::rotate_about(radians, item_box(item).center())
    }
}

/// World-space bounding box of an item, including rotation.
///
/// Connectors take the bounds of their route and have none while an
/// endpoint is unresolved.
pub fn item_bounds(item: &SceneItem, items: &ItemList) -> Option<Rect> {
    match &item.kind {
        ItemKind::Connector { .. } => connector_route(item, items).map(|route| route.bounds()),
        _ => Some(item_rotation(item).transform_rect_bbox(item_box(item))),
    }
}

/// Local-space outline of an item's body (origin at its top-left).
pub fn item_outline(item: &SceneItem) -> Option<Outline> {
    let size = resolve_size(item);
    let rect = Rect::from_origin_size(kurbo::Point::ZERO, size);
    match &item.kind {
        ItemKind::Shape { shape, .. } => Some(shape_outline(*shape, size)),
        ItemKind::Connector { .. } => None,
        ItemKind::MindMapNode { .. } | ItemKind::Comment { .. } => Some(Outline::RoundedRect {
            rect,
            radius: size.height.min(size.width) * ROUNDED_CORNER_RATIO,
        }),
        _ => Some(Outline::Rect(rect)),
    }
}
