//! Sizing rules: defaults, minimum floors and mind-map auto-fit.

use crate::items::{ItemKind, MindMapKind, SceneItem};
use kurbo::Size;

/// Smallest interactable size for generic items.
pub const MIN_ITEM_SIZE: Size = Size::new(50.0, 30.0);
/// Smallest interactable size for images.
pub const MIN_IMAGE_SIZE: Size = Size::new(50.0, 50.0);

/// Font size used when an item does not set one.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Auto-sizing parameters of one mind-map node level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MindMapMetrics {
    pub min_width: f64,
    pub per_char: f64,
    pub max_width: f64,
    pub height: f64,
    pub base_font: f64,
    pub min_font: f64,
}

impl MindMapMetrics {
    pub const fn for_kind(kind: MindMapKind) -> Self {
        match kind {
            MindMapKind::Central => Self {
                min_width: 300.0,
                per_char: 12.0,
                max_width: 500.0,
                height: 120.0,
                base_font: 24.0,
                min_font: 16.0,
            },
            MindMapKind::Primary => Self {
                min_width: 200.0,
                per_char: 10.0,
                max_width: 350.0,
                height: 100.0,
                base_font: 18.0,
                min_font: 14.0,
            },
            MindMapKind::Secondary => Self {
                min_width: 150.0,
                per_char: 8.0,
                max_width: 250.0,
                height: 80.0,
                base_font: 14.0,
                min_font: 12.0,
            },
        }
    }
}

/// Auto-fit layout of a mind-map node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MindMapLayout {
    pub size: Size,
    pub font_size: f64,
}

/// Size and font of a mind-map node holding `text`.
///
/// An explicit dimension only wins when it is larger than the auto value.
pub fn mind_map_layout(kind: MindMapKind, text: &str, explicit: Option<Size>) -> MindMapLayout {
    let m = MindMapMetrics::for_kind(kind);
    let len = text.chars().count() as f64;

    let auto_width = (len * m.per_char + 60.0).clamp(m.min_width, m.max_width);
    let auto_height = m.height;
    let font_size = m.min_font.max(m.base_font.min(300.0 / len.max(8.0)));

    let (width, height) = match explicit {
        Some(s) => (s.width.max(auto_width), s.height.max(auto_height)),
        None => (auto_width, auto_height),
    };
    MindMapLayout {
        size: Size::new(width, height),
        font_size,
    }
}

/// Size used when an item of this kind has no explicit size.
pub fn default_size(kind: &ItemKind) -> Size {
    match kind {
        ItemKind::Shape { .. } => Size::new(150.0, 100.0),
        ItemKind::Text { .. } => Size::new(200.0, 40.0),
        ItemKind::StickyNote { .. } => Size::new(200.0, 200.0),
        ItemKind::MindMapNode { text, node, .. } => mind_map_layout(*node, text, None).size,
        ItemKind::Connector { .. } => Size::ZERO,
        ItemKind::Frame { .. } => Size::new(400.0, 300.0),
        ItemKind::Chart { .. } => Size::new(400.0, 300.0),
        ItemKind::Table { .. } => Size::new(360.0, 200.0),
        ItemKind::CodeBlock { .. } => Size::new(400.0, 220.0),
        ItemKind::Comment { .. } => Size::new(240.0, 120.0),
        ItemKind::Image { .. } => Size::new(200.0, 200.0),
    }
}

/// Minimum size an item of this kind may shrink to.
pub fn min_size(kind: &ItemKind) -> Size {
    match kind {
        ItemKind::Image { .. } => MIN_IMAGE_SIZE,
        ItemKind::Connector { .. } => Size::ZERO,
        _ => MIN_ITEM_SIZE,
    }
}

/// Clamp `size` to the kind's minimum.
pub fn floor_size(kind: &ItemKind, size: Size) -> Size {
    let min = min_size(kind);
    Size::new(size.width.max(min.width), size.height.max(min.height))
}

/// Effective on-canvas size of an item.
///
/// Unset sizes take the kind's default; explicit sizes are floored at the
/// kind's minimum; mind-map nodes never go below their auto-fit size.
pub fn resolve_size(item: &SceneItem) -> Size {
    match &item.kind {
        ItemKind::MindMapNode { text, node, .. } => mind_map_layout(*node, text, item.size).size,
        ItemKind::Connector { .. } => Size::ZERO,
        kind => match item.size {
            Some(size) => floor_size(kind, size),
            None => default_size(kind),
        },
    }
}

/// Font size an item's text is drawn with.
pub fn resolve_font_size(item: &SceneItem) -> f64 {
    match &item.kind {
        ItemKind::MindMapNode { text, node, .. } => item
            .style
            .font_size
            .unwrap_or_else(|| mind_map_layout(*node, text, item.size).font_size),
        _ => item.style.font_size.unwrap_or(DEFAULT_FONT_SIZE),
    }
    .max(1.0)
}
