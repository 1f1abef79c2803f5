//! Per-kind composition of scene items into visual nodes.
//!
//! Both backends share these compositions, so they differ only in where
//! the camera transform is applied.

use crate::renderer::CursorMark;
use crate::visual::{StrokeStyle, TextAlign, TextBlock, VisualNode};
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape as KurboShape, Size};
use studiocanvas_core::geometry::{
    self, connector_route, item_outline, line_height, resolve_font_size, resolve_size, wrap_text,
};
use studiocanvas_core::items::{
    FontStyle, FontWeight, ItemKind, ItemList, MindMapKind, SceneItem, SerializableColor,
    TextDecoration,
};

const TOLERANCE: f64 = 0.1;
const PADDING: f64 = 12.0;
const SELECTION_INSET: f64 = 4.0;
const SELECTION_WIDTH: f64 = 2.0;

const DEFAULT_FILL: SerializableColor = SerializableColor::white();
const DEFAULT_BORDER: SerializableColor = SerializableColor::new(30, 30, 30, 255);
const DEFAULT_TEXT: SerializableColor = SerializableColor::new(30, 30, 30, 255);
const STICKY_FILL: SerializableColor = SerializableColor::new(254, 240, 138, 255);
const MIND_MAP_FILL: SerializableColor = SerializableColor::new(224, 231, 255, 255);
const MIND_MAP_CENTRAL_FILL: SerializableColor = SerializableColor::new(99, 102, 241, 255);
const FRAME_BORDER: SerializableColor = SerializableColor::new(148, 163, 184, 255);
const CODE_FILL: SerializableColor = SerializableColor::new(30, 41, 59, 255);
const CODE_TEXT: SerializableColor = SerializableColor::new(226, 232, 240, 255);
const COMMENT_FILL: SerializableColor = SerializableColor::new(255, 251, 235, 255);
const PLACEHOLDER_FILL: SerializableColor = SerializableColor::new(241, 245, 249, 255);
const PLACEHOLDER_BORDER: SerializableColor = SerializableColor::new(148, 163, 184, 255);

/// Visual content of one item, in its local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Local to world.
    pub transform: Affine,
    pub children: Vec<VisualNode>,
}

/// Compose `item` against the list that owns it.
///
/// `None` when the item has nothing to draw (a connector with a missing
/// endpoint).
pub fn compose_item(
    item: &SceneItem,
    items: &ItemList,
    selected: bool,
    selection_color: SerializableColor,
) -> Option<Composition> {
    if let ItemKind::Connector { .. } = item.kind {
        return compose_connector(item, items, selected, selection_color);
    }

    let size = resolve_size(item);
    let transform = Affine::translate(item.position.to_vec2())
        * Affine::rotate_about(item.style.rotation_radians(), size.to_rect().center());
    let mut children = compose_body(item, size);
    if selected {
        let highlight = size.to_rect().inflate(SELECTION_INSET, SELECTION_INSET);
        children.push(VisualNode::stroke(
            highlight.to_path(TOLERANCE),
            StrokeStyle::solid(selection_color, SELECTION_WIDTH),
        ));
    }
    Some(Composition {
        transform,
        children,
    })
}

fn compose_connector(
    item: &SceneItem,
    items: &ItemList,
    selected: bool,
    selection_color: SerializableColor,
) -> Option<Composition> {
    let route = connector_route(item, items)?;
    let path = route.to_path();
    let color = item
        .style
        .border_color
        .unwrap_or(DEFAULT_BORDER)
        .with_opacity(item.style.opacity());
    let width = item.style.border_width.unwrap_or(2.0);
    let dash = item.style.border_style.unwrap_or_default().dash_pattern(width);

    let mut children = Vec::new();
    if selected {
        children.push(VisualNode::stroke(
            path.clone(),
            StrokeStyle::solid(selection_color, width + SELECTION_WIDTH * 2.0),
        ));
    }
    children.push(VisualNode::stroke(
        path,
        StrokeStyle::solid(color, width).with_dash(dash),
    ));
    Some(Composition {
        transform: Affine::IDENTITY,
        children,
    })
}

struct Palette {
    fill: SerializableColor,
    border: Option<StrokeStyle>,
    text: SerializableColor,
}

impl Palette {
    fn of(item: &SceneItem, fill: SerializableColor, border: Option<SerializableColor>) -> Self {
        let style = &item.style;
        let opacity = style.opacity();
        let width = style.border_width.unwrap_or(2.0);
        let border = style.border_color.or(border).map(|color| {
            StrokeStyle::solid(color.with_opacity(opacity), width)
                .with_dash(style.border_style.unwrap_or_default().dash_pattern(width))
        });
        Self {
            fill: style.fill_color.unwrap_or(fill).with_opacity(opacity),
            border,
            text: style.text_color.unwrap_or(DEFAULT_TEXT).with_opacity(opacity),
        }
    }

    fn body(&self, path: kurbo::BezPath) -> VisualNode {
        VisualNode::Path {
            path,
            fill: Some(self.fill),
            stroke: self.border.clone(),
        }
    }
}

fn compose_body(item: &SceneItem, size: Size) -> Vec<VisualNode> {
    let rect = size.to_rect();
    let outline = || {
        item_outline(item)
            .map(|o| o.to_path())
            .unwrap_or_else(|| rect.to_path(TOLERANCE))
    };

    match &item.kind {
        ItemKind::Shape { label, .. } => {
            let palette = Palette::of(item, DEFAULT_FILL, Some(DEFAULT_BORDER));
            let mut nodes = vec![palette.body(outline())];
            if let Some(label) = label.as_deref().filter(|l| !l.is_empty()) {
                nodes.push(text_node(item, label, rect, palette.text, TextAlign::Center));
            }
            nodes
        }
        ItemKind::Text { content } => {
            let palette = Palette::of(item, SerializableColor::transparent(), None);
            let mut nodes = Vec::new();
            if item.style.fill_color.is_some() || palette.border.is_some() {
                nodes.push(palette.body(rect.to_path(TOLERANCE)));
            }
            nodes.push(text_node(item, content, rect, palette.text, TextAlign::Start));
            nodes
        }
        ItemKind::StickyNote { text, priority } => {
            let palette = Palette::of(item, STICKY_FILL, None);
            let mut nodes = vec![
                palette.body(rect.to_path(TOLERANCE)),
                text_node(item, text, rect.inset(-PADDING), palette.text, TextAlign::Start),
            ];
            if let Some(priority) = priority {
                let label = priority.label();
                let badge_width = geometry::measure(label, 11.0) + 12.0;
                let badge = Rect::from_origin_size(
                    Point::new(rect.x1 - badge_width - 8.0, 8.0),
                    (badge_width, 18.0),
                );
                nodes.push(VisualNode::fill(
                    RoundedRect::from_rect(badge, 9.0).to_path(TOLERANCE),
                    priority.color(),
                ));
                nodes.push(VisualNode::Text(TextBlock {
                    origin: Point::new(badge.x0, badge.y0 + 2.0),
                    width: badge.width(),
                    lines: vec![label.to_string()],
                    font_size: 11.0,
                    line_height: 14.0,
                    color: SerializableColor::white(),
                    font_family: None,
                    weight: FontWeight::Bold,
                    italic: false,
                    monospace: false,
                    align: TextAlign::Center,
                    decoration: TextDecoration::None,
                }));
            }
            nodes
        }
        ItemKind::MindMapNode { text, node, icon } => {
            let (fill, path) = match node {
                MindMapKind::Central => (
                    MIND_MAP_CENTRAL_FILL,
                    Ellipse::from_rect(rect).to_path(TOLERANCE),
                ),
                _ => (MIND_MAP_FILL, outline()),
            };
            let mut palette = Palette::of(item, fill, Some(DEFAULT_BORDER));
            if *node == MindMapKind::Central && item.style.text_color.is_none() {
                palette.text = SerializableColor::white().with_opacity(item.style.opacity());
            }
            let label = match icon.as_deref() {
                Some(icon) if !icon.is_empty() => format!("{} {}", icon, text),
                _ => text.clone(),
            };
            vec![
                palette.body(path),
                text_node(item, &label, rect, palette.text, TextAlign::Center),
            ]
        }
        ItemKind::Frame { title } => {
            let palette = Palette::of(item, SerializableColor::transparent(), None);
            let width = item.style.border_width.unwrap_or(2.0);
            let border = StrokeStyle::solid(
                item.style
                    .border_color
                    .unwrap_or(FRAME_BORDER)
                    .with_opacity(item.style.opacity()),
                width,
            )
            .with_dash(
                item.style
                    .border_style
                    .map_or(vec![width * 4.0, width * 3.0], |s| s.dash_pattern(width)),
            );
            let mut nodes = Vec::new();
            if item.style.fill_color.is_some() {
                nodes.push(VisualNode::fill(rect.to_path(TOLERANCE), palette.fill));
            }
            nodes.push(VisualNode::stroke(rect.to_path(TOLERANCE), border));
            let title_box = Rect::new(0.0, -line_height(14.0) - 4.0, rect.x1, 0.0);
            nodes.push(text_block(item, title, title_box, palette.text, TextAlign::Start, 14.0));
            nodes
        }
        ItemKind::CodeBlock { code, .. } => {
            let mut palette = Palette::of(item, CODE_FILL, None);
            if item.style.text_color.is_none() {
                palette.text = CODE_TEXT.with_opacity(item.style.opacity());
            }
            let mut text = text_node(item, code, rect.inset(-PADDING), palette.text, TextAlign::Start);
            if let VisualNode::Text(block) = &mut text {
                block.monospace = true;
            }
            vec![
                palette.body(RoundedRect::from_rect(rect, 6.0).to_path(TOLERANCE)),
                text,
            ]
        }
        ItemKind::Comment { text, author } => {
            let palette = Palette::of(item, COMMENT_FILL, Some(PLACEHOLDER_BORDER));
            let body = if author.is_empty() {
                text.clone()
            } else {
                format!("{}\n{}", author, text)
            };
            vec![
                palette.body(outline()),
                text_node(item, &body, rect.inset(-PADDING), palette.text, TextAlign::Start),
            ]
        }
        ItemKind::Chart { chart, title, .. } => {
            let label = if title.is_empty() {
                format!("{:?} chart", chart)
            } else {
                title.clone()
            };
            placeholder(item, rect, &label)
        }
        ItemKind::Table { rows, columns, .. } => {
            placeholder(item, rect, &format!("Table {}×{}", rows, columns))
        }
        ItemKind::Image { .. } => placeholder(item, rect, "Image"),
        ItemKind::Connector { .. } => Vec::new(),
    }
}

/// Labeled placeholder rectangle, used for kinds drawn by specialized widgets.
fn placeholder(item: &SceneItem, rect: Rect, label: &str) -> Vec<VisualNode> {
    let palette = Palette::of(item, PLACEHOLDER_FILL, Some(PLACEHOLDER_BORDER));
    let mut body = palette.body(rect.to_path(TOLERANCE));
    if let VisualNode::Path {
        stroke: Some(stroke),
        ..
    } = &mut body
    {
        if item.style.border_style.is_none() {
            stroke.dash = vec![6.0, 4.0];
        }
    }
    let font_size = resolve_font_size(item);
    let label_box = Rect::new(
        0.0,
        (rect.height() - line_height(font_size)) / 2.0,
        rect.x1,
        rect.y1,
    );
    vec![
        body,
        text_block(item, label, label_box, palette.text, TextAlign::Center, font_size),
    ]
}

fn text_node(
    item: &SceneItem,
    text: &str,
    area: Rect,
    color: SerializableColor,
    align: TextAlign,
) -> VisualNode {
    text_block(item, text, area, color, align, resolve_font_size(item))
}

fn text_block(
    item: &SceneItem,
    text: &str,
    area: Rect,
    color: SerializableColor,
    align: TextAlign,
    font_size: f64,
) -> VisualNode {
    let width = area.width().max(1.0);
    let lines = wrap_text(text, font_size, width);
    let line_height = line_height(font_size);
    let origin = match align {
        TextAlign::Center => {
            let height = line_height * lines.len() as f64;
            Point::new(area.x0, area.y0 + ((area.height() - height) / 2.0).max(0.0))
        }
        TextAlign::Start => area.origin(),
    };
    VisualNode::Text(TextBlock {
        origin,
        width,
        lines,
        font_size,
        line_height,
        color,
        font_family: item.style.font_family.clone(),
        weight: item.style.font_weight.unwrap_or_default(),
        italic: item.style.font_style == Some(FontStyle::Italic),
        monospace: false,
        align,
        decoration: item.style.text_decoration.unwrap_or_default(),
    })
}

const CURSOR_LABEL_SIZE: f64 = 12.0;
const CURSOR_LABEL_HEIGHT: f64 = 18.0;

/// Arrow and name pill of a collaborator cursor, in screen pixels with the
/// tip at the origin.
pub fn compose_cursor(mark: &CursorMark) -> Vec<VisualNode> {
    let mut arrow = BezPath::new();
    arrow.move_to((0.0, 0.0));
    arrow.line_to((0.0, 16.0));
    arrow.line_to((4.5, 12.0));
    arrow.line_to((8.0, 19.0));
    arrow.line_to((10.5, 18.0));
    arrow.line_to((7.0, 11.0));
    arrow.line_to((12.0, 11.0));
    arrow.close_path();

    let mut nodes = vec![VisualNode::Path {
        path: arrow,
        fill: Some(mark.color),
        stroke: Some(StrokeStyle::solid(SerializableColor::white(), 1.0)),
    }];
    if mark.label.is_empty() {
        return nodes;
    }

    // Approximate advance width.
    let width = mark.label.chars().count() as f64 * CURSOR_LABEL_SIZE * 0.6 + 12.0;
    let pill = Rect::from_origin_size((12.0, 18.0), (width, CURSOR_LABEL_HEIGHT));
    nodes.push(VisualNode::fill(
        RoundedRect::from_rect(pill, 4.0).to_path(TOLERANCE),
        mark.color,
    ));
    nodes.push(VisualNode::Text(TextBlock {
        origin: Point::new(pill.x0, pill.y0 + 1.0),
        width: pill.width(),
        lines: vec![mark.label.clone()],
        font_size: CURSOR_LABEL_SIZE,
        line_height: CURSOR_LABEL_HEIGHT - 2.0,
        color: SerializableColor::white(),
        font_family: None,
        weight: FontWeight::Bold,
        italic: false,
        monospace: false,
        align: TextAlign::Center,
        decoration: TextDecoration::None,
    }));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use studiocanvas_core::items::{Priority, Routing, ShapeKind};

    fn blue() -> SerializableColor {
        SerializableColor::new(59, 130, 246, 255)
    }

    fn texts(nodes: &[VisualNode]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|n| match n {
                VisualNode::Text(block) => Some(block.lines.join(" ")),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_shape_is_placed_at_position() {
        let item = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::new(10.0, 20.0));
        let list = ItemList::new().add_item(item.clone());
        let composed = compose_item(&item, &list, false, blue()).unwrap();
        assert_eq!(composed.transform * Point::ZERO, Point::new(10.0, 20.0));
        assert_eq!(composed.children.len(), 1);
    }

    #[test]
    fn test_selection_adds_highlight_only() {
        let item = SceneItem::new(ItemKind::sticky_note("hi"), Point::ZERO);
        let list = ItemList::new().add_item(item.clone());
        let plain = compose_item(&item, &list, false, blue()).unwrap();
        let selected = compose_item(&item, &list, true, blue()).unwrap();
        assert_eq!(selected.children.len(), plain.children.len() + 1);
        assert_eq!(selected.transform, plain.transform);
        let Some(VisualNode::Path { stroke: Some(stroke), .. }) = selected.children.last() else {
            panic!("expected highlight stroke");
        };
        assert_eq!(stroke.color, blue());
    }

    #[test]
    fn test_sticky_note_priority_badge() {
        let item = SceneItem::new(
            ItemKind::StickyNote {
                text: "ship it".into(),
                priority: Some(Priority::High),
            },
            Point::ZERO,
        );
        let list = ItemList::new().add_item(item.clone());
        let composed = compose_item(&item, &list, false, blue()).unwrap();
        assert_eq!(texts(&composed.children), vec!["ship it", "High"]);
    }

    #[test]
    fn test_dangling_connector_draws_nothing() {
        let a = SceneItem::new(ItemKind::shape(ShapeKind::Circle), Point::ZERO);
        let b = SceneItem::new(ItemKind::shape(ShapeKind::Circle), Point::new(300.0, 0.0));
        let link = SceneItem::new(
            ItemKind::connector(a.id(), b.id(), Routing::Straight),
            Point::ZERO,
        );
        let list = ItemList::new()
            .add_item(a.clone())
            .add_item(b)
            .add_item(link.clone());
        assert!(compose_item(&link, &list, false, blue()).is_some());

        let list = list.remove_item(a.id());
        let link = list.get(link.id()).unwrap();
        assert!(compose_item(link, &list, false, blue()).is_none());
    }

    #[test]
    fn test_specialized_kinds_use_placeholder() {
        let item = SceneItem::new(
            ItemKind::Table {
                rows: 2,
                columns: 3,
                cells: Vec::new(),
            },
            Point::ZERO,
        );
        let list = ItemList::new().add_item(item.clone());
        let composed = compose_item(&item, &list, false, blue()).unwrap();
        assert_eq!(texts(&composed.children), vec!["Table 2×3"]);
    }

    #[test]
    fn test_mind_map_uses_auto_font() {
        let item = SceneItem::new(ItemKind::mind_map(MindMapKind::Central, "Plan"), Point::ZERO);
        let list = ItemList::new().add_item(item.clone());
        let composed = compose_item(&item, &list, false, blue()).unwrap();
        let Some(VisualNode::Text(block)) = composed.children.last() else {
            panic!("expected label");
        };
        assert_eq!(block.font_size, resolve_font_size(&item));
        assert_eq!(block.color, SerializableColor::white());
    }
}
