//! DOM-style backend: one positioned element per item.
//!
//! Every item group carries its full local-to-screen transform, like an
//! absolutely positioned element with a CSS `matrix()`. [`to_markup`]
//! serializes the tree as HTML with inline SVG.

use crate::compose::{compose_cursor, compose_item};
use crate::renderer::{RenderFrame, Renderer};
use crate::visual::{StrokeStyle, TextAlign, TextBlock, VisualNode, VisualTree};
use kurbo::Affine;
use std::fmt::Write as _;
use studiocanvas_core::items::{FontWeight, SerializableColor, TextDecoration};

/// Element-per-item renderer, suited to small canvases.
#[derive(Debug, Clone, Default)]
pub struct DomRenderer;

impl DomRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DomRenderer {
    fn render(&mut self, frame: &RenderFrame) -> VisualTree {
        let camera = frame.viewport.transform();
        let mut elements: Vec<VisualNode> = frame
            .items
            .paint_order()
            .into_iter()
            .filter_map(|item| {
                let selected = frame.selection.contains(item.id());
                compose_item(item, frame.items, selected, frame.selection_color).map(|composed| {
                    VisualNode::group(camera * composed.transform, Some(item.id()), composed.children)
                })
            })
            .collect();
        elements.extend(frame.cursors.iter().map(|mark| VisualNode::Overlay {
            transform: mark.screen_transform(frame.viewport),
            client_id: mark.client_id.clone(),
            children: compose_cursor(mark),
        }));
        VisualTree::new(VisualNode::group(Affine::IDENTITY, None, elements))
    }

    fn name(&self) -> &'static str {
        "dom"
    }
}

/// Serialize a visual tree as HTML: a container with one absolutely
/// positioned element per item and per cursor, each holding an inline SVG.
pub fn to_markup(tree: &VisualTree) -> String {
    let mut out = String::from("<div class=\"studio-canvas\" style=\"position:relative;overflow:hidden\">");
    write_node(&tree.root, Affine::IDENTITY, &mut out);
    out.push_str("</div>");
    out
}

fn write_node(node: &VisualNode, parent: Affine, out: &mut String) {
    match node {
        VisualNode::Group {
            transform,
            item: Some(id),
            children,
        } => {
            let [a, b, c, d, e, f] = (parent * *transform).as_coeffs();
            let _ = write!(
                out,
                "<div class=\"item\" data-id=\"{}\" style=\"position:absolute;left:0;top:0;transform-origin:0 0;transform:matrix({},{},{},{},{},{})\">",
                id, a, b, c, d, e, f
            );
            out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\" overflow=\"visible\" width=\"1\" height=\"1\">");
            for child in children {
                write_svg(child, out);
            }
            out.push_str("</svg></div>");
        }
        VisualNode::Overlay {
            transform,
            client_id,
            children,
        } => {
            let [a, b, c, d, e, f] = (parent * *transform).as_coeffs();
            let _ = write!(
                out,
                "<div class=\"cursor\" data-client=\"{}\" style=\"position:absolute;left:0;top:0;pointer-events:none;transform-origin:0 0;transform:matrix({},{},{},{},{},{})\">",
                escape(client_id), a, b, c, d, e, f
            );
            out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\" overflow=\"visible\" width=\"1\" height=\"1\">");
            for child in children {
                write_svg(child, out);
            }
            out.push_str("</svg></div>");
        }
        VisualNode::Group {
            transform,
            item: None,
            children,
        } => {
            let transform = parent * *transform;
            for child in children {
                write_node(child, transform, out);
            }
        }
        // Loose primitives outside an item group have no element to live in.
        VisualNode::Path { .. } | VisualNode::Text(_) => {}
    }
}

fn write_svg(node: &VisualNode, out: &mut String) {
    match node {
        VisualNode::Group {
            transform,
            children,
            ..
        }
        | VisualNode::Overlay {
            transform,
            children,
            ..
        } => {
            let [a, b, c, d, e, f] = transform.as_coeffs();
            let _ = write!(out, "<g transform=\"matrix({},{},{},{},{},{})\">", a, b, c, d, e, f);
            for child in children {
                write_svg(child, out);
            }
            out.push_str("</g>");
        }
        VisualNode::Path { path, fill, stroke } => {
            let _ = write!(out, "<path d=\"{}\" fill=\"{}\"", path.to_svg(), paint(*fill));
            match stroke {
                Some(stroke) => write_stroke(stroke, out),
                None => out.push_str(" stroke=\"none\""),
            }
            out.push_str("/>");
        }
        VisualNode::Text(block) => write_text(block, out),
    }
}

fn paint(color: Option<SerializableColor>) -> String {
    match color {
        Some(color) if color.a > 0 => color.to_hex(),
        _ => "none".to_string(),
    }
}

fn write_stroke(stroke: &StrokeStyle, out: &mut String) {
    let _ = write!(
        out,
        " stroke=\"{}\" stroke-width=\"{}\"",
        paint(Some(stroke.color)),
        stroke.width
    );
    if !stroke.dash.is_empty() {
        let dash: Vec<String> = stroke.dash.iter().map(|d| d.to_string()).collect();
        let _ = write!(out, " stroke-dasharray=\"{}\"", dash.join(" "));
    }
}

fn write_text(block: &TextBlock, out: &mut String) {
    let family = if block.monospace {
        "monospace".to_string()
    } else {
        block
            .font_family
            .as_deref()
            .map(escape)
            .unwrap_or_else(|| "sans-serif".to_string())
    };
    let weight = match block.weight {
        FontWeight::Light => "300",
        FontWeight::Normal => "400",
        FontWeight::Bold => "700",
    };
    let (anchor, x) = match block.align {
        TextAlign::Start => ("start", block.origin.x),
        TextAlign::Center => ("middle", block.origin.x + block.width / 2.0),
    };
    let _ = write!(
        out,
        "<text font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\" text-anchor=\"{}\"",
        family,
        block.font_size,
        weight,
        paint(Some(block.color)),
        anchor
    );
    if block.italic {
        out.push_str(" font-style=\"italic\"");
    }
    match block.decoration {
        TextDecoration::None => {}
        TextDecoration::Underline => out.push_str(" text-decoration=\"underline\""),
        TextDecoration::LineThrough => out.push_str(" text-decoration=\"line-through\""),
    }
    out.push('>');
    for (index, line) in block.lines.iter().enumerate() {
        let y = block.line_origin(index).y;
        let _ = write!(out, "<tspan x=\"{}\" y=\"{}\">{}</tspan>", x, y, escape(line));
    }
    out.push_str("</text>");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::CursorMark;
    use kurbo::{Point, Size, Vec2};
    use studiocanvas_core::items::{ItemKind, ItemList, SceneItem, ShapeKind};
    use studiocanvas_core::selection::Selection;
    use studiocanvas_core::viewport::Viewport;

    #[test]
    fn test_each_item_carries_camera() {
        let item = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::new(10.0, 20.0));
        let items = ItemList::new().add_item(item.clone());
        let selection = Selection::new();
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        viewport.pan(Vec2::new(100.0, 0.0));

        let tree = DomRenderer::new().render(&RenderFrame::new(&items, &selection, &viewport));
        let Some(VisualNode::Group { transform, .. }) = tree.find(item.id()) else {
            panic!("item not rendered");
        };
        assert_eq!(*transform * Point::ZERO, Point::new(110.0, 20.0));
    }

    #[test]
    fn test_markup_escapes_text() {
        let item = SceneItem::new(ItemKind::text("a < b & c"), Point::ZERO);
        let items = ItemList::new().add_item(item.clone());
        let selection = Selection::new();
        let viewport = Viewport::default();
        let tree = DomRenderer::new().render(&RenderFrame::new(&items, &selection, &viewport));

        let html = to_markup(&tree);
        assert!(html.starts_with("<div class=\"studio-canvas\""));
        assert!(html.contains(&format!("data-id=\"{}\"", item.id())));
        assert!(html.contains("a &lt; b &amp; c"));
        assert_eq!(html.matches("class=\"item\"").count(), 1);
    }

    #[test]
    fn test_markup_carries_text_decoration() {
        let mut struck = SceneItem::new(ItemKind::text("done"), Point::ZERO);
        struck.style.text_decoration = Some(TextDecoration::LineThrough);
        let plain = SceneItem::new(ItemKind::text("open"), Point::new(0.0, 100.0));
        let items = ItemList::new().add_item(struck).add_item(plain);
        let selection = Selection::new();
        let viewport = Viewport::default();
        let tree = DomRenderer::new().render(&RenderFrame::new(&items, &selection, &viewport));

        let html = to_markup(&tree);
        assert_eq!(html.matches("text-decoration=\"line-through\"").count(), 1);
        assert!(!html.contains("underline"));
    }

    #[test]
    fn test_cursor_overlay_markup() {
        let items = ItemList::new();
        let selection = Selection::new();
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        viewport.pan(Vec2::new(50.0, 10.0));
        let cursors = [CursorMark {
            client_id: "c2".into(),
            label: "Bob".into(),
            position: Point::new(100.0, 100.0),
            color: SerializableColor::new(236, 72, 153, 255),
        }];
        let frame = RenderFrame::new(&items, &selection, &viewport).with_cursors(&cursors);
        let tree = DomRenderer::new().render(&frame);

        assert_eq!(tree.overlay_ids(), vec!["c2"]);
        let html = to_markup(&tree);
        assert!(html.contains("class=\"cursor\" data-client=\"c2\""));
        assert!(html.contains("matrix(1,0,0,1,150,110)"));
        assert!(html.contains("fill=\"#ec4899\""));
        assert!(html.contains(">Bob</tspan>"));
    }
}
