//! Backend-neutral visual tree produced by every renderer.

use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use studiocanvas_core::items::{FontWeight, ItemId, SerializableColor, TextDecoration};

/// Stroke parameters in the coordinate space of the node that carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: SerializableColor,
    pub width: f64,
    /// Dash lengths; empty for a solid line.
    pub dash: Vec<f64>,
}

impl StrokeStyle {
    pub fn solid(color: SerializableColor, width: f64) -> Self {
        Self {
            color,
            width,
            dash: Vec::new(),
        }
    }

    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = dash;
        self
    }

    fn scaled(&self, scale: f64) -> Self {
        Self {
            color: self.color,
            width: self.width * scale,
            dash: self.dash.iter().map(|d| d * scale).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
}

/// Pre-wrapped text laid out from `origin` (top-left of the first line box).
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub origin: Point,
    /// Width of the layout box the lines were wrapped to.
    pub width: f64,
    pub lines: Vec<String>,
    pub font_size: f64,
    pub line_height: f64,
    pub color: SerializableColor,
    pub font_family: Option<String>,
    pub weight: FontWeight,
    pub italic: bool,
    pub monospace: bool,
    pub align: TextAlign,
    pub decoration: TextDecoration,
}

impl TextBlock {
    /// Local box covered by the lines.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(
            self.origin,
            (self.width, self.line_height * self.lines.len() as f64),
        )
    }

    /// Baseline origin of line `index`.
    pub fn line_origin(&self, index: usize) -> Point {
        Point::new(
            self.origin.x,
            self.origin.y + self.line_height * index as f64 + self.font_size,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualNode {
    /// Children drawn under `transform`. `item` marks the node of a scene item.
    Group {
        transform: Affine,
        item: Option<ItemId>,
        children: Vec<VisualNode>,
    },
    /// Collaborator cursor drawn above every item, in screen pixels.
    Overlay {
        transform: Affine,
        client_id: String,
        children: Vec<VisualNode>,
    },
    Path {
        path: BezPath,
        fill: Option<SerializableColor>,
        stroke: Option<StrokeStyle>,
    },
    Text(TextBlock),
}

impl VisualNode {
    pub fn group(transform: Affine, item: Option<ItemId>, children: Vec<VisualNode>) -> Self {
        VisualNode::Group {
            transform,
            item,
            children,
        }
    }

    pub fn fill(path: BezPath, color: SerializableColor) -> Self {
        VisualNode::Path {
            path,
            fill: Some(color),
            stroke: None,
        }
    }

    pub fn stroke(path: BezPath, stroke: StrokeStyle) -> Self {
        VisualNode::Path {
            path,
            fill: None,
            stroke: Some(stroke),
        }
    }
}

/// A screen-space drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        item: Option<ItemId>,
        path: BezPath,
        color: SerializableColor,
    },
    Stroke {
        item: Option<ItemId>,
        path: BezPath,
        style: StrokeStyle,
    },
    Text {
        item: Option<ItemId>,
        /// Local text space to screen.
        transform: Affine,
        block: TextBlock,
    },
}

impl DrawCommand {
    pub fn item(&self) -> Option<ItemId> {
        match self {
            DrawCommand::Fill { item, .. }
            | DrawCommand::Stroke { item, .. }
            | DrawCommand::Text { item, .. } => *item,
        }
    }

    /// Screen-space bounding box.
    pub fn bounds(&self) -> Rect {
        match self {
            DrawCommand::Fill { path, .. } | DrawCommand::Stroke { path, .. } => {
                path.bounding_box()
            }
            DrawCommand::Text {
                transform, block, ..
            } => transform.transform_rect_bbox(block.bounds()),
        }
    }
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTree {
    pub root: VisualNode,
}

impl VisualTree {
    pub fn new(root: VisualNode) -> Self {
        Self { root }
    }

    pub fn empty() -> Self {
        Self::new(VisualNode::group(Affine::IDENTITY, None, Vec::new()))
    }

    /// Item groups in draw order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        fn walk(node: &VisualNode, out: &mut Vec<ItemId>) {
            if let VisualNode::Group { item, children, .. } = node {
                if let Some(id) = item {
                    out.push(*id);
                }
                for child in children {
                    walk(child, out);
                }
            }
        }
        let mut ids = Vec::new();
        walk(&self.root, &mut ids);
        ids
    }

    /// Client ids of cursor overlays in draw order.
    pub fn overlay_ids(&self) -> Vec<&str> {
        fn walk<'a>(node: &'a VisualNode, out: &mut Vec<&'a str>) {
            match node {
                VisualNode::Overlay { client_id, .. } => out.push(client_id),
                VisualNode::Group { children, .. } => {
                    for child in children {
                        walk(child, out);
                    }
                }
                _ => {}
            }
        }
        let mut ids = Vec::new();
        walk(&self.root, &mut ids);
        ids
    }

    /// The group of one item, if it was drawn.
    pub fn find(&self, id: ItemId) -> Option<&VisualNode> {
        fn walk(node: &VisualNode, id: ItemId) -> Option<&VisualNode> {
            match node {
                VisualNode::Group { item, .. } if *item == Some(id) => Some(node),
                VisualNode::Group { children, .. } => {
                    children.iter().find_map(|child| walk(child, id))
                }
                _ => None,
            }
        }
        walk(&self.root, id)
    }

    /// Resolve every transform into screen-space draw commands.
    pub fn flatten(&self) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        flatten_node(&self.root, Affine::IDENTITY, None, &mut commands);
        commands
    }
}

fn flatten_node(
    node: &VisualNode,
    transform: Affine,
    item: Option<ItemId>,
    out: &mut Vec<DrawCommand>,
) {
    match node {
        VisualNode::Group {
            transform: local,
            item: group_item,
            children,
        } => {
            let transform = transform * *local;
            let item = group_item.or(item);
            for child in children {
                flatten_node(child, transform, item, out);
            }
        }
        VisualNode::Overlay {
            transform: local,
            children,
            ..
        } => {
            let transform = transform * *local;
            for child in children {
                flatten_node(child, transform, None, out);
            }
        }
        VisualNode::Path { path, fill, stroke } => {
            let mut screen = path.clone();
            screen.apply_affine(transform);
            if let Some(color) = fill {
                out.push(DrawCommand::Fill {
                    item,
                    path: screen.clone(),
                    color: *color,
                });
            }
            if let Some(stroke) = stroke {
                let scale = transform.determinant().abs().sqrt();
                out.push(DrawCommand::Stroke {
                    item,
                    path: screen,
                    style: stroke.scaled(scale),
                });
            }
        }
        VisualNode::Text(block) => out.push(DrawCommand::Text {
            item,
            transform,
            block: block.clone(),
        }),
    }
}
