//! Scene item model: every placeable object on the canvas.

mod list;
mod patch;
mod style;

pub use list::ItemList;
pub use patch::{FieldValue, ItemField, ItemPatch, Mutation};
pub use style::{
    BorderStyle, FontStyle, FontWeight, ItemStyle, SerializableColor, StyleField, StyleValue,
    TextDecoration,
};

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for scene items.
pub type ItemId = Uuid;

/// Outline kinds available for [`ItemKind::Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    RoundedRectangle,
    Circle,
    Triangle,
    Diamond,
    Hexagon,
    Pentagon,
    Octagon,
    Star,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Heart,
}

/// Level of a mind-map node; drives auto-sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MindMapKind {
    Central,
    Primary,
    #[default]
    Secondary,
}

/// Kanban-style priority carried by sticky notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    pub fn color(&self) -> SerializableColor {
        match self {
            Priority::Low => SerializableColor::new(34, 197, 94, 255),
            Priority::Medium => SerializableColor::new(234, 179, 8, 255),
            Priority::High => SerializableColor::new(249, 115, 22, 255),
            Priority::Urgent => SerializableColor::new(239, 68, 68, 255),
        }
    }
}

/// How a connector travels between its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    #[default]
    Straight,
    Curved,
    Elbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
}

/// Kind-specific payload of a [`SceneItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Shape {
        shape: ShapeKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Text {
        content: String,
    },
    StickyNote {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
    },
    MindMapNode {
        text: String,
        node: MindMapKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    /// Endpoints are id lookups into the owning list; `None` once the
    /// referenced item has been deleted.
    Connector {
        from: Option<ItemId>,
        to: Option<ItemId>,
        #[serde(default)]
        routing: Routing,
    },
    Frame {
        title: String,
    },
    Chart {
        chart: ChartKind,
        #[serde(default)]
        series: Vec<f64>,
        #[serde(default)]
        title: String,
    },
    Table {
        rows: usize,
        columns: usize,
        #[serde(default)]
        cells: Vec<Vec<String>>,
    },
    CodeBlock {
        code: String,
        #[serde(default)]
        language: String,
    },
    Comment {
        text: String,
        #[serde(default)]
        author: String,
    },
    Image {
        source: String,
    },
}

impl ItemKind {
    pub fn shape(shape: ShapeKind) -> Self {
        ItemKind::Shape { shape, label: None }
    }

    pub fn text(content: impl Into<String>) -> Self {
        ItemKind::Text {
            content: content.into(),
        }
    }

    pub fn sticky_note(text: impl Into<String>) -> Self {
        ItemKind::StickyNote {
            text: text.into(),
            priority: None,
        }
    }

    pub fn mind_map(node: MindMapKind, text: impl Into<String>) -> Self {
        ItemKind::MindMapNode {
            text: text.into(),
            node,
            icon: None,
        }
    }

    pub fn connector(from: ItemId, to: ItemId, routing: Routing) -> Self {
        ItemKind::Connector {
            from: Some(from),
            to: Some(to),
            routing,
        }
    }

    pub fn frame(title: impl Into<String>) -> Self {
        ItemKind::Frame {
            title: title.into(),
        }
    }

    /// Short human-readable name of the kind (used for placeholders and markup classes).
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Shape { .. } => "shape",
            ItemKind::Text { .. } => "text",
            ItemKind::StickyNote { .. } => "sticky-note",
            ItemKind::MindMapNode { .. } => "mind-map-node",
            ItemKind::Connector { .. } => "connector",
            ItemKind::Frame { .. } => "frame",
            ItemKind::Chart { .. } => "chart",
            ItemKind::Table { .. } => "table",
            ItemKind::CodeBlock { .. } => "code-block",
            ItemKind::Comment { .. } => "comment",
            ItemKind::Image { .. } => "image",
        }
    }

    /// Primary text content, if this kind carries any.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            ItemKind::Shape { label, .. } => label.as_deref(),
            ItemKind::Text { content } => Some(content),
            ItemKind::StickyNote { text, .. }
            | ItemKind::MindMapNode { text, .. }
            | ItemKind::Comment { text, .. } => Some(text),
            ItemKind::Frame { title } | ItemKind::Chart { title, .. } => Some(title),
            ItemKind::CodeBlock { code, .. } => Some(code),
            ItemKind::Connector { .. } | ItemKind::Table { .. } | ItemKind::Image { .. } => None,
        }
    }

    pub fn is_connector(&self) -> bool {
        matches!(self, ItemKind::Connector { .. })
    }

    /// Whether this kind references `id` as a connector endpoint.
    pub fn references(&self, id: ItemId) -> bool {
        match self {
            ItemKind::Connector { from, to, .. } => *from == Some(id) || *to == Some(id),
            _ => false,
        }
    }

    /// Drop `id` from connector endpoints. Returns true if anything changed.
    pub(crate) fn detach(&mut self, id: ItemId) -> bool {
        let ItemKind::Connector { from, to, .. } = self else {
            return false;
        };
        let mut changed = false;
        if *from == Some(id) {
            *from = None;
            changed = true;
        }
        if *to == Some(id) {
            *to = None;
            changed = true;
        }
        changed
    }
}

/// One placeable object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    pub(crate) id: ItemId,
    /// Top-left corner in canvas (world) coordinates.
    pub position: Point,
    /// Explicit size; `None` means auto-derived (see [`crate::geometry::resolve_size`]).
    #[serde(default)]
    pub size: Option<Size>,
    /// Paint order key (higher draws on top).
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub style: ItemStyle,
    pub kind: ItemKind,
}

impl SceneItem {
    /// Create a new item with a fresh id. `z_index` is assigned when added to a list.
    pub fn new(kind: ItemKind, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            size: None,
            z_index: 0,
            style: ItemStyle::default(),
            kind,
        }
    }

    /// Reconstruct an item with a known id (remote or stored data).
    pub fn with_id(id: ItemId, kind: ItemKind, position: Point) -> Self {
        Self {
            id,
            ..Self::new(kind, position)
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_style(mut self, style: ItemStyle) -> Self {
        self.style = style;
        self
    }

    /// Give the item a fresh id (used when duplicating or pasting).
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serialization_is_tagged() {
        let item = SceneItem::new(ItemKind::sticky_note("ship it"), Point::new(1.0, 2.0));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""type":"sticky_note""#));

        let back: SceneItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_detach_clears_only_matching_endpoint() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut kind = ItemKind::connector(a, b, Routing::Elbow);

        assert!(kind.references(a));
        assert!(kind.detach(a));
        assert!(!kind.references(a));
        assert!(kind.references(b));
        assert!(!kind.detach(a));
    }

    #[test]
    fn test_text_content() {
        assert_eq!(ItemKind::text("hello").text_content(), Some("hello"));
        assert_eq!(ItemKind::shape(ShapeKind::Star).text_content(), None);
    }
}
