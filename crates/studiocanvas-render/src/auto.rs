//! Backend selection by item count.

use crate::dom::DomRenderer;
use crate::renderer::{RenderFrame, Renderer};
use crate::retained::SceneGraphRenderer;
use crate::visual::VisualTree;
use studiocanvas_core::config::RenderConfig;

/// Default item count above which the retained backend is used.
pub const DEFAULT_RETAINED_THRESHOLD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    SceneGraph,
    Dom,
}

/// Delegates to the DOM backend for small canvases and to the scene graph
/// once the item count exceeds `threshold`.
#[derive(Debug, Clone)]
pub struct AutoRenderer {
    threshold: usize,
    scene_graph: SceneGraphRenderer,
    dom: DomRenderer,
    last: Option<Backend>,
}

impl Default for AutoRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_THRESHOLD)
    }
}

impl AutoRenderer {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            scene_graph: SceneGraphRenderer::default(),
            dom: DomRenderer::new(),
            last: None,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            scene_graph: SceneGraphRenderer::new(config.cull),
            ..Self::new(config.retained_threshold)
        }
    }

    pub fn backend_for(&self, item_count: usize) -> Backend {
        if item_count > self.threshold {
            Backend::SceneGraph
        } else {
            Backend::Dom
        }
    }

    /// Backend used for the last frame.
    pub fn last_backend(&self) -> Option<Backend> {
        self.last
    }
}

impl Renderer for AutoRenderer {
    fn render(&mut self, frame: &RenderFrame) -> VisualTree {
        let backend = self.backend_for(frame.items.len());
        if self.last != Some(backend) {
            log::debug!(
                "Switching to {:?} backend at {} items",
                backend,
                frame.items.len()
            );
            self.last = Some(backend);
        }
        match backend {
            Backend::SceneGraph => self.scene_graph.render(frame),
            Backend::Dom => self.dom.render(frame),
        }
    }

    fn name(&self) -> &'static str {
        match self.last {
            Some(Backend::SceneGraph) => self.scene_graph.name(),
            Some(Backend::Dom) => self.dom.name(),
            None => "auto",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::CursorMark;
    use crate::visual::DrawCommand;
    use kurbo::{Point, Shape as _, Size, Vec2};
    use studiocanvas_core::items::{
        ItemKind, ItemList, MindMapKind, Routing, SceneItem, SerializableColor, ShapeKind,
    };
    use studiocanvas_core::selection::Selection;
    use studiocanvas_core::viewport::Viewport;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn equivalent(a: &DrawCommand, b: &DrawCommand) -> bool {
        let (ra, rb) = (a.bounds(), b.bounds());
        let same_box = close(ra.x0, rb.x0)
            && close(ra.y0, rb.y0)
            && close(ra.x1, rb.x1)
            && close(ra.y1, rb.y1);
        let same_paint = match (a, b) {
            (DrawCommand::Fill { color: ca, .. }, DrawCommand::Fill { color: cb, .. }) => ca == cb,
            (DrawCommand::Stroke { style: sa, .. }, DrawCommand::Stroke { style: sb, .. }) => {
                sa.color == sb.color && close(sa.width, sb.width)
            }
            (DrawCommand::Text { block: ba, .. }, DrawCommand::Text { block: bb, .. }) => ba == bb,
            _ => false,
        };
        a.item() == b.item() && same_box && same_paint
    }

    #[test]
    fn test_backends_flatten_equivalently() {
        let shape = SceneItem::new(ItemKind::shape(ShapeKind::Hexagon), Point::new(40.0, 40.0));
        let mut note = SceneItem::new(ItemKind::sticky_note("remember the milk"), Point::new(300.0, 80.0));
        note.style.rotation = Some(15.0);
        let node = SceneItem::new(ItemKind::mind_map(MindMapKind::Primary, "Goals"), Point::new(100.0, 320.0));
        let link = SceneItem::new(
            ItemKind::connector(shape.id(), node.id(), Routing::Elbow),
            Point::ZERO,
        );
        let items = ItemList::new()
            .add_item(shape.clone())
            .add_item(note.clone())
            .add_item(node)
            .add_item(link);
        let mut selection = Selection::new();
        selection.select(note.id());
        let mut viewport = Viewport::new(Size::new(1024.0, 768.0));
        viewport.pan(Vec2::new(25.0, -10.0));
        viewport.zoom_at(Point::new(200.0, 200.0), 1.5);
        let cursors = [cursor("c2", Point::new(120.0, 90.0))];
        let frame = RenderFrame::new(&items, &selection, &viewport).with_cursors(&cursors);

        let retained = SceneGraphRenderer::default().render(&frame).flatten();
        let dom = DomRenderer::new().render(&frame).flatten();

        assert!(!retained.is_empty());
        assert_eq!(retained.len(), dom.len());
        for (a, b) in retained.iter().zip(&dom) {
            assert!(equivalent(a, b), "{:?} != {:?}", a, b);
        }
    }

    fn cursor(client_id: &str, position: Point) -> CursorMark {
        CursorMark {
            client_id: client_id.into(),
            label: client_id.to_uppercase(),
            position,
            color: SerializableColor::new(139, 92, 246, 255),
        }
    }

    #[test]
    fn test_cursors_drawn_above_items() {
        let under = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::new(90.0, 90.0));
        let items = ItemList::new().add_item(under.clone());
        let selection = Selection::new();
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        viewport.zoom_at(Point::ZERO, 2.0);
        let cursors = [
            cursor("c2", Point::new(100.0, 100.0)),
            cursor("c3", Point::new(5000.0, 5000.0)),
        ];
        let frame = RenderFrame::new(&items, &selection, &viewport).with_cursors(&cursors);

        for tree in [
            SceneGraphRenderer::default().render(&frame),
            DomRenderer::new().render(&frame),
        ] {
            assert_eq!(tree.overlay_ids(), vec!["c2", "c3"]);
            assert_eq!(tree.item_ids(), vec![under.id()]);

            let commands = tree.flatten();
            let first_cursor = commands
                .iter()
                .position(|c| c.item().is_none())
                .unwrap();
            assert!(commands[first_cursor..].iter().all(|c| c.item().is_none()));
            assert!(commands[..first_cursor].iter().all(|c| c.item() == Some(under.id())));

            // Cursor art stays at its pixel size whatever the zoom.
            let DrawCommand::Fill { path, color, .. } = &commands[first_cursor] else {
                panic!("expected cursor arrow");
            };
            assert_eq!(*color, SerializableColor::new(139, 92, 246, 255));
            let bounds = path.bounding_box();
            assert!((bounds.x0 - 200.0).abs() < 1e-6);
            assert!((bounds.y0 - 200.0).abs() < 1e-6);
            assert!((bounds.width() - 12.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_switches_on_threshold() {
        let mut items = ItemList::new();
        for i in 0..3 {
            items = items.add_item(SceneItem::new(ItemKind::text("t"), Point::new(i as f64, 0.0)));
        }
        let selection = Selection::new();
        let viewport = Viewport::default();
        let frame = RenderFrame::new(&items, &selection, &viewport);

        let mut renderer = AutoRenderer::new(2);
        renderer.render(&frame);
        assert_eq!(renderer.last_backend(), Some(Backend::SceneGraph));
        assert_eq!(renderer.name(), "scene-graph");

        let mut renderer = AutoRenderer::new(3);
        renderer.render(&frame);
        assert_eq!(renderer.last_backend(), Some(Backend::Dom));
    }

    #[test]
    fn test_from_config() {
        let renderer = AutoRenderer::from_config(&RenderConfig::default());
        assert_eq!(renderer.backend_for(200), Backend::Dom);
        assert_eq!(renderer.backend_for(201), Backend::SceneGraph);
    }
}
