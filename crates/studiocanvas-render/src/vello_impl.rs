//! Vello scene encoding of visual trees.

use crate::renderer::{RenderResult, RendererError};
use crate::visual::{DrawCommand, VisualTree};
use kurbo::{Affine, BezPath, PathEl, Stroke};
use peniko::{Color, Fill};
use studiocanvas_core::items::SerializableColor;
use vello::Scene;

/// Encodes flattened draw commands into a [`vello::Scene`].
///
/// Text is left to the host's text stack; its commands are counted but not
/// encoded.
pub struct VelloEncoder {
    scene: Scene,
    skipped_text: usize,
}

impl Default for VelloEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn finite(path: &BezPath) -> bool {
    path.elements().iter().all(|el| match el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => p.is_finite(),
        PathEl::QuadTo(a, b) => a.is_finite() && b.is_finite(),
        PathEl::CurveTo(a, b, c) => a.is_finite() && b.is_finite() && c.is_finite(),
        PathEl::ClosePath => true,
    })
}

fn color(color: SerializableColor) -> Color {
    color.into()
}

impl VelloEncoder {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            skipped_text: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Text commands skipped by the last encode.
    pub fn skipped_text(&self) -> usize {
        self.skipped_text
    }

    /// Replace the scene with `tree`.
    pub fn encode(&mut self, tree: &VisualTree) -> RenderResult<()> {
        self.scene.reset();
        self.skipped_text = 0;

        for command in tree.flatten() {
            match command {
                DrawCommand::Fill { item, path, color: fill } => {
                    if !finite(&path) {
                        return Err(invalid(item));
                    }
                    self.scene
                        .fill(Fill::NonZero, Affine::IDENTITY, color(fill), None, &path);
                }
                DrawCommand::Stroke { item, path, style } => {
                    if !finite(&path) || !style.width.is_finite() {
                        return Err(invalid(item));
                    }
                    let mut stroke = Stroke::new(style.width);
                    if !style.dash.is_empty() {
                        stroke = stroke.with_dashes(0.0, style.dash.iter().copied());
                    }
                    self.scene
                        .stroke(&stroke, Affine::IDENTITY, color(style.color), None, &path);
                }
                DrawCommand::Text { .. } => self.skipped_text += 1,
            }
        }

        if self.skipped_text > 0 {
            log::trace!("Left {} text blocks to the host", self.skipped_text);
        }
        Ok(())
    }
}

fn invalid(item: Option<studiocanvas_core::items::ItemId>) -> RendererError {
    match item {
        Some(id) => RendererError::InvalidGeometry(id.to_string()),
        None => RendererError::RenderFailed("non-finite geometry".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RenderFrame, Renderer};
    use crate::retained::SceneGraphRenderer;
    use crate::visual::{VisualNode, StrokeStyle};
    use kurbo::{Point, Rect, Shape as KurboShape};
    use studiocanvas_core::items::{ItemKind, ItemList, SceneItem, ShapeKind};
    use studiocanvas_core::selection::Selection;
    use studiocanvas_core::viewport::Viewport;

    #[test]
    fn test_encode_frame() {
        let item = SceneItem::new(ItemKind::text("label"), Point::ZERO);
        let items = ItemList::new()
            .add_item(SceneItem::new(ItemKind::shape(ShapeKind::Circle), Point::ZERO))
            .add_item(item);
        let selection = Selection::new();
        let viewport = Viewport::default();
        let tree = SceneGraphRenderer::default().render(&RenderFrame::new(&items, &selection, &viewport));

        let mut encoder = VelloEncoder::new();
        assert!(encoder.encode(&tree).is_ok());
        assert_eq!(encoder.skipped_text(), 1);
    }

    #[test]
    fn test_rejects_non_finite_paths() {
        let path = Rect::new(0.0, 0.0, f64::NAN, 1.0).to_path(0.1);
        let tree = VisualTree::new(VisualNode::stroke(
            path,
            StrokeStyle::solid(SerializableColor::black(), 1.0),
        ));
        let mut encoder = VelloEncoder::new();
        assert!(encoder.encode(&tree).is_err());
    }
}
