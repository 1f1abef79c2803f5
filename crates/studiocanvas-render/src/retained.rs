//! Retained scene-graph backend: one camera node over world-space item groups.

use crate::compose::{compose_cursor, compose_item};
use crate::renderer::{RenderFrame, Renderer};
use crate::visual::{VisualNode, VisualTree};
use studiocanvas_core::geometry::item_bounds;

/// Scene-graph renderer. Suited to large item counts: the camera is a single
/// transform and off-screen items can be culled.
#[derive(Debug, Clone)]
pub struct SceneGraphRenderer {
    cull: bool,
    /// Items skipped by culling in the last frame.
    culled: usize,
}

impl Default for SceneGraphRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SceneGraphRenderer {
    pub fn new(cull: bool) -> Self {
        Self { cull, culled: 0 }
    }

    pub fn culled(&self) -> usize {
        self.culled
    }
}

impl Renderer for SceneGraphRenderer {
    fn render(&mut self, frame: &RenderFrame) -> VisualTree {
        let visible = frame.viewport.visible_world_rect();
        let mut culled = 0;
        let mut groups = Vec::with_capacity(frame.items.len());

        for item in frame.items.paint_order() {
            if self.cull {
                let on_screen = item_bounds(item, frame.items)
                    .is_some_and(|bounds| bounds.overlaps(visible));
                if !on_screen {
                    culled += 1;
                    continue;
                }
            }
            let selected = frame.selection.contains(item.id());
            if let Some(composed) =
                compose_item(item, frame.items, selected, frame.selection_color)
            {
                groups.push(VisualNode::group(
                    composed.transform,
                    Some(item.id()),
                    composed.children,
                ));
            }
        }

        if culled > 0 {
            log::trace!("Culled {} of {} items", culled, frame.items.len());
        }
        self.culled = culled;
        groups.extend(frame.cursors.iter().map(|mark| VisualNode::Overlay {
            transform: mark.world_transform(frame.viewport),
            client_id: mark.client_id.clone(),
            children: compose_cursor(mark),
        }));
        VisualTree::new(VisualNode::group(frame.viewport.transform(), None, groups))
    }

    fn name(&self) -> &'static str {
        "scene-graph"
    }
}
