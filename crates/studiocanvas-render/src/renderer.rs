//! Renderer trait abstraction.

use crate::visual::VisualTree;
use kurbo::{Affine, Point};
use studiocanvas_core::canvas::CanvasSession;
use studiocanvas_core::collaboration::Collaborator;
use studiocanvas_core::items::{ItemList, SerializableColor};
use studiocanvas_core::selection::Selection;
use studiocanvas_core::viewport::Viewport;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Invalid geometry for item {0}")]
    InvalidGeometry(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Default selection highlight color.
pub const SELECTION_COLOR: SerializableColor = SerializableColor::new(59, 130, 246, 255);

/// A collaborator's cursor to draw over the items.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorMark {
    pub client_id: String,
    pub label: String,
    /// World coordinates.
    pub position: Point,
    pub color: SerializableColor,
}

impl CursorMark {
    /// Mark of a collaborator with a known cursor position.
    pub fn from_collaborator(collaborator: &Collaborator) -> Option<Self> {
        Some(Self {
            client_id: collaborator.record.client_id.clone(),
            label: collaborator.display_name().to_string(),
            position: collaborator.cursor()?,
            color: collaborator.color(),
        })
    }

    /// Marks for every collaborator that has reported a cursor.
    pub fn collect<'c>(collaborators: impl IntoIterator<Item = &'c Collaborator>) -> Vec<Self> {
        collaborators
            .into_iter()
            .filter_map(Self::from_collaborator)
            .collect()
    }

    /// Local cursor space to world: unscaled pixels anchored at the position.
    pub(crate) fn world_transform(&self, viewport: &Viewport) -> Affine {
        Affine::translate(self.position.to_vec2()) * Affine::scale(1.0 / viewport.zoom)
    }

    /// Local cursor space to screen.
    pub(crate) fn screen_transform(&self, viewport: &Viewport) -> Affine {
        Affine::translate(viewport.world_to_screen(self.position).to_vec2())
    }
}

/// Everything needed to render one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub items: &'a ItemList,
    pub selection: &'a Selection,
    pub viewport: &'a Viewport,
    pub selection_color: SerializableColor,
    /// Drawn above every item.
    pub cursors: &'a [CursorMark],
}

impl<'a> RenderFrame<'a> {
    pub fn new(items: &'a ItemList, selection: &'a Selection, viewport: &'a Viewport) -> Self {
        Self {
            items,
            selection,
            viewport,
            selection_color: SELECTION_COLOR,
            cursors: &[],
        }
    }

    /// Frame of a session's current state, colored per its config.
    pub fn from_session(session: &'a CanvasSession) -> Self {
        Self::new(session.items(), session.selection(), session.viewport())
            .with_selection_color(session.config().render.selection_color)
    }

    pub fn with_selection_color(mut self, color: SerializableColor) -> Self {
        self.selection_color = color;
        self
    }

    pub fn with_cursors(mut self, cursors: &'a [CursorMark]) -> Self {
        self.cursors = cursors;
        self
    }
}

/// Trait for rendering backends.
///
/// Rendering is a pure mapping from a frame to a [`VisualTree`]; it never
/// mutates the items.
pub trait Renderer: Send + Sync {
    fn render(&mut self, frame: &RenderFrame) -> VisualTree;

    /// Backend name, for logging.
    fn name(&self) -> &'static str;
}
