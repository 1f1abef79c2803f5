//! StudioCanvas Render Library
//!
//! Renderer abstraction and backends for the studio canvas. Both backends
//! produce a [`VisualTree`]; the optional Vello encoder turns one into a GPU
//! scene.

mod auto;
mod compose;
mod dom;
mod renderer;
mod retained;
mod visual;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use auto::{AutoRenderer, Backend, DEFAULT_RETAINED_THRESHOLD};
pub use compose::{compose_cursor, compose_item, Composition};
pub use dom::{to_markup, DomRenderer};
pub use renderer::{
    CursorMark, RenderFrame, RenderResult, Renderer, RendererError, SELECTION_COLOR,
};
pub use retained::SceneGraphRenderer;
pub use visual::{DrawCommand, StrokeStyle, TextAlign, TextBlock, VisualNode, VisualTree};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloEncoder;
