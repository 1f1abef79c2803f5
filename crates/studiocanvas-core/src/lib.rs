//! StudioCanvas Core Library
//!
//! Platform-agnostic scene model, geometry, interaction and collaboration
//! logic for the studio canvas.

pub mod canvas;
pub mod collaboration;
pub mod config;
pub mod geometry;
pub mod history;
pub mod input;
pub mod items;
pub mod selection;
pub mod store;
pub mod sync;
pub mod viewport;

pub use canvas::CanvasSession;
pub use collaboration::{
    CollaborationState, Collaborator, CursorThrottle, SyncNotice, Synchronizer,
};
pub use config::{CanvasConfig, ConfigError};
pub use history::HistoryLog;
pub use input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use items::{ItemId, ItemKind, ItemList, ItemPatch, ItemStyle, Mutation, SceneItem};
pub use selection::{Selection, SelectionState};
pub use store::{
    collaborator_color, DocumentStore, Identity, MemoryStore, StoreError, StoreEvent,
};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::RelayConnection;
pub use sync::{ClientMessage, ConnectionState, ServerMessage};
pub use viewport::Viewport;
