//! Document store contract shared by the synchronizer and its backends.
//!
//! A store holds the authoritative item set of a project. Writes are partial
//! field merges; the store stamps each accepted write with a monotonic
//! timestamp and echoes it to every subscriber, including the writer.

mod memory;
mod record;

pub use memory::{MemoryConnection, MemoryStore};
pub use record::{ItemChange, ProjectRecord};

use crate::items::{ItemField, ItemId, ItemPatch, SceneItem, SerializableColor};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not subscribed to project {0}")]
    NotSubscribed(String),
    #[error("store connection is closed")]
    Disconnected,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-assigned write time in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

/// The signed-in user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Preferred cursor color; derived from the client id when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SerializableColor>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: None,
            color: None,
        }
    }
}

const COLLABORATOR_PALETTE: [SerializableColor; 8] = [
    SerializableColor::new(239, 68, 68, 255),
    SerializableColor::new(249, 115, 22, 255),
    SerializableColor::new(234, 179, 8, 255),
    SerializableColor::new(34, 197, 94, 255),
    SerializableColor::new(20, 184, 166, 255),
    SerializableColor::new(59, 130, 246, 255),
    SerializableColor::new(139, 92, 246, 255),
    SerializableColor::new(236, 72, 153, 255),
];

/// Stable palette color for a client or user key (FNV-1a).
pub fn collaborator_color(key: &str) -> SerializableColor {
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    COLLABORATOR_PALETTE[(hash % COLLABORATOR_PALETTE.len() as u64) as usize]
}

fn default_presence_color() -> SerializableColor {
    COLLABORATOR_PALETTE[0]
}

/// Plan entitlement lookup provided by the billing layer.
pub trait EntitlementCheck {
    fn has_collaboration_access(&self, plan_id: &str) -> bool;
}

impl<F> EntitlementCheck for F
where
    F: Fn(&str) -> bool,
{
    fn has_collaboration_access(&self, plan_id: &str) -> bool {
        self(plan_id)
    }
}

/// A write to one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemWrite {
    /// Create the item; if it already exists every field is merged.
    Create { item: SceneItem },
    /// Merge the given fields into an existing item.
    Merge { id: ItemId, patch: ItemPatch },
}

impl ItemWrite {
    pub fn item_id(&self) -> ItemId {
        match self {
            ItemWrite::Create { item } => item.id(),
            ItemWrite::Merge { id, .. } => *id,
        }
    }

    /// Fields the write touches.
    pub fn fields(&self) -> Vec<ItemField> {
        match self {
            ItemWrite::Create { .. } => ItemField::all().collect(),
            ItemWrite::Merge { patch, .. } => patch.fields().collect(),
        }
    }
}

/// Presence payload sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Cursor in world coordinates; `None` when off-canvas.
    #[serde(default)]
    pub cursor: Option<Point>,
    #[serde(default)]
    pub selection: Vec<ItemId>,
}

/// Presence of one connected client as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub client_id: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default = "default_presence_color")]
    pub color: SerializableColor,
    #[serde(default)]
    pub cursor: Option<Point>,
    #[serde(default)]
    pub selection: Vec<ItemId>,
    pub last_seen: Timestamp,
}

/// Who performed a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Connection that issued the write.
    pub client_id: String,
    pub user_id: String,
}

/// Notification drained from a store connection.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Full project state, delivered once after subscribing.
    Snapshot {
        items: Vec<SceneItem>,
        presence: Vec<PresenceRecord>,
        at: Timestamp,
    },
    ItemChanged {
        change: ItemChange,
        at: Timestamp,
        origin: Origin,
    },
    ItemDeleted {
        id: ItemId,
        at: Timestamp,
        origin: Origin,
    },
    Presence(PresenceRecord),
    /// The connection failed; no further events follow.
    Error(String),
}

/// A project store as seen from one client connection.
///
/// Calls never block on the network. Results of writes, and writes from
/// other clients, arrive through [`DocumentStore::poll`].
pub trait DocumentStore {
    /// Identifier of this connection, echoed in [`Origin::client_id`].
    fn client_id(&self) -> &str;

    fn subscribe(&mut self, project: &str, identity: &Identity) -> StoreResult<()>;

    fn unsubscribe(&mut self, project: &str) -> StoreResult<()>;

    /// Current value of an item in this connection's view of the project.
    fn get(&self, project: &str, id: ItemId) -> Option<SceneItem>;

    fn set(&mut self, project: &str, write: ItemWrite) -> StoreResult<()>;

    fn delete(&mut self, project: &str, id: ItemId) -> StoreResult<()>;

    fn set_presence(&mut self, project: &str, update: PresenceUpdate) -> StoreResult<()>;

    /// Drain pending events.
    fn poll(&mut self) -> Vec<StoreEvent>;
}
