//! In-process document store, shared by any number of connections.

use super::{
    DocumentStore, Identity, ItemWrite, Origin, PresenceUpdate, ProjectRecord, StoreError,
    StoreEvent, StoreResult, Timestamp,
};
use crate::items::{ItemId, ItemList, SceneItem};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

struct Subscriber {
    identity: Identity,
    tx: Sender<StoreEvent>,
}

#[derive(Default)]
struct Project {
    record: ProjectRecord,
    subscribers: HashMap<String, Subscriber>,
}

impl Project {
    fn broadcast(&mut self, event: StoreEvent) {
        self.subscribers
            .retain(|_, subscriber| subscriber.tx.send(event.clone()).is_ok());
    }
}

#[derive(Default)]
struct Shared {
    projects: HashMap<String, Project>,
    offline: bool,
}

/// Shared in-memory backend. Clones refer to the same projects.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client connection.
    pub fn connect(&self) -> MemoryConnection {
        let (tx, rx) = channel();
        MemoryConnection {
            client_id: Uuid::new_v4().to_string(),
            store: self.clone(),
            subscription: None,
            tx,
            rx,
        }
    }

    /// Simulate an outage: every call fails with [`StoreError::Disconnected`].
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.offline = offline;
        }
    }

    /// Authoritative items of a project.
    pub fn project_items(&self, project: &str) -> Option<ItemList> {
        let shared = self.shared.lock().ok()?;
        shared
            .projects
            .get(project)
            .map(|p| p.record.items().clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Shared>> {
        let shared = self
            .shared
            .lock()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        if shared.offline {
            return Err(StoreError::Disconnected);
        }
        Ok(shared)
    }
}

/// One client's handle on a [`MemoryStore`].
pub struct MemoryConnection {
    client_id: String,
    store: MemoryStore,
    subscription: Option<(String, Identity)>,
    tx: Sender<StoreEvent>,
    rx: Receiver<StoreEvent>,
}

impl MemoryConnection {
    fn origin(&self, project: &str) -> StoreResult<Origin> {
        match &self.subscription {
            Some((subscribed, identity)) if subscribed == project => Ok(Origin {
                client_id: self.client_id.clone(),
                user_id: identity.user_id.clone(),
            }),
            _ => Err(StoreError::NotSubscribed(project.to_string())),
        }
    }
}

impl DocumentStore for MemoryConnection {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn subscribe(&mut self, project: &str, identity: &Identity) -> StoreResult<()> {
        if let Some((current, _)) = self.subscription.clone() {
            self.unsubscribe(&current)?;
        }
        let mut shared = self.store.lock()?;
        let entry = shared.projects.entry(project.to_string()).or_default();
        let (items, presence) = entry.record.snapshot();
        let at = entry.record.last_timestamp();
        entry.subscribers.insert(
            self.client_id.clone(),
            Subscriber {
                identity: identity.clone(),
                tx: self.tx.clone(),
            },
        );
        drop(shared);

        self.tx
            .send(StoreEvent::Snapshot {
                items,
                presence,
                at,
            })
            .map_err(|_| StoreError::Disconnected)?;
        self.subscription = Some((project.to_string(), identity.clone()));
        log::debug!("{} subscribed to {}", self.client_id, project);
        Ok(())
    }

    fn unsubscribe(&mut self, project: &str) -> StoreResult<()> {
        self.origin(project)?;
        self.subscription = None;
        let mut shared = self.store.lock()?;
        if let Some(entry) = shared.projects.get_mut(project) {
            entry.subscribers.remove(&self.client_id);
            entry.record.remove_presence(&self.client_id);
        }
        Ok(())
    }

    fn get(&self, project: &str, id: ItemId) -> Option<SceneItem> {
        let shared = self.store.lock().ok()?;
        shared.projects.get(project)?.record.get(id).cloned()
    }

    fn set(&mut self, project: &str, write: ItemWrite) -> StoreResult<()> {
        let origin = self.origin(project)?;
        let mut shared = self.store.lock()?;
        let entry = shared
            .projects
            .get_mut(project)
            .ok_or_else(|| StoreError::NotSubscribed(project.to_string()))?;
        let at = entry.record.stamp(Timestamp::now());
        if let Some(change) = entry.record.apply(&write, at) {
            entry.broadcast(StoreEvent::ItemChanged { change, at, origin });
        }
        Ok(())
    }

    fn delete(&mut self, project: &str, id: ItemId) -> StoreResult<()> {
        let origin = self.origin(project)?;
        let mut shared = self.store.lock()?;
        let entry = shared
            .projects
            .get_mut(project)
            .ok_or_else(|| StoreError::NotSubscribed(project.to_string()))?;
        if entry.record.delete(id) {
            let at = entry.record.stamp(Timestamp::now());
            entry.broadcast(StoreEvent::ItemDeleted { id, at, origin });
        }
        Ok(())
    }

    fn set_presence(&mut self, project: &str, update: PresenceUpdate) -> StoreResult<()> {
        self.origin(project)?;
        let mut shared = self.store.lock()?;
        let entry = shared
            .projects
            .get_mut(project)
            .ok_or_else(|| StoreError::NotSubscribed(project.to_string()))?;
        let Some(identity) = entry
            .subscribers
            .get(&self.client_id)
            .map(|s| s.identity.clone())
        else {
            return Err(StoreError::NotSubscribed(project.to_string()));
        };
        let at = entry.record.stamp(Timestamp::now());
        let record = entry
            .record
            .update_presence(&self.client_id, &identity, update, at);
        entry.broadcast(StoreEvent::Presence(record));
        Ok(())
    }

    fn poll(&mut self) -> Vec<StoreEvent> {
        self.rx.try_iter().collect()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Some((project, _)) = self.subscription.clone() {
            let _ = self.unsubscribe(&project);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemKind, ItemPatch, ShapeKind};
    use crate::store::ItemChange;
    use kurbo::Point;

    fn joined(store: &MemoryStore, user: &str) -> MemoryConnection {
        let mut conn = store.connect();
        conn.subscribe("p1", &Identity::new(user, user)).unwrap();
        conn
    }

    #[test]
    fn test_subscribe_delivers_snapshot() {
        let store = MemoryStore::new();
        let mut conn = joined(&store, "ada");
        let events = conn.poll();
        assert!(matches!(&events[..], [StoreEvent::Snapshot { items, .. }] if items.is_empty()));
    }

    #[test]
    fn test_writes_are_echoed_to_every_subscriber() {
        let store = MemoryStore::new();
        let mut a = joined(&store, "ada");
        let mut b = joined(&store, "bob");
        a.poll();
        b.poll();

        let item = SceneItem::new(ItemKind::shape(ShapeKind::Circle), Point::ZERO);
        a.set("p1", ItemWrite::Create { item: item.clone() }).unwrap();

        for conn in [&mut a, &mut b] {
            let events = conn.poll();
            assert_eq!(events.len(), 1);
            let StoreEvent::ItemChanged { change, origin, .. } = &events[0] else {
                panic!("expected item change");
            };
            assert_eq!(change, &ItemChange::Created { item: item.clone() });
            assert_eq!(origin.user_id, "ada");
        }
        assert_eq!(b.get("p1", item.id()), Some(item));
    }

    #[test]
    fn test_timestamps_increase() {
        let store = MemoryStore::new();
        let mut a = joined(&store, "ada");
        a.poll();
        let item = SceneItem::new(ItemKind::text("x"), Point::ZERO);
        let id = item.id();
        a.set("p1", ItemWrite::Create { item }).unwrap();
        a.set(
            "p1",
            ItemWrite::Merge {
                id,
                patch: ItemPatch::new().z_index(4),
            },
        )
        .unwrap();
        a.delete("p1", id).unwrap();

        let stamps: Vec<Timestamp> = a
            .poll()
            .into_iter()
            .filter_map(|event| match event {
                StoreEvent::ItemChanged { at, .. } | StoreEvent::ItemDeleted { at, .. } => Some(at),
                _ => None,
            })
            .collect();
        assert_eq!(stamps.len(), 3);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_requires_subscription() {
        let store = MemoryStore::new();
        let mut conn = store.connect();
        let err = conn.delete("p1", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotSubscribed(_)));
    }

    #[test]
    fn test_offline_store_fails() {
        let store = MemoryStore::new();
        let mut conn = joined(&store, "ada");
        store.set_offline(true);
        let err = conn
            .set_presence("p1", PresenceUpdate::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Disconnected));
    }

    #[test]
    fn test_dropping_connection_clears_presence() {
        let store = MemoryStore::new();
        let mut a = joined(&store, "ada");
        a.set_presence("p1", PresenceUpdate::default()).unwrap();
        drop(a);

        let mut b = joined(&store, "bob");
        let events = b.poll();
        assert!(matches!(&events[..], [StoreEvent::Snapshot { presence, .. }] if presence.is_empty()));
    }
}
