//! Authoritative per-project state with per-field write clocks.

use super::{collaborator_color, Identity, ItemWrite, PresenceRecord, PresenceUpdate, Timestamp};
use crate::items::{ItemField, ItemId, ItemList, ItemPatch, SceneItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An accepted item write, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemChange {
    Created { item: SceneItem },
    /// Only the fields that won the merge.
    Merged { id: ItemId, patch: ItemPatch },
}

impl ItemChange {
    pub fn item_id(&self) -> ItemId {
        match self {
            ItemChange::Created { item } => item.id(),
            ItemChange::Merged { id, .. } => *id,
        }
    }

    pub fn fields(&self) -> Vec<ItemField> {
        match self {
            ItemChange::Created { .. } => ItemField::all().collect(),
            ItemChange::Merged { patch, .. } => patch.fields().collect(),
        }
    }
}

/// Items, field clocks and presence of one project.
///
/// Every field of every item is a last-writer-wins register keyed by the
/// write's timestamp. Merges into an absent item are dropped; a create after
/// a delete restores the item (undo of a delete).
#[derive(Debug, Clone, Default)]
pub struct ProjectRecord {
    items: ItemList,
    clocks: HashMap<(ItemId, ItemField), Timestamp>,
    presence: HashMap<String, PresenceRecord>,
    last: Timestamp,
}

impl ProjectRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next write timestamp: the wall clock, bumped to stay strictly increasing.
    pub fn stamp(&mut self, now: Timestamp) -> Timestamp {
        let at = if now > self.last {
            now
        } else {
            Timestamp(self.last.0 + 1)
        };
        self.last = at;
        at
    }

    pub fn last_timestamp(&self) -> Timestamp {
        self.last
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&SceneItem> {
        self.items.get(id)
    }

    pub fn field_clock(&self, id: ItemId, field: ItemField) -> Option<Timestamp> {
        self.clocks.get(&(id, field)).copied()
    }

    /// Merge a write made at `at`. Returns the change that took effect, if any.
    pub fn apply(&mut self, write: &ItemWrite, at: Timestamp) -> Option<ItemChange> {
        let id = write.item_id();
        match write {
            ItemWrite::Create { item } if !self.items.contains(id) => {
                self.items = self.items.insert_item(item.clone());
                for field in ItemField::all() {
                    self.clocks.insert((id, field), at);
                }
                Some(ItemChange::Created { item: item.clone() })
            }
            ItemWrite::Create { item } => self.merge(id, &ItemPatch::from_item(item), at),
            ItemWrite::Merge { id, patch } => self.merge(*id, patch, at),
        }
    }

    fn merge(&mut self, id: ItemId, patch: &ItemPatch, at: Timestamp) -> Option<ItemChange> {
        if !self.items.contains(id) {
            return None;
        }
        let winning = patch.clone().retain(|field| {
            self.clocks
                .get(&(id, field))
                .is_none_or(|clock| *clock <= at)
        });
        if winning.is_empty() {
            return None;
        }
        for field in winning.fields() {
            self.clocks.insert((id, field), at);
        }
        self.items = self.items.update_item(id, &winning);
        Some(ItemChange::Merged { id, patch: winning })
    }

    /// Delete an item and detach it from connectors. Returns false if absent.
    pub fn delete(&mut self, id: ItemId) -> bool {
        if !self.items.contains(id) {
            return false;
        }
        self.items = self.items.remove_item(id);
        self.clocks.retain(|(item, _), _| *item != id);
        true
    }

    pub fn update_presence(
        &mut self,
        client_id: &str,
        identity: &Identity,
        update: PresenceUpdate,
        at: Timestamp,
    ) -> PresenceRecord {
        let record = PresenceRecord {
            client_id: client_id.to_string(),
            user_id: identity.user_id.clone(),
            display_name: identity.display_name.clone(),
            color: identity
                .color
                .unwrap_or_else(|| collaborator_color(client_id)),
            cursor: update.cursor,
            selection: update.selection,
            last_seen: at,
        };
        self.presence.insert(client_id.to_string(), record.clone());
        record
    }

    pub fn remove_presence(&mut self, client_id: &str) -> Option<PresenceRecord> {
        self.presence.remove(client_id)
    }

    pub fn presence(&self) -> impl Iterator<Item = &PresenceRecord> + '_ {
        self.presence.values()
    }

    /// Items and presence for a new subscriber.
    pub fn snapshot(&self) -> (Vec<SceneItem>, Vec<PresenceRecord>) {
        (
            self.items.iter().cloned().collect(),
            self.presence.values().cloned().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemKind, Routing, SerializableColor, ShapeKind, StyleField, StyleValue};
    use kurbo::{Point, Size};

    fn created(record: &mut ProjectRecord, at: u64) -> SceneItem {
        let item = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::ZERO);
        record.apply(&ItemWrite::Create { item: item.clone() }, Timestamp(at));
        item
    }

    #[test]
    fn test_stamp_is_strictly_increasing() {
        let mut record = ProjectRecord::new();
        assert_eq!(record.stamp(Timestamp(100)), Timestamp(100));
        assert_eq!(record.stamp(Timestamp(100)), Timestamp(101));
        assert_eq!(record.stamp(Timestamp(50)), Timestamp(102));
        assert_eq!(record.stamp(Timestamp(200)), Timestamp(200));
    }

    #[test]
    fn test_concurrent_field_writes_both_survive() {
        let mut record = ProjectRecord::new();
        let item = created(&mut record, 1);
        let id = item.id();

        let resize = ItemWrite::Merge {
            id,
            patch: ItemPatch::new().size(Some(Size::new(300.0, 200.0))),
        };
        let recolor = ItemWrite::Merge {
            id,
            patch: ItemPatch::new().style(StyleValue::FillColor(Some(SerializableColor::black()))),
        };
        assert!(record.apply(&resize, Timestamp(10)).is_some());
        assert!(record.apply(&recolor, Timestamp(11)).is_some());

        let merged = record.get(id).unwrap();
        assert_eq!(merged.size, Some(Size::new(300.0, 200.0)));
        assert_eq!(merged.style.fill_color, Some(SerializableColor::black()));
        assert_eq!(
            record.field_clock(id, ItemField::Style(StyleField::FillColor)),
            Some(Timestamp(11))
        );
    }

    #[test]
    fn test_older_write_loses_per_field() {
        let mut record = ProjectRecord::new();
        let id = created(&mut record, 1).id();

        record.apply(
            &ItemWrite::Merge {
                id,
                patch: ItemPatch::new().position(Point::new(5.0, 5.0)),
            },
            Timestamp(20),
        );
        let stale = ItemWrite::Merge {
            id,
            patch: ItemPatch::new().position(Point::new(9.0, 9.0)).z_index(7),
        };
        let change = record.apply(&stale, Timestamp(15)).unwrap();

        assert_eq!(change.fields(), vec![ItemField::ZIndex]);
        let item = record.get(id).unwrap();
        assert_eq!(item.position, Point::new(5.0, 5.0));
        assert_eq!(item.z_index, 7);
    }

    #[test]
    fn test_delete_detaches_and_drops_late_merges() {
        let mut record = ProjectRecord::new();
        let a = created(&mut record, 1);
        let b = created(&mut record, 2);
        let link = SceneItem::new(ItemKind::connector(a.id(), b.id(), Routing::Curved), Point::ZERO);
        record.apply(&ItemWrite::Create { item: link.clone() }, Timestamp(3));

        assert!(record.delete(a.id()));
        assert!(!record.get(link.id()).unwrap().kind.references(a.id()));

        let late = ItemWrite::Merge {
            id: a.id(),
            patch: ItemPatch::new().z_index(1),
        };
        assert!(record.apply(&late, Timestamp(5)).is_none());
        assert_eq!(record.items().len(), 2);
        assert!(!record.delete(a.id()));
    }

    #[test]
    fn test_create_after_delete_restores() {
        let mut record = ProjectRecord::new();
        let item = created(&mut record, 1);
        record.delete(item.id());
        let change = record.apply(&ItemWrite::Create { item: item.clone() }, Timestamp(2));
        assert_eq!(change, Some(ItemChange::Created { item: item.clone() }));
        assert_eq!(
            record.field_clock(item.id(), ItemField::Position),
            Some(Timestamp(2))
        );
    }

    #[test]
    fn test_recreate_merges_fields() {
        let mut record = ProjectRecord::new();
        let item = created(&mut record, 1);
        let moved = SceneItem {
            position: Point::new(40.0, 40.0),
            ..item.clone()
        };
        let change = record.apply(&ItemWrite::Create { item: moved }, Timestamp(2));
        assert!(matches!(change, Some(ItemChange::Merged { .. })));
        assert_eq!(record.get(item.id()).unwrap().position, Point::new(40.0, 40.0));
    }

    #[test]
    fn test_presence_replaces_per_client() {
        let mut record = ProjectRecord::new();
        let identity = Identity::new("u1", "Ada");
        record.update_presence("c1", &identity, PresenceUpdate::default(), Timestamp(1));
        let update = PresenceUpdate {
            cursor: Some(Point::new(3.0, 4.0)),
            selection: Vec::new(),
        };
        record.update_presence("c1", &identity, update, Timestamp(2));

        let (_, presence) = record.snapshot();
        assert_eq!(presence.len(), 1);
        assert_eq!(presence[0].cursor, Some(Point::new(3.0, 4.0)));
        assert!(record.remove_presence("c1").is_some());
    }

    #[test]
    fn test_presence_color_is_stable_per_client() {
        let mut record = ProjectRecord::new();
        let ada = Identity::new("u1", "Ada");
        let first = record.update_presence("c1", &ada, PresenceUpdate::default(), Timestamp(1));
        let again = record.update_presence("c1", &ada, PresenceUpdate::default(), Timestamp(2));
        assert_eq!(first.color, again.color);
        assert_eq!(first.color, collaborator_color("c1"));

        let teal = SerializableColor::new(20, 184, 166, 255);
        let bob = Identity {
            color: Some(teal),
            ..Identity::new("u2", "Bob")
        };
        let chosen = record.update_presence("c2", &bob, PresenceUpdate::default(), Timestamp(3));
        assert_eq!(chosen.color, teal);
    }
}
