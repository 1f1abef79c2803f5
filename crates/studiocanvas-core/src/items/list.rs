//! Immutable, structurally shared item list.

use super::{ItemId, ItemPatch, Mutation, SceneItem};
use crate::geometry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered list of scene items (list order is insertion order).
///
/// Every operation returns a new list and leaves `self` untouched, so
/// snapshots can be kept by cloning, which only bumps a reference count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList {
    items: Arc<Vec<Arc<SceneItem>>>,
}

impl PartialEq for ItemList {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
            || (self.items.len() == other.items.len()
                && self
                    .items
                    .iter()
                    .zip(other.items.iter())
                    .all(|(a, b)| Arc::ptr_eq(a, b) || a == b))
    }
}

impl FromIterator<SceneItem> for ItemList {
    fn from_iter<T: IntoIterator<Item = SceneItem>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ItemList::new(), |list, item| list.insert_item(item))
    }
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_vec(items: Vec<Arc<SceneItem>>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in list (insertion) order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SceneItem> + '_ {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn get(&self, id: ItemId) -> Option<&SceneItem> {
        self.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.iter().map(|item| item.id)
    }

    pub fn max_z_index(&self) -> Option<i64> {
        self.iter().map(|item| item.z_index).max()
    }

    pub fn min_z_index(&self) -> Option<i64> {
        self.iter().map(|item| item.z_index).min()
    }

    /// Add a new item on top: `z_index = max(existing, 0) + 1`.
    ///
    /// An item whose id is already present is ignored.
    pub fn add_item(&self, mut item: SceneItem) -> ItemList {
        if self.contains(item.id) {
            return self.clone();
        }
        item.z_index = self.max_z_index().unwrap_or(0).max(0) + 1;
        self.push(item)
    }

    /// Insert an item keeping its own `z_index` (restoring stored or remote items).
    pub fn insert_item(&self, item: SceneItem) -> ItemList {
        if self.contains(item.id) {
            return self.clone();
        }
        self.push(item)
    }

    fn push(&self, item: SceneItem) -> ItemList {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.push(Arc::new(item));
        Self::from_vec(items)
    }

    /// Apply a partial update. A missing id leaves the list unchanged.
    pub fn update_item(&self, id: ItemId, patch: &ItemPatch) -> ItemList {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return self.clone();
        };
        if patch.is_empty() {
            return self.clone();
        }
        let mut items = self.items.as_ref().clone();
        items[index] = Arc::new(patch.apply(&items[index]));
        Self::from_vec(items)
    }

    /// Remove an item and detach it from every connector in the same step.
    pub fn remove_item(&self, id: ItemId) -> ItemList {
        self.remove_items(&[id])
    }

    /// Batch removal; connectors referencing any removed id are detached.
    pub fn remove_items(&self, ids: &[ItemId]) -> ItemList {
        let doomed: HashSet<ItemId> = ids.iter().copied().collect();
        if !self.ids().any(|id| doomed.contains(&id)) {
            return self.clone();
        }
        let items = self
            .items
            .iter()
            .filter(|item| !doomed.contains(&item.id))
            .map(|item| {
                if !doomed.iter().any(|id| item.kind.references(*id)) {
                    return Arc::clone(item);
                }
                let mut detached = item.as_ref().clone();
                for id in &doomed {
                    detached.kind.detach(*id);
                }
                Arc::new(detached)
            })
            .collect();
        Self::from_vec(items)
    }

    /// Move an item above every other item.
    pub fn bring_to_front(&self, id: ItemId) -> ItemList {
        let top = self
            .iter()
            .filter(|item| item.id != id)
            .map(|item| item.z_index)
            .max()
            .unwrap_or(0);
        match self.get(id) {
            Some(item) if item.z_index <= top => {
                self.update_item(id, &ItemPatch::new().z_index(top + 1))
            }
            _ => self.clone(),
        }
    }

    /// Move an item below every other item.
    pub fn send_to_back(&self, id: ItemId) -> ItemList {
        let bottom = self
            .iter()
            .filter(|item| item.id != id)
            .map(|item| item.z_index)
            .min()
            .unwrap_or(0);
        match self.get(id) {
            Some(item) if item.z_index >= bottom => {
                self.update_item(id, &ItemPatch::new().z_index(bottom - 1))
            }
            _ => self.clone(),
        }
    }

    /// Apply a mutation through the add/update/remove contract.
    ///
    /// `Added` keeps the carried `z_index` since it describes an item that
    /// already exists elsewhere (history, a collaborator).
    pub fn apply(&self, mutation: &Mutation) -> ItemList {
        match mutation {
            Mutation::Added { item } => self.insert_item(item.clone()),
            Mutation::Updated { id, patch } => self.update_item(*id, patch),
            Mutation::Removed { id } => self.remove_item(*id),
        }
    }

    /// Mutations that turn `self` into `target`: removals first, then
    /// updates, then additions.
    pub fn diff(&self, target: &ItemList) -> Vec<Mutation> {
        let mut mutations: Vec<Mutation> = self
            .ids()
            .filter(|id| !target.contains(*id))
            .map(|id| Mutation::Removed { id })
            .collect();

        for item in target.iter() {
            match self.get(item.id) {
                Some(old) if old != item => {
                    let patch = ItemPatch::between(old, item);
                    mutations.push(Mutation::Updated { id: item.id, patch });
                }
                Some(_) => {}
                None => mutations.push(Mutation::Added { item: item.clone() }),
            }
        }
        mutations
    }

    /// Items in paint order: ascending `z_index`, ties in list order.
    pub fn paint_order(&self) -> Vec<&SceneItem> {
        let mut ordered: Vec<&SceneItem> = self.iter().collect();
        ordered.sort_by_key(|item| item.z_index);
        ordered
    }

    /// Items under `point` (world coordinates), front-most first.
    pub fn items_at_point(&self, point: Point, tolerance: f64) -> Vec<ItemId> {
        self.paint_order()
            .into_iter()
            .rev()
            .filter(|item| {
                geometry::item_bounds(item, self)
                    .is_some_and(|b| b.inflate(tolerance, tolerance).contains(point))
            })
            .map(|item| item.id)
            .collect()
    }

    /// Items whose bounds intersect `rect`.
    pub fn items_in_rect(&self, rect: Rect) -> Vec<ItemId> {
        self.iter()
            .filter(|item| {
                geometry::item_bounds(item, self)
                    .is_some_and(|b| rect.intersect(b).area() > 0.0)
            })
            .map(|item| item.id)
            .collect()
    }

    /// Bounding box of every item that has geometry.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter()
            .filter_map(|item| geometry::item_bounds(item, self))
            .reduce(|acc, b| acc.union(b))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
