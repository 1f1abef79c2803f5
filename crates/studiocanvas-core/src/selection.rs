//! Selection set and resize handles.

use crate::geometry;
use crate::items::{ItemId, ItemList, SceneItem};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 10.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;

/// Set of selected item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<ItemId>,
}

/// Shape of the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    Single(ItemId),
    Multi(HashSet<ItemId>),
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click on an item. Without the modifier the selection becomes exactly
    /// `{id}`; with it, `id` is toggled.
    pub fn click(&mut self, id: ItemId, modifier: bool) {
        if modifier {
            if !self.ids.remove(&id) {
                self.ids.insert(id);
            }
        } else {
            self.ids.clear();
            self.ids.insert(id);
        }
    }

    pub fn click_background(&mut self) {
        self.ids.clear();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn select(&mut self, id: ItemId) {
        self.ids.insert(id);
    }

    pub fn deselect(&mut self, id: ItemId) {
        self.ids.remove(&id);
    }

    pub fn select_all(&mut self, items: &ItemList) {
        self.ids = items.ids().collect();
    }

    /// Drop ids no longer present in `items`.
    pub fn retain_existing(&mut self, items: &ItemList) {
        self.ids.retain(|id| items.contains(*id));
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The single selected id, if exactly one item is selected.
    pub fn single(&self) -> Option<ItemId> {
        match self.state() {
            SelectionState::Single(id) => Some(id),
            _ => None,
        }
    }

    pub fn state(&self) -> SelectionState {
        match self.ids.len() {
            0 => SelectionState::Empty,
            1 => self
                .ids
                .iter()
                .next()
                .map_or(SelectionState::Empty, |id| SelectionState::Single(*id)),
            _ => SelectionState::Multi(self.ids.clone()),
        }
    }
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn of(&self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// A resize handle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    /// `tolerance` is in world units (already divided by zoom).
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Resize handles of an item. Connectors have none.
pub fn resize_handles(item: &SceneItem) -> Vec<Handle> {
    if item.kind.is_connector() {
        return Vec::new();
    }
    let rect = geometry::item_box(item);
    Corner::ALL
        .into_iter()
        .map(|corner| Handle {
            position: corner.of(rect),
            corner,
        })
        .collect()
}

pub fn hit_test_handles(item: &SceneItem, point: Point, tolerance: f64) -> Option<Corner> {
    resize_handles(item)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.corner)
}

/// New position and size after dragging `corner` of `rect` by `delta`.
///
/// The opposite corner stays fixed; the result is floored at `min`.
pub fn resize_rect(rect: Rect, corner: Corner, delta: Vec2, min: Size) -> (Point, Size) {
    let (mut x0, mut y0, mut x1, mut y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    match corner {
        Corner::TopLeft => {
            x0 = (x0 + delta.x).min(x1 - min.width);
            y0 = (y0 + delta.y).min(y1 - min.height);
        }
        Corner::TopRight => {
            x1 = (x1 + delta.x).max(x0 + min.width);
            y0 = (y0 + delta.y).min(y1 - min.height);
        }
        Corner::BottomLeft => {
            x0 = (x0 + delta.x).min(x1 - min.width);
            y1 = (y1 + delta.y).max(y0 + min.height);
        }
        Corner::BottomRight => {
            x1 = (x1 + delta.x).max(x0 + min.width);
            y1 = (y1 + delta.y).max(y0 + min.height);
        }
    }
    (Point::new(x0, y0), Size::new(x1 - x0, y1 - y0))
}
