//! Interaction controller: turns pointer and keyboard input into item-list
//! mutations, history records and outbound collaboration changes.

use crate::config::CanvasConfig;
use crate::geometry;
use crate::history::HistoryLog;
use crate::input::{Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::items::{ItemId, ItemKind, ItemList, ItemPatch, Mutation, SceneItem};
use crate::selection::{self, Corner, Selection, HANDLE_HIT_TOLERANCE};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};
use std::sync::atomic::{AtomicU64, Ordering};

/// Item hit tolerance in screen pixels.
pub const ITEM_HIT_TOLERANCE: f64 = 4.0;

/// Deterministic splitmix64 generator used to scatter new items.
#[derive(Debug, Clone)]
pub struct Placement {
    state: u64,
}

impl Placement {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the clock mixed with a process-wide counter.
    pub fn from_entropy() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ counter.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[-1, 1)`.
    pub fn next_signed_unit(&mut self) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        unit * 2.0 - 1.0
    }

    /// Random offset with each component in `[-jitter, jitter)`.
    pub fn jitter(&mut self, jitter: f64) -> Vec2 {
        Vec2::new(
            self.next_signed_unit() * jitter,
            self.next_signed_unit() * jitter,
        )
    }
}

/// Pointer gesture in progress.
#[derive(Debug, Clone)]
enum Gesture {
    Drag {
        start: Point,
        /// Items being moved with their positions at gesture start.
        origins: Vec<(ItemId, Point)>,
        before: ItemList,
        moved: bool,
    },
    Resize {
        id: ItemId,
        corner: Corner,
        start: Point,
        origin: Rect,
        before: ItemList,
        moved: bool,
    },
}

impl Gesture {
    fn before(&self) -> &ItemList {
        match self {
            Gesture::Drag { before, .. } | Gesture::Resize { before, .. } => before,
        }
    }

    fn moved(&self) -> bool {
        match self {
            Gesture::Drag { moved, .. } | Gesture::Resize { moved, .. } => *moved,
        }
    }

    fn rebase(&mut self, mutation: &Mutation) {
        match self {
            Gesture::Drag { before, .. } | Gesture::Resize { before, .. } => {
                *before = before.apply(mutation);
            }
        }
    }
}

/// One user's editing session over a canvas.
#[derive(Debug, Clone)]
pub struct CanvasSession {
    items: ItemList,
    selection: Selection,
    history: HistoryLog,
    viewport: Viewport,
    gesture: Option<Gesture>,
    placement: Placement,
    /// Local mutations not yet mirrored to collaborators.
    outbox: Vec<Mutation>,
    config: CanvasConfig,
}

impl Default for CanvasSession {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl CanvasSession {
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_items(ItemList::new(), config)
    }

    /// Start a session over existing items (e.g. loaded from a store).
    pub fn with_items(items: ItemList, config: CanvasConfig) -> Self {
        let placement = match config.placement.seed {
            Some(seed) => Placement::new(seed),
            None => Placement::from_entropy(),
        };
        Self {
            history: HistoryLog::with_capacity(items.clone(), config.history.max_entries),
            items,
            selection: Selection::new(),
            viewport: Viewport::default(),
            gesture: None,
            placement,
            outbox: Vec::new(),
            config,
        }
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Drain local mutations for the collaboration synchronizer.
    pub fn take_outbox(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.outbox)
    }

    pub fn has_outbox(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Queue a mutation, coalescing consecutive updates of the same item.
    fn emit(&mut self, mutation: Mutation) {
        if let (
            Some(Mutation::Updated {
                id: last_id,
                patch: last,
            }),
            Mutation::Updated { id, patch },
        ) = (self.outbox.last_mut(), &mutation)
        {
            if *last_id == *id {
                *last = std::mem::take(last).merge(patch.clone());
                return;
            }
        }
        self.outbox.push(mutation);
    }

    /// Replace the item list, mirroring the difference outward.
    fn install(&mut self, next: ItemList) {
        for mutation in self.items.diff(&next) {
            self.emit(mutation);
        }
        self.items = next;
    }

    fn record(&mut self) {
        self.history.record(self.items.clone());
    }

    // --- pointer --------------------------------------------------------

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                modifiers,
            } => self.pointer_down(position, modifiers),
            PointerEvent::Down { .. } => {}
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position } => self.pointer_up(position),
        }
    }

    /// Press at `position` (screen coordinates).
    pub fn pointer_down(&mut self, position: Point, modifiers: Modifiers) {
        if self.gesture.is_some() {
            self.finish_gesture();
        }
        let world = self.viewport.screen_to_world(position);

        if let Some((id, corner)) = self.handle_at(world) {
            if let Some(item) = self.items.get(id) {
                log::debug!("resize {} from {:?}", id, corner);
                self.gesture = Some(Gesture::Resize {
                    id,
                    corner,
                    start: world,
                    origin: geometry::item_box(item),
                    before: self.items.clone(),
                    moved: false,
                });
                return;
            }
        }

        let tolerance = self.viewport.screen_to_world_distance(ITEM_HIT_TOLERANCE);
        let Some(id) = self.items.items_at_point(world, tolerance).first().copied() else {
            self.selection.click_background();
            return;
        };

        self.selection.click(id, modifiers.toggles_selection());
        if !self.selection.contains(id) {
            return;
        }
        let origins: Vec<(ItemId, Point)> = self
            .selection
            .ids()
            .filter_map(|sel| self.items.get(sel))
            .filter(|item| !item.kind.is_connector())
            .map(|item| (item.id(), item.position))
            .collect();
        log::debug!("drag {} item(s)", origins.len());
        self.gesture = Some(Gesture::Drag {
            start: world,
            origins,
            before: self.items.clone(),
            moved: false,
        });
    }

    /// Resize handle under `world`, only for a single selected item.
    fn handle_at(&self, world: Point) -> Option<(ItemId, Corner)> {
        let id = self.selection.single()?;
        let item = self.items.get(id)?;
        let tolerance = self.viewport.screen_to_world_distance(HANDLE_HIT_TOLERANCE);
        selection::hit_test_handles(item, world, tolerance).map(|corner| (id, corner))
    }

    pub fn pointer_move(&mut self, position: Point) {
        let world = self.viewport.screen_to_world(position);
        let Some(gesture) = self.gesture.take() else {
            return;
        };

        let gesture = match gesture {
            Gesture::Drag {
                start,
                origins,
                before,
                moved,
            } => {
                let delta = world - start;
                let mut changed = false;
                for (id, origin) in &origins {
                    changed |= self.move_item(*id, *origin + delta);
                }
                Gesture::Drag {
                    start,
                    origins,
                    before,
                    moved: moved || changed,
                }
            }
            Gesture::Resize {
                id,
                corner,
                start,
                origin,
                before,
                moved,
            } => {
                let mut changed = false;
                if let Some(item) = self.items.get(id) {
                    let min = geometry::min_size(&item.kind);
                    let (pos, size) = selection::resize_rect(origin, corner, world - start, min);
                    let patch = ItemPatch::new().position(pos).size(Some(size));
                    changed = self.patch_item(id, patch);
                }
                Gesture::Resize {
                    id,
                    corner,
                    start,
                    origin,
                    before,
                    moved: moved || changed,
                }
            }
        };
        self.gesture = Some(gesture);
    }

    pub fn pointer_up(&mut self, position: Point) {
        if self.gesture.is_some() {
            self.pointer_move(position);
        }
        self.finish_gesture();
    }

    /// Commit the active gesture: one history record if anything moved.
    fn finish_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if gesture.moved() && &self.items != gesture.before() {
            log::debug!("gesture committed");
            self.record();
        }
    }

    /// Abort the active gesture and restore the pre-gesture items. Records nothing.
    pub fn cancel_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        if gesture.moved() {
            log::debug!("gesture cancelled");
            let before = gesture.before().clone();
            self.install(before);
            self.selection.retain_existing(&self.items);
        }
        true
    }

    fn move_item(&mut self, id: ItemId, position: Point) -> bool {
        self.patch_item(id, ItemPatch::new().position(position))
    }

    /// Apply a patch without recording history. Stale ids are ignored.
    fn patch_item(&mut self, id: ItemId, patch: ItemPatch) -> bool {
        let Some(item) = self.items.get(id) else {
            return false;
        };
        let patch = patch.effective(item);
        if patch.is_empty() {
            return false;
        }
        self.items = self.items.update_item(id, &patch);
        self.emit(Mutation::Updated { id, patch });
        true
    }

    // --- intents --------------------------------------------------------

    /// Place a new item of `kind` near the center of the view and select it.
    pub fn add_item(&mut self, kind: ItemKind) -> ItemId {
        let center = self.viewport.world_center();
        let item = SceneItem::new(kind, center);
        let half = geometry::resolve_size(&item).to_vec2() / 2.0;
        let jitter = self.placement.jitter(self.config.placement.jitter);
        let item = SceneItem {
            position: center - half + jitter,
            ..item
        };
        self.add_item_at(item)
    }

    /// Add a fully specified item on top of the others and select it.
    pub fn add_item_at(&mut self, item: SceneItem) -> ItemId {
        let id = item.id();
        if self.items.contains(id) {
            return id;
        }
        self.finish_gesture();
        self.items = self.items.add_item(item);
        if let Some(added) = self.items.get(id).cloned() {
            self.emit(Mutation::Added { item: added });
        }
        self.selection.click(id, false);
        self.record();
        log::debug!("added item {}", id);
        id
    }

    /// Delete every selected item in one step.
    pub fn delete_selection(&mut self) -> usize {
        let ids: Vec<ItemId> = self.selection.ids().collect();
        if ids.is_empty() {
            return 0;
        }
        self.cancel_gesture();
        let next = self.items.remove_items(&ids);
        let removed = self.items.len() - next.len();
        self.selection.clear();
        if removed > 0 {
            self.install(next);
            self.record();
        }
        removed
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        self.cancel_gesture();
        let previous = self.history.undo().clone();
        self.install(previous);
        self.selection.retain_existing(&self.items);
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        self.cancel_gesture();
        let next = self.history.redo().clone();
        self.install(next);
        self.selection.retain_existing(&self.items);
        true
    }

    /// Remove everything and start a fresh history.
    pub fn clear_canvas(&mut self) {
        self.gesture = None;
        self.install(ItemList::new());
        self.history.reset(self.items.clone());
        self.selection.clear();
    }

    /// Property-panel edit of one item. Records history when something changed.
    pub fn update_item(&mut self, id: ItemId, patch: ItemPatch) -> bool {
        if self.gesture.is_some() {
            self.finish_gesture();
        }
        let changed = self.patch_item(id, patch);
        if changed {
            self.record();
        }
        changed
    }

    /// Replace the selection with one existing item.
    pub fn select(&mut self, id: ItemId) -> bool {
        if !self.items.contains(id) {
            return false;
        }
        self.selection.clear();
        self.selection.select(id);
        true
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.items);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn bring_to_front(&mut self) -> bool {
        self.restack(ItemList::bring_to_front, false)
    }

    pub fn send_to_back(&mut self) -> bool {
        self.restack(ItemList::send_to_back, true)
    }

    /// Restack selected items keeping their relative order.
    fn restack(&mut self, op: fn(&ItemList, ItemId) -> ItemList, reverse: bool) -> bool {
        let mut ordered: Vec<ItemId> = self
            .items
            .paint_order()
            .into_iter()
            .map(SceneItem::id)
            .filter(|id| self.selection.contains(*id))
            .collect();
        if reverse {
            ordered.reverse();
        }
        let next = ordered.into_iter().fold(self.items.clone(), |list, id| op(&list, id));
        if next == self.items {
            return false;
        }
        self.install(next);
        self.record();
        true
    }

    /// Keyboard shortcuts. Returns whether the key was handled.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let command = event.modifiers.command();
        match &event.key {
            Key::Delete | Key::Backspace => self.delete_selection() > 0,
            Key::Escape => {
                if !self.cancel_gesture() {
                    self.selection.clear();
                }
                true
            }
            Key::Char('z') if command && event.modifiers.shift => self.redo(),
            Key::Char('z') if command => self.undo(),
            Key::Char('y') if command => self.redo(),
            Key::Char('a') if command => {
                self.select_all();
                true
            }
            _ => false,
        }
    }

    // --- collaboration --------------------------------------------------

    /// Apply a collaborator's mutation. Records no history step and queues
    /// nothing outbound; the mutation is folded into every history snapshot
    /// so undo, redo and cancel never revert it.
    pub fn apply_remote(&mut self, mutation: &Mutation) {
        self.items = self.items.apply(mutation);
        self.history.rebase(mutation);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.rebase(mutation);
        }
        if matches!(mutation, Mutation::Removed { .. }) {
            self.selection.retain_existing(&self.items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementConfig;
    use crate::input::Modifiers;
    use crate::items::ShapeKind;
    use kurbo::Size;

    fn session() -> CanvasSession {
        CanvasSession::new(CanvasConfig {
            placement: PlacementConfig {
                jitter: 40.0,
                seed: Some(7),
            },
            ..CanvasConfig::default()
        })
    }

    fn shape_at(x: f64, y: f64) -> SceneItem {
        SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::new(x, y))
    }

    fn click(session: &mut CanvasSession, x: f64, y: f64, modifiers: Modifiers) {
        session.pointer_down(Point::new(x, y), modifiers);
        session.pointer_up(Point::new(x, y));
    }

    #[test]
    fn test_select_delete_undo_scenario() {
        let mut session = session();
        let s1 = session.add_item_at(shape_at(0.0, 0.0));
        let s2 = session.add_item_at(SceneItem::new(
            ItemKind::sticky_note("todo"),
            Point::new(400.0, 400.0),
        ));

        let first = session.items().get(s1).unwrap();
        assert_eq!(geometry::resolve_size(first), Size::new(150.0, 100.0));
        assert_eq!(first.z_index, 1);
        assert_eq!(session.items().get(s2).unwrap().z_index, 2);

        click(&mut session, 10.0, 10.0, Modifiers::NONE);
        click(&mut session, 450.0, 450.0, Modifiers::shift());
        assert!(session.selection().contains(s1));
        assert!(session.selection().contains(s2));
        assert_eq!(session.history().len(), 3);

        let before = session.items().clone();
        assert_eq!(session.delete_selection(), 2);
        assert!(session.items().is_empty());
        assert_eq!(session.history().len(), 4);

        assert!(session.undo());
        assert_eq!(session.items(), &before);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_drag_records_once() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        session.take_outbox();
        let entries = session.history().len();

        session.pointer_down(Point::new(10.0, 10.0), Modifiers::NONE);
        session.pointer_move(Point::new(60.0, 40.0));
        session.pointer_move(Point::new(110.0, 70.0));
        session.pointer_up(Point::new(110.0, 70.0));

        assert_eq!(session.items().get(id).unwrap().position, Point::new(100.0, 60.0));
        assert_eq!(session.history().len(), entries + 1);

        let outbox = session.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert!(matches!(&outbox[0], Mutation::Updated { id: moved, .. } if *moved == id));
    }

    #[test]
    fn test_click_without_moving_records_nothing() {
        let mut session = session();
        session.add_item_at(shape_at(0.0, 0.0));
        let entries = session.history().len();
        click(&mut session, 20.0, 20.0, Modifiers::NONE);
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        let entries = session.history().len();

        session.pointer_down(Point::new(10.0, 10.0), Modifiers::NONE);
        session.pointer_move(Point::new(300.0, 300.0));
        assert!(session.handle_key(&KeyEvent::plain(Key::Escape)));
        session.pointer_up(Point::new(300.0, 300.0));

        assert_eq!(session.items().get(id).unwrap().position, Point::ZERO);
        assert_eq!(session.history().len(), entries);
        assert!(!session.is_gesture_active());
    }

    #[test]
    fn test_escape_keeps_remote_changes() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        let remote = shape_at(500.0, 500.0);
        let remote_id = remote.id();

        session.pointer_down(Point::new(10.0, 10.0), Modifiers::NONE);
        session.pointer_move(Point::new(300.0, 300.0));
        session.apply_remote(&Mutation::Added { item: remote });
        assert!(session.cancel_gesture());

        assert_eq!(session.items().get(id).unwrap().position, Point::ZERO);
        assert!(session.items().contains(remote_id));
    }

    #[test]
    fn test_right_button_starts_no_gesture() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        session.clear_selection();
        session.take_outbox();
        let entries = session.history().len();

        session.handle_pointer(PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: MouseButton::Right,
            modifiers: Modifiers::NONE,
        });
        assert!(!session.is_gesture_active());
        session.handle_pointer(PointerEvent::Move {
            position: Point::new(80.0, 80.0),
        });
        session.handle_pointer(PointerEvent::Up {
            position: Point::new(80.0, 80.0),
        });

        assert!(session.selection().is_empty());
        assert_eq!(session.items().get(id).unwrap().position, Point::ZERO);
        assert_eq!(session.history().len(), entries);
        assert!(!session.has_outbox());

        session.handle_pointer(PointerEvent::down(Point::new(10.0, 10.0)));
        assert!(session.selection().contains(id));
    }

    #[test]
    fn test_resize_from_corner_is_floored() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        let entries = session.history().len();

        session.pointer_down(Point::new(150.0, 100.0), Modifiers::NONE);
        session.pointer_move(Point::new(250.0, 150.0));
        assert_eq!(session.items().get(id).unwrap().size, Some(Size::new(250.0, 150.0)));

        session.pointer_move(Point::new(-400.0, -400.0));
        session.pointer_up(Point::new(-400.0, -400.0));
        let item = session.items().get(id).unwrap();
        assert_eq!(item.size, Some(Size::new(50.0, 30.0)));
        assert_eq!(item.position, Point::ZERO);
        assert_eq!(session.history().len(), entries + 1);
    }

    #[test]
    fn test_background_click_clears_selection() {
        let mut session = session();
        session.add_item_at(shape_at(0.0, 0.0));
        assert_eq!(session.selection().len(), 1);
        click(&mut session, 900.0, 700.0, Modifiers::NONE);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_add_item_places_near_center_deterministically() {
        let mut a = session();
        let mut b = session();
        let id_a = a.add_item(ItemKind::shape(ShapeKind::Circle));
        let id_b = b.add_item(ItemKind::shape(ShapeKind::Circle));

        let pa = a.items().get(id_a).unwrap().position;
        let pb = b.items().get(id_b).unwrap().position;
        assert_eq!(pa, pb);

        let center = a.viewport().world_center();
        let expected = center - Vec2::new(75.0, 50.0);
        assert!((pa.x - expected.x).abs() <= 40.0);
        assert!((pa.y - expected.y).abs() <= 40.0);
        assert_eq!(a.selection().single(), Some(id_a));
    }

    #[test]
    fn test_update_item_records_only_real_changes() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        let entries = session.history().len();

        assert!(!session.update_item(uuid::Uuid::new_v4(), ItemPatch::new().z_index(5)));
        assert!(!session.update_item(id, ItemPatch::new().position(Point::ZERO)));
        assert_eq!(session.history().len(), entries);

        assert!(session.update_item(id, ItemPatch::new().content(ItemKind::text("hello"))));
        assert_eq!(session.history().len(), entries + 1);
    }

    #[test]
    fn test_keyboard_undo_redo() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));

        let undo = KeyEvent::new(Key::Char('z'), Modifiers::ctrl());
        let redo = KeyEvent::new(
            Key::Char('z'),
            Modifiers {
                shift: true,
                ctrl: true,
                ..Modifiers::NONE
            },
        );
        assert!(session.handle_key(&undo));
        assert!(session.items().is_empty());
        assert!(!session.can_undo());
        assert!(session.handle_key(&redo));
        assert!(session.items().contains(id));
        assert!(!session.can_redo());
    }

    #[test]
    fn test_undo_mirrors_diff_outward() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        session.take_outbox();
        session.undo();
        assert_eq!(session.take_outbox(), vec![Mutation::Removed { id }]);
    }

    #[test]
    fn test_restack_selection() {
        let mut session = session();
        let a = session.add_item_at(shape_at(0.0, 0.0));
        let b = session.add_item_at(shape_at(100.0, 60.0));
        click(&mut session, 40.0, 40.0, Modifiers::NONE);
        assert_eq!(session.selection().single(), Some(a));

        assert!(session.bring_to_front());
        let z = |s: &CanvasSession, id| s.items().get(id).unwrap().z_index;
        assert!(z(&session, a) > z(&session, b));

        assert!(session.send_to_back());
        assert!(z(&session, a) < z(&session, b));
    }

    #[test]
    fn test_clear_canvas_resets_history() {
        let mut session = session();
        session.add_item_at(shape_at(0.0, 0.0));
        session.add_item_at(shape_at(50.0, 0.0));
        session.take_outbox();

        session.clear_canvas();
        assert!(session.items().is_empty());
        assert!(!session.can_undo());
        assert_eq!(session.take_outbox().len(), 2);
    }

    #[test]
    fn test_remote_delete_mid_drag_is_silent() {
        let mut session = session();
        let id = session.add_item_at(shape_at(0.0, 0.0));
        let entries = session.history().len();
        session.take_outbox();

        session.pointer_down(Point::new(10.0, 10.0), Modifiers::NONE);
        session.apply_remote(&Mutation::Removed { id });
        session.pointer_move(Point::new(80.0, 80.0));
        session.pointer_up(Point::new(80.0, 80.0));

        assert!(session.items().is_empty());
        assert!(session.selection().is_empty());
        assert_eq!(session.history().len(), entries);
        assert!(!session.has_outbox());
    }
}
