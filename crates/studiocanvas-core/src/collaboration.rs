//! Collaboration synchronizer: mirrors a session's local mutations into a
//! [`DocumentStore`] and merges remote changes back in.
//!
//! Every item field is merged last-writer-wins on the store's timestamps.
//! A field with local writes the store has not yet echoed back is never
//! overwritten by a remote write, since the store orders the local write
//! after it.

use crate::canvas::CanvasSession;
use crate::config::CollaborationConfig;
use crate::items::{ItemField, ItemId, ItemPatch, Mutation, SceneItem, SerializableColor};
use crate::store::{
    DocumentStore, EntitlementCheck, Identity, ItemChange, ItemWrite, Origin, PresenceRecord,
    PresenceUpdate, StoreEvent, StoreResult, Timestamp,
};
use kurbo::Point;
use std::collections::{HashMap, HashSet, VecDeque};

/// Synchronizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaborationState {
    /// Local-only editing.
    Disabled,
    /// Subscribed, waiting for the initial snapshot.
    Connecting,
    Active,
}

/// Notifications for the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotice {
    Connected { project: String },
    /// Collaboration stopped; local editing continues.
    Warning(String),
    Left { project: String },
}

/// Coalesces cursor moves so at most one is sent per interval.
#[derive(Debug, Clone)]
pub struct CursorThrottle {
    interval_ms: u64,
    last_sent: Option<u64>,
    pending: Option<Point>,
}

impl CursorThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent: None,
            pending: None,
        }
    }

    fn due(&self, now_ms: u64) -> bool {
        self.last_sent
            .is_none_or(|last| now_ms >= last.saturating_add(self.interval_ms))
    }

    /// Offer a cursor position. Returns it if it should be sent now,
    /// otherwise keeps it for [`CursorThrottle::flush`].
    pub fn push(&mut self, point: Point, now_ms: u64) -> Option<Point> {
        if self.due(now_ms) {
            self.last_sent = Some(now_ms);
            self.pending = None;
            Some(point)
        } else {
            self.pending = Some(point);
            None
        }
    }

    /// Trailing send of the last withheld position, once the interval allows.
    pub fn flush(&mut self, now_ms: u64) -> Option<Point> {
        if self.pending.is_some() && self.due(now_ms) {
            self.last_sent = Some(now_ms);
            self.pending.take()
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
        self.pending = None;
    }
}

/// A local write sent to the store and not yet echoed back.
#[derive(Debug, Clone, PartialEq)]
enum InFlight {
    Create,
    Merge(Vec<ItemField>),
}

impl InFlight {
    fn fields(&self) -> Vec<ItemField> {
        match self {
            InFlight::Create => ItemField::all().collect(),
            InFlight::Merge(fields) => fields.clone(),
        }
    }
}

/// Presence of another client, with the local time it was last heard from.
#[derive(Debug, Clone, PartialEq)]
pub struct Collaborator {
    pub record: PresenceRecord,
    pub seen_at: u64,
}

impl Collaborator {
    pub fn cursor(&self) -> Option<Point> {
        self.record.cursor
    }

    pub fn display_name(&self) -> &str {
        &self.record.display_name
    }

    pub fn color(&self) -> SerializableColor {
        self.record.color
    }
}

/// Bridges one [`CanvasSession`] and a project in a [`DocumentStore`].
pub struct Synchronizer {
    state: CollaborationState,
    store: Option<Box<dyn DocumentStore>>,
    client_id: Option<String>,
    project: Option<String>,
    config: CollaborationConfig,
    /// Store timestamp of the last accepted write per field.
    clocks: HashMap<(ItemId, ItemField), Timestamp>,
    /// Local writes not yet echoed back, per field.
    pending: HashMap<(ItemId, ItemField), u32>,
    /// Local writes per item in send order, matched against their echoes.
    in_flight: HashMap<ItemId, VecDeque<InFlight>>,
    collaborators: HashMap<String, Collaborator>,
    throttle: CursorThrottle,
    cursor: Option<Point>,
    selection: Vec<ItemId>,
    last_heartbeat: Option<u64>,
    notices: Vec<SyncNotice>,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(CollaborationConfig::default())
    }
}

impl Synchronizer {
    pub fn new(config: CollaborationConfig) -> Self {
        Self {
            state: CollaborationState::Disabled,
            store: None,
            client_id: None,
            project: None,
            throttle: CursorThrottle::new(config.cursor_throttle_ms),
            config,
            clocks: HashMap::new(),
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            collaborators: HashMap::new(),
            cursor: None,
            selection: Vec::new(),
            last_heartbeat: None,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> CollaborationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CollaborationState::Active
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Store timestamp of the last accepted write to a field.
    pub fn field_clock(&self, id: ItemId, field: ItemField) -> Option<Timestamp> {
        self.clocks.get(&(id, field)).copied()
    }

    /// Unacknowledged local writes to a field.
    pub fn pending_writes(&self, id: ItemId, field: ItemField) -> u32 {
        self.pending.get(&(id, field)).copied().unwrap_or(0)
    }

    pub fn take_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Join `project` if the plan allows it.
    ///
    /// Stays [`CollaborationState::Disabled`] without a notice when the plan
    /// has no collaboration access.
    pub fn connect(
        &mut self,
        mut store: Box<dyn DocumentStore>,
        project: &str,
        identity: &Identity,
        plan_id: &str,
        entitlement: &dyn EntitlementCheck,
    ) {
        if self.store.is_some() {
            self.leave();
        }
        if !entitlement.has_collaboration_access(plan_id) {
            log::info!("Plan {} has no collaboration access, editing locally", plan_id);
            return;
        }
        if let Err(e) = store.subscribe(project, identity) {
            self.degrade(&format!("Could not join {}: {}", project, e));
            return;
        }
        log::info!("Joining project {} as {}", project, identity.user_id);
        self.client_id = Some(store.client_id().to_string());
        self.store = Some(store);
        self.project = Some(project.to_string());
        self.state = CollaborationState::Connecting;
    }

    /// Unsubscribe and return to local-only editing.
    pub fn leave(&mut self) {
        if let (Some(mut store), Some(project)) = (self.store.take(), self.project.clone()) {
            if let Err(e) = store.unsubscribe(&project) {
                log::debug!("Unsubscribe from {} failed: {}", project, e);
            }
            log::info!("Left project {}", project);
            self.notices.push(SyncNotice::Left { project });
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = CollaborationState::Disabled;
        self.store = None;
        self.client_id = None;
        self.project = None;
        self.clocks.clear();
        self.pending.clear();
        self.in_flight.clear();
        self.collaborators.clear();
        self.throttle.reset();
        self.last_heartbeat = None;
    }

    /// Stop collaborating after a store failure.
    fn degrade(&mut self, message: &str) {
        log::warn!("Collaboration disabled: {}", message);
        self.notices.push(SyncNotice::Warning(message.to_string()));
        self.reset();
    }

    /// Run a store call, degrading on failure. Returns whether it succeeded.
    fn with_store(
        &mut self,
        op: impl FnOnce(&mut dyn DocumentStore, &str) -> StoreResult<()>,
    ) -> bool {
        let result = match (self.store.as_mut(), self.project.as_deref()) {
            (Some(store), Some(project)) => op(&mut **store, project),
            _ => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.degrade(&e.to_string());
                false
            }
        }
    }

    fn is_own(&self, origin: &Origin) -> bool {
        self.client_id.as_deref() == Some(origin.client_id.as_str())
    }

    // --- outbound -------------------------------------------------------

    /// Mirror the session's local mutations to the store.
    ///
    /// While connecting the outbox is kept for later; while disabled it is
    /// discarded.
    pub fn publish(&mut self, session: &mut CanvasSession) {
        self.track_selection(session);
        let outbox = match self.state {
            CollaborationState::Connecting => return,
            CollaborationState::Disabled => {
                session.take_outbox();
                return;
            }
            CollaborationState::Active => session.take_outbox(),
        };
        for mutation in outbox {
            if !self.publish_mutation(mutation) {
                break;
            }
        }
    }

    fn publish_mutation(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Added { item } => self.publish_create(item),
            Mutation::Updated { id, patch } => {
                if patch.is_empty() {
                    return true;
                }
                let fields: Vec<ItemField> = patch.fields().collect();
                let sent = self.with_store(|store, project| {
                    store.set(project, ItemWrite::Merge { id, patch })
                });
                if sent {
                    self.track_pending(id, fields.iter().copied());
                    self.in_flight
                        .entry(id)
                        .or_default()
                        .push_back(InFlight::Merge(fields));
                }
                sent
            }
            Mutation::Removed { id } => self.with_store(|store, project| store.delete(project, id)),
        }
    }

    fn publish_create(&mut self, item: SceneItem) -> bool {
        let id = item.id();
        let sent = self.with_store(|store, project| store.set(project, ItemWrite::Create { item }));
        if sent {
            self.track_pending(id, ItemField::all());
            self.in_flight
                .entry(id)
                .or_default()
                .push_back(InFlight::Create);
        }
        sent
    }

    fn track_pending(&mut self, id: ItemId, fields: impl IntoIterator<Item = ItemField>) {
        for field in fields {
            *self.pending.entry((id, field)).or_default() += 1;
        }
    }

    fn track_selection(&mut self, session: &CanvasSession) {
        let mut selection: Vec<ItemId> = session.selection().ids().collect();
        selection.sort();
        self.selection = selection;
    }

    /// Report the local cursor (world coordinates), throttled.
    pub fn move_cursor(&mut self, point: Point, now_ms: u64) {
        self.cursor = Some(point);
        if self.is_active() && self.throttle.push(point, now_ms).is_some() {
            self.send_presence(now_ms);
        }
    }

    fn send_presence(&mut self, now_ms: u64) {
        let update = PresenceUpdate {
            cursor: self.cursor,
            selection: self.selection.clone(),
        };
        if self.with_store(|store, project| store.set_presence(project, update)) {
            self.last_heartbeat = Some(now_ms);
        }
    }

    // --- inbound --------------------------------------------------------

    /// Drain store events into the session, then send any due presence.
    pub fn poll(&mut self, session: &mut CanvasSession, now_ms: u64) {
        let events = match self.store.as_mut() {
            Some(store) => store.poll(),
            None => return,
        };
        for event in events {
            self.handle_event(session, event, now_ms);
            if self.store.is_none() {
                return;
            }
        }

        if !self.is_active() {
            return;
        }
        self.track_selection(session);
        let heartbeat_due = self
            .last_heartbeat
            .is_none_or(|last| now_ms >= last.saturating_add(self.config.heartbeat_ms));
        let trailing_cursor = self.throttle.flush(now_ms).is_some();
        if heartbeat_due || trailing_cursor {
            self.send_presence(now_ms);
        }
    }

    fn handle_event(&mut self, session: &mut CanvasSession, event: StoreEvent, now_ms: u64) {
        match event {
            StoreEvent::Snapshot {
                items,
                presence,
                at,
            } => self.apply_snapshot(session, items, presence, at, now_ms),
            StoreEvent::ItemChanged { change, at, origin } => {
                if self.is_own(&origin) {
                    self.acknowledge(&change, at);
                } else {
                    self.merge_remote(session, change, at);
                }
            }
            StoreEvent::ItemDeleted { id, origin, .. } => {
                let own = self.is_own(&origin);
                if !own && self.has_create_in_flight(id) {
                    // Our re-create is ordered after this delete.
                    return;
                }
                if !own {
                    session.apply_remote(&Mutation::Removed { id });
                }
                self.forget(id);
            }
            StoreEvent::Presence(record) => {
                if self.client_id.as_deref() != Some(record.client_id.as_str()) {
                    self.collaborators.insert(
                        record.client_id.clone(),
                        Collaborator {
                            record,
                            seen_at: now_ms,
                        },
                    );
                }
            }
            StoreEvent::Error(message) => self.degrade(&message),
        }
    }

    /// Union of the store's items and the local ones: stored values win for
    /// items both sides have, local-only items are published in full.
    ///
    /// Edits queued while connecting are dropped; the republished items
    /// already carry them.
    fn apply_snapshot(
        &mut self,
        session: &mut CanvasSession,
        items: Vec<SceneItem>,
        presence: Vec<PresenceRecord>,
        at: Timestamp,
        now_ms: u64,
    ) {
        let queued = session.take_outbox();
        if !queued.is_empty() {
            log::debug!("Dropping {} edits queued before the snapshot", queued.len());
        }
        self.clocks.clear();
        self.pending.clear();
        self.in_flight.clear();

        let remote: HashSet<ItemId> = items.iter().map(SceneItem::id).collect();
        for item in items {
            let id = item.id();
            let mutation = match session.items().get(id) {
                Some(local) => Mutation::Updated {
                    id,
                    patch: ItemPatch::between(local, &item),
                },
                None => Mutation::Added { item },
            };
            session.apply_remote(&mutation);
            for field in ItemField::all() {
                self.clocks.insert((id, field), at);
            }
        }

        self.state = CollaborationState::Active;
        let local_only: Vec<SceneItem> = session
            .items()
            .iter()
            .filter(|item| !remote.contains(&item.id()))
            .cloned()
            .collect();
        for item in local_only {
            if !self.publish_create(item) {
                return;
            }
        }

        for record in presence {
            self.handle_event(session, StoreEvent::Presence(record), now_ms);
        }
        if let Some(project) = self.project.clone() {
            log::info!("Collaboration active on {}", project);
            self.notices.push(SyncNotice::Connected { project });
        }
    }

    /// Our own write came back: settle it, advance clocks, nothing to apply.
    ///
    /// The store echoes writes in the order they were sent. A create echoes
    /// as `Created` when the item was absent and as `Merged` otherwise. Merges
    /// sent while the item was absent are dropped without an echo, so a
    /// `Created` also settles any merges queued ahead of it.
    fn acknowledge(&mut self, change: &ItemChange, at: Timestamp) {
        let id = change.item_id();
        let mut settled = Vec::new();
        if let Some(queue) = self.in_flight.get_mut(&id) {
            match change {
                ItemChange::Created { .. } => {
                    while let Some(write) = queue.pop_front() {
                        let done = write == InFlight::Create;
                        settled.push(write);
                        if done {
                            break;
                        }
                    }
                }
                ItemChange::Merged { .. } => settled.extend(queue.pop_front()),
            }
            if queue.is_empty() {
                self.in_flight.remove(&id);
            }
        }
        for write in settled {
            for field in write.fields() {
                self.release(id, field);
            }
        }
        for field in change.fields() {
            self.advance_clock(id, field, at);
        }
    }

    fn release(&mut self, id: ItemId, field: ItemField) {
        if let Some(count) = self.pending.get_mut(&(id, field)) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&(id, field));
            }
        }
    }

    fn has_create_in_flight(&self, id: ItemId) -> bool {
        self.in_flight
            .get(&id)
            .is_some_and(|queue| queue.contains(&InFlight::Create))
    }

    fn merge_remote(&mut self, session: &mut CanvasSession, change: ItemChange, at: Timestamp) {
        let id = change.item_id();
        let patch = match change {
            ItemChange::Created { item } if !session.items().contains(id) => {
                for field in ItemField::all() {
                    self.advance_clock(id, field, at);
                }
                session.apply_remote(&Mutation::Added { item });
                return;
            }
            ItemChange::Created { item } => ItemPatch::from_item(&item),
            ItemChange::Merged { patch, .. } => patch,
        };

        let accepted = patch.retain(|field| {
            !self.pending.contains_key(&(id, field))
                && self.clocks.get(&(id, field)).is_none_or(|clock| at >= *clock)
        });
        if accepted.is_empty() {
            return;
        }
        for field in accepted.fields() {
            self.advance_clock(id, field, at);
        }
        session.apply_remote(&Mutation::Updated { id, patch: accepted });
    }

    fn advance_clock(&mut self, id: ItemId, field: ItemField, at: Timestamp) {
        let clock = self.clocks.entry((id, field)).or_default();
        if at > *clock {
            *clock = at;
        }
    }

    fn forget(&mut self, id: ItemId) {
        self.clocks.retain(|(item, _), _| *item != id);
        self.pending.retain(|(item, _), _| *item != id);
        self.in_flight.remove(&id);
    }

    // --- presence -------------------------------------------------------

    /// Collaborators heard from within the presence window, by name.
    pub fn active_collaborators(&self, now_ms: u64) -> Vec<&Collaborator> {
        let mut active: Vec<&Collaborator> = self
            .collaborators
            .values()
            .filter(|c| now_ms.saturating_sub(c.seen_at) <= self.config.presence_window_ms)
            .collect();
        active.sort_by(|a, b| {
            a.record
                .display_name
                .cmp(&b.record.display_name)
                .then_with(|| a.record.client_id.cmp(&b.record.client_id))
        });
        active
    }

    pub fn collaborator(&self, client_id: &str) -> Option<&Collaborator> {
        self.collaborators.get(client_id)
    }
}
