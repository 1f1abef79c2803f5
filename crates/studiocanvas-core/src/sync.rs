//! Relay wire protocol and the native websocket store client.
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "project": "p1", "client_id": "...", "identity": { ... } }
//! { "type": "write", "project": "p1", "write": { "kind": "merge", "id": "...", "patch": [ ... ] } }
//! { "type": "item_changed", "project": "p1", "change": { ... }, "at": 1700000000000, "origin": { ... } }
//! ```

use crate::items::{ItemId, SceneItem};
use crate::store::{
    Identity, ItemChange, ItemWrite, Origin, PresenceRecord, PresenceUpdate, StoreEvent, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        project: String,
        client_id: String,
        identity: Identity,
    },
    Leave {
        project: String,
    },
    Write {
        project: String,
        write: ItemWrite,
    },
    Delete {
        project: String,
        id: ItemId,
    },
    Presence {
        project: String,
        update: PresenceUpdate,
    },
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed, with the project's current state.
    Joined {
        project: String,
        items: Vec<SceneItem>,
        #[serde(default)]
        presence: Vec<PresenceRecord>,
        at: Timestamp,
    },
    ItemChanged {
        project: String,
        change: ItemChange,
        at: Timestamp,
        origin: Origin,
    },
    ItemDeleted {
        project: String,
        id: ItemId,
        at: Timestamp,
        origin: Origin,
    },
    Presence {
        project: String,
        record: PresenceRecord,
    },
    Error {
        message: String,
    },
}

impl From<ServerMessage> for StoreEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Joined {
                items,
                presence,
                at,
                ..
            } => StoreEvent::Snapshot {
                items,
                presence,
                at,
            },
            ServerMessage::ItemChanged {
                change, at, origin, ..
            } => StoreEvent::ItemChanged { change, at, origin },
            ServerMessage::ItemDeleted { id, at, origin, .. } => {
                StoreEvent::ItemDeleted { id, at, origin }
            }
            ServerMessage::Presence { record, .. } => StoreEvent::Presence(record),
            ServerMessage::Error { message } => StoreEvent::Error(message),
        }
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ============================================================================
// Native WebSocket client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use crate::items::ItemList;
    use crate::store::{DocumentStore, StoreError, StoreResult};
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{connect, Message};
    use url::Url;
    use uuid::Uuid;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Events sent back from the WebSocket thread.
    enum WsEvent {
        Connected,
        Message(ServerMessage),
        Disconnected,
        Failed(String),
    }

    /// [`DocumentStore`] backed by the relay server.
    ///
    /// The socket runs on a background thread; requests are queued on a
    /// channel and replies are drained by [`DocumentStore::poll`].
    pub struct RelayConnection {
        client_id: String,
        state: ConnectionState,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<WsEvent>>,
        _thread: Option<JoinHandle<()>>,
        project: Option<String>,
        /// Last known server state of the subscribed project.
        mirror: ItemList,
    }

    impl RelayConnection {
        /// Open a connection to `url` (`ws://` or `wss://`).
        pub fn connect(url: &str) -> StoreResult<Self> {
            let parsed = Url::parse(url).map_err(|e| StoreError::Transport(format!("Invalid URL: {}", e)))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(StoreError::Transport(format!(
                    "Invalid WebSocket URL scheme: {}",
                    parsed.scheme()
                )));
            }

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<WsEvent>();
            let url = url.to_string();
            let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

            Ok(Self {
                client_id: Uuid::new_v4().to_string(),
                state: ConnectionState::Connecting,
                cmd_tx: Some(cmd_tx),
                event_rx: Some(event_rx),
                _thread: Some(handle),
                project: None,
                mirror: ItemList::new(),
            })
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }

        /// Close the socket. Further calls fail with [`StoreError::Disconnected`].
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        fn send(&self, msg: &ClientMessage) -> StoreResult<()> {
            let json = serde_json::to_string(msg)?;
            match &self.cmd_tx {
                Some(tx) => tx
                    .send(WsCommand::Send(json))
                    .map_err(|_| StoreError::Disconnected),
                None => Err(StoreError::Disconnected),
            }
        }

        fn check_project(&self, project: &str) -> StoreResult<()> {
            if self.project.as_deref() == Some(project) {
                Ok(())
            } else {
                Err(StoreError::NotSubscribed(project.to_string()))
            }
        }

    }

    /// Fold a server message into the mirrored project items.
    pub(super) fn track(mirror: &ItemList, msg: &ServerMessage) -> ItemList {
        match msg {
            ServerMessage::Joined { items, .. } => items.iter().cloned().collect(),
            ServerMessage::ItemChanged { change, .. } => match change {
                ItemChange::Created { item } => mirror.insert_item(item.clone()),
                ItemChange::Merged { id, patch } => mirror.update_item(*id, patch),
            },
            // Also detaches connectors that pointed at the item.
            ServerMessage::ItemDeleted { id, .. } => mirror.remove_item(*id),
            _ => mirror.clone(),
        }
    }

    /// First 100 characters of an outgoing message, for logging.
    pub(super) fn preview(msg: &str) -> String {
        msg.chars().take(100).collect()
    }

    fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<WsEvent>) {
        log::info!("Relay thread: connecting to {}", url);
        let (mut socket, response) = match connect(url) {
            Ok(ok) => ok,
            Err(e) => {
                log::error!("Relay connection failed: {}", e);
                let _ = event_tx.send(WsEvent::Failed(format!("Connection failed: {}", e)));
                return;
            }
        };
        log::info!("Relay connected, status: {}", response.status());
        let _ = event_tx.send(WsEvent::Connected);

        match socket.get_mut() {
            tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
            }
            #[allow(unreachable_patterns)]
            _ => log::debug!("TLS or other stream - using default timeout handling"),
        }

        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("Relay sending: {}", preview(&msg));
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("Relay send error: {}", e);
                        let _ = event_tx.send(WsEvent::Failed(format!("Send failed: {}", e)));
                        return;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("Relay close requested");
                    let _ = socket.close(None);
                    break;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                    Ok(msg) => {
                        let _ = event_tx.send(WsEvent::Message(msg));
                    }
                    Err(e) => log::warn!("Failed to parse server message: {}", e),
                },
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => {
                    log::info!("Relay received close frame");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    log::error!("Relay read error: {}", e);
                    let _ = event_tx.send(WsEvent::Failed(format!("Read failed: {}", e)));
                    return;
                }
            }
        }

        log::info!("Relay thread exiting");
        let _ = event_tx.send(WsEvent::Disconnected);
    }

    impl DocumentStore for RelayConnection {
        fn client_id(&self) -> &str {
            &self.client_id
        }

        fn subscribe(&mut self, project: &str, identity: &Identity) -> StoreResult<()> {
            if let Some(current) = self.project.clone() {
                self.unsubscribe(&current)?;
            }
            self.send(&ClientMessage::Join {
                project: project.to_string(),
                client_id: self.client_id.clone(),
                identity: identity.clone(),
            })?;
            self.project = Some(project.to_string());
            Ok(())
        }

        fn unsubscribe(&mut self, project: &str) -> StoreResult<()> {
            self.check_project(project)?;
            self.project = None;
            self.mirror = ItemList::new();
            self.send(&ClientMessage::Leave {
                project: project.to_string(),
            })
        }

        fn get(&self, project: &str, id: ItemId) -> Option<SceneItem> {
            self.check_project(project).ok()?;
            self.mirror.get(id).cloned()
        }

        fn set(&mut self, project: &str, write: ItemWrite) -> StoreResult<()> {
            self.check_project(project)?;
            self.send(&ClientMessage::Write {
                project: project.to_string(),
                write,
            })
        }

        fn delete(&mut self, project: &str, id: ItemId) -> StoreResult<()> {
            self.check_project(project)?;
            self.send(&ClientMessage::Delete {
                project: project.to_string(),
                id,
            })
        }

        fn set_presence(&mut self, project: &str, update: PresenceUpdate) -> StoreResult<()> {
            self.check_project(project)?;
            self.send(&ClientMessage::Presence {
                project: project.to_string(),
                update,
            })
        }

        fn poll(&mut self) -> Vec<StoreEvent> {
            let Some(rx) = self.event_rx.take() else {
                return Vec::new();
            };
            let mut events = Vec::new();
            let mut open = true;
            loop {
                match rx.try_recv() {
                    Ok(WsEvent::Connected) => self.state = ConnectionState::Connected,
                    Ok(WsEvent::Message(msg)) => {
                        self.mirror = track(&self.mirror, &msg);
                        events.push(msg.into());
                    }
                    Ok(WsEvent::Disconnected) => {
                        self.state = ConnectionState::Disconnected;
                        events.push(StoreEvent::Error("relay connection closed".into()));
                        open = false;
                    }
                    Ok(WsEvent::Failed(message)) => {
                        self.state = ConnectionState::Error;
                        events.push(StoreEvent::Error(message));
                        open = false;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        open = false;
                        break;
                    }
                }
            }
            if open {
                self.event_rx = Some(rx);
            } else {
                self.cmd_tx = None;
            }
            events
        }
    }

    impl Drop for RelayConnection {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::RelayConnection;
