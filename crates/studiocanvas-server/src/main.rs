//! StudioCanvas WebSocket Relay Server
//!
//! Holds the authoritative items of every open project and relays changes
//! between the clients subscribed to it.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type` (see `studiocanvas_core::sync`):
//! ```json
//! { "type": "join", "project": "p1", "client_id": "...", "identity": { "user_id": "u1", "display_name": "Ada" } }
//! { "type": "write", "project": "p1", "write": { "kind": "merge", "id": "...", "patch": [ ... ] } }
//! { "type": "delete", "project": "p1", "id": "..." }
//! { "type": "presence", "project": "p1", "update": { "cursor": { "x": 100, "y": 200 } } }
//! ```
//!
//! Every accepted write is stamped with a server timestamp and broadcast to
//! all peers of the project, the writer included.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use studiocanvas_core::items::ItemId;
use studiocanvas_core::store::{
    Identity, ItemWrite, Origin, PresenceUpdate, ProjectRecord, Timestamp,
};
use studiocanvas_core::sync::{ClientMessage, ServerMessage};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;
const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// A connected client within a project.
struct Peer {
    client_id: String,
    identity: Identity,
}

/// Project state
struct Project {
    record: ProjectRecord,
    /// Broadcast channel for this project
    tx: broadcast::Sender<ServerMessage>,
    /// Connected peers by connection id
    peers: HashMap<String, Peer>,
}

impl Project {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            record: ProjectRecord::new(),
            tx,
            peers: HashMap::new(),
        }
    }

    fn origin(&self, peer_id: &str) -> Result<Origin, String> {
        self.peers
            .get(peer_id)
            .map(|peer| Origin {
                client_id: peer.client_id.clone(),
                user_id: peer.identity.user_id.clone(),
            })
            .ok_or_else(|| "not joined".to_string())
    }

    fn broadcast(&self, msg: ServerMessage) {
        // No receivers is fine: everyone may have left in the meantime.
        let _ = self.tx.send(msg);
    }
}

/// Shared application state
struct AppState {
    /// Open projects
    projects: DashMap<String, Project>,
}

impl AppState {
    fn new() -> Self {
        Self {
            projects: DashMap::new(),
        }
    }

    /// Add a peer, returning its event stream and the project snapshot.
    fn join(
        &self,
        project_id: &str,
        peer_id: &str,
        client_id: String,
        identity: Identity,
    ) -> (broadcast::Receiver<ServerMessage>, ServerMessage) {
        let mut project = self
            .projects
            .entry(project_id.to_string())
            .or_insert_with(Project::new);
        project
            .peers
            .insert(peer_id.to_string(), Peer { client_id, identity });
        let rx = project.tx.subscribe();
        let (items, presence) = project.record.snapshot();
        let joined = ServerMessage::Joined {
            project: project_id.to_string(),
            items,
            presence,
            at: project.record.last_timestamp(),
        };
        (rx, joined)
    }

    /// Remove a peer and its presence; drop the project once empty.
    fn leave(&self, project_id: &str, peer_id: &str) {
        let empty = match self.projects.get_mut(project_id) {
            Some(mut project) => {
                if let Some(peer) = project.peers.remove(peer_id) {
                    project.record.remove_presence(&peer.client_id);
                }
                project.peers.is_empty()
            }
            None => return,
        };
        if empty {
            self.projects.remove(project_id);
            info!("Project {} closed", project_id);
        }
    }

    fn write(&self, project_id: &str, peer_id: &str, write: ItemWrite) -> Result<(), String> {
        let mut project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| format!("unknown project {}", project_id))?;
        let origin = project.origin(peer_id)?;
        let at = project.record.stamp(Timestamp::now());
        match project.record.apply(&write, at) {
            Some(change) => project.broadcast(ServerMessage::ItemChanged {
                project: project_id.to_string(),
                change,
                at,
                origin,
            }),
            None => debug!("Dropped write to missing item {}", write.item_id()),
        }
        Ok(())
    }

    fn delete(&self, project_id: &str, peer_id: &str, id: ItemId) -> Result<(), String> {
        let mut project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| format!("unknown project {}", project_id))?;
        let origin = project.origin(peer_id)?;
        if project.record.delete(id) {
            let at = project.record.stamp(Timestamp::now());
            project.broadcast(ServerMessage::ItemDeleted {
                project: project_id.to_string(),
                id,
                at,
                origin,
            });
        }
        Ok(())
    }

    fn presence(
        &self,
        project_id: &str,
        peer_id: &str,
        update: PresenceUpdate,
    ) -> Result<(), String> {
        let mut project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| format!("unknown project {}", project_id))?;
        let (client_id, identity) = match project.peers.get(peer_id) {
            Some(peer) => (peer.client_id.clone(), peer.identity.clone()),
            None => return Err("not joined".to_string()),
        };
        let at = project.record.stamp(Timestamp::now());
        let record = project
            .record
            .update_presence(&client_id, &identity, update, at);
        project.broadcast(ServerMessage::Presence {
            project: project_id.to_string(),
            record,
        });
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studiocanvas_server=info,tower_http=info".into()),
        )
        .init();

    let addr_str = std::env::var("STUDIOCANVAS_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = match addr_str.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid STUDIOCANVAS_ADDR {}: {}", addr_str, e);
            return;
        }
    };

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    info!("StudioCanvas relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

/// Index page
async fn index() -> &'static str {
    "StudioCanvas Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Apply one client message. Returns the reply for this client, if any.
fn handle_message(
    state: &AppState,
    peer_id: &str,
    current: &mut Option<String>,
    project_rx: &mut Option<broadcast::Receiver<ServerMessage>>,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    let joined = |project: &str| current.as_deref() == Some(project);
    let result = match msg {
        ClientMessage::Join {
            project,
            client_id,
            identity,
        } => {
            if let Some(old) = current.take() {
                state.leave(&old, peer_id);
            }
            info!("Peer {} ({}) joined project {}", peer_id, identity.user_id, project);
            let (rx, snapshot) = state.join(&project, peer_id, client_id, identity);
            *project_rx = Some(rx);
            *current = Some(project);
            return Some(snapshot);
        }
        ClientMessage::Leave { project } => {
            if joined(&project) {
                state.leave(&project, peer_id);
                info!("Peer {} left project {}", peer_id, project);
                *current = None;
                *project_rx = None;
            }
            Ok(())
        }
        ClientMessage::Write { project, write } if joined(&project) => {
            state.write(&project, peer_id, write)
        }
        ClientMessage::Delete { project, id } if joined(&project) => {
            state.delete(&project, peer_id, id)
        }
        ClientMessage::Presence { project, update } if joined(&project) => {
            state.presence(&project, peer_id, update)
        }
        ClientMessage::Write { project, .. }
        | ClientMessage::Delete { project, .. }
        | ClientMessage::Presence { project, .. } => Err(format!("not joined to {}", project)),
    };
    result.err().map(|message| ServerMessage::Error { message })
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_project: Option<String> = None;
    let mut project_rx: Option<broadcast::Receiver<ServerMessage>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                let reply = match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => handle_message(
                            &state,
                            &peer_id,
                            &mut current_project,
                            &mut project_rx,
                            client_msg,
                        ),
                        Err(e) => {
                            warn!("Invalid message from {}: {}", peer_id, e);
                            Some(ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            })
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None, // Ignore binary/ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };
                if let Some(out) = reply.as_ref().and_then(encode) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }

            // Handle broadcast messages from the project
            msg = async {
                match &mut project_rx {
                    Some(rx) => Some(rx.recv().await),
                    // No project joined, just wait forever
                    None => std::future::pending::<Option<Result<ServerMessage, RecvError>>>().await,
                }
            } => {
                let out = match msg {
                    Some(Ok(server_msg)) => server_msg,
                    Some(Err(RecvError::Lagged(missed))) => {
                        warn!("Peer {} lagged by {} messages", peer_id, missed);
                        ServerMessage::Error {
                            message: format!("missed {} updates, rejoin to resync", missed),
                        }
                    }
                    Some(Err(RecvError::Closed)) | None => {
                        project_rx = None;
                        continue;
                    }
                };
                if let Some(out) = encode(&out) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    if let Some(ref project) = current_project {
        state.leave(project, &peer_id);
    }
    info!("Connection closed: {}", peer_id);
}
