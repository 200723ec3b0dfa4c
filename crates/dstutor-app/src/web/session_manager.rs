use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dstutor_chat::{remove_scratch_dir, DisplaySink, SessionState, Tutor};
use dstutor_types::{Speaker, Turn, UserRole};

use crate::web::protocol::{ServerMessage, SessionConfig, SessionId, SessionInfo};

/// A client connection to a session
#[derive(Debug)]
pub struct ClientConnection {
    pub client_id: Uuid,
    pub ws_sender: mpsc::UnboundedSender<ServerMessage>,
    pub joined_at: DateTime<Utc>,
}

/// A chat session, shared by every browser tab that joins it
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub role: UserRole,
    /// Held for the whole of a turn; a second question finds it locked
    pub state: Arc<Mutex<SessionState>>,
    pub clients: Arc<RwLock<Vec<ClientConnection>>>,
    pub created_at: DateTime<Utc>,
    pub last_activity: Arc<Mutex<DateTime<Utc>>>,
    /// Turns as of the last completed turn, readable while one is in flight
    history: RwLock<Vec<Turn>>,
    figures: RwLock<Vec<PathBuf>>,
    scratch_dirs: RwLock<Vec<PathBuf>>,
    cancel: std::sync::Mutex<Option<CancellationToken>>,
}

impl Session {
    pub fn new(id: SessionId, state: SessionState) -> Self {
        Self {
            id,
            username: state.username.clone(),
            role: state.role,
            history: RwLock::new(state.turns.clone()),
            state: Arc::new(Mutex::new(state)),
            clients: Arc::new(RwLock::new(Vec::new())),
            created_at: Utc::now(),
            last_activity: Arc::new(Mutex::new(Utc::now())),
            figures: RwLock::new(Vec::new()),
            scratch_dirs: RwLock::new(Vec::new()),
            cancel: std::sync::Mutex::new(None),
        }
    }

    pub async fn add_client(&self, client_id: Uuid, ws_sender: mpsc::UnboundedSender<ServerMessage>) {
        let conn = ClientConnection {
            client_id,
            ws_sender,
            joined_at: Utc::now(),
        };
        self.clients.write().await.push(conn);
        self.update_activity().await;
    }

    pub async fn remove_client(&self, client_id: Uuid) {
        self.clients.write().await.retain(|c| c.client_id != client_id);
        self.update_activity().await;
    }

    pub async fn broadcast(&self, message: ServerMessage) {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            let _ = client.ws_sender.send(message.clone());
        }
    }

    pub async fn send_to_client(&self, client_id: Uuid, message: ServerMessage) {
        let clients = self.clients.read().await;
        if let Some(client) = clients.iter().find(|c| c.client_id == client_id) {
            let _ = client.ws_sender.send(message);
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn update_activity(&self) {
        *self.last_activity.lock().await = Utc::now();
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.history.read().await.clone()
    }

    pub async fn set_history(&self, turns: Vec<Turn>) {
        *self.history.write().await = turns;
    }

    /// Whether a turn currently holds the session state
    pub fn is_generating(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// Keep a run's scratch directory until the session closes and return
    /// the indices of its figures
    pub async fn add_run(&self, scratch_dir: PathBuf, figures: Vec<PathBuf>) -> Vec<usize> {
        self.scratch_dirs.write().await.push(scratch_dir);
        let mut kept = self.figures.write().await;
        let start = kept.len();
        kept.extend(figures);
        (start..kept.len()).collect()
    }

    /// Delete every scratch directory this session holds
    pub async fn discard_runs(&self) {
        self.figures.write().await.clear();
        for dir in self.scratch_dirs.write().await.drain(..) {
            remove_scratch_dir(&dir);
        }
    }

    pub async fn figure(&self, index: usize) -> Option<PathBuf> {
        self.figures.read().await.get(index).cloned()
    }

    pub fn set_cancel_token(&self, token: Option<CancellationToken>) {
        if let Ok(mut guard) = self.cancel.lock() {
            *guard = token;
        }
    }

    /// Cancel the typing effect of the turn in flight, if any
    pub fn cancel_streaming(&self) -> bool {
        match self.cancel.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub async fn get_info(&self) -> SessionInfo {
        let clients = self.clients.read().await;
        let last_activity = *self.last_activity.lock().await;

        SessionInfo {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at.to_rfc3339(),
            last_activity: last_activity.to_rfc3339(),
            active_clients: clients.len(),
            turn_count: self.history.read().await.len(),
            generating: self.is_generating(),
        }
    }
}

/// Display sink that mirrors blocks to every client of a session
pub struct WebSink {
    session: Arc<Session>,
}

impl WebSink {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl DisplaySink for WebSink {
    async fn append_block(&mut self, speaker: Speaker, content: &str) {
        self.session
            .broadcast(ServerMessage::BlockAppended {
                speaker,
                content: content.to_string(),
            })
            .await;
    }

    async fn replace_last(&mut self, content: &str) {
        self.session
            .broadcast(ServerMessage::BlockUpdated {
                content: content.to_string(),
                is_final: false,
            })
            .await;
    }

    async fn finish_block(&mut self, content: &str) {
        self.session
            .broadcast(ServerMessage::BlockUpdated {
                content: content.to_string(),
                is_final: true,
            })
            .await;
    }
}

/// Manages all active sessions
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Session>>>>,
    tutor: Arc<Tutor>,
    default_username: String,
    default_role: UserRole,
}

impl SessionManager {
    pub fn new(tutor: Arc<Tutor>, default_username: String, default_role: UserRole) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            tutor,
            default_username,
            default_role,
        }
    }

    pub fn tutor(&self) -> &Arc<Tutor> {
        &self.tutor
    }

    /// Create a session, seeded from the history file when persistence is on.
    ///
    /// Sessions share that file; each persist overwrites it with the writing
    /// session's turns.
    pub async fn create_session(&self, config: SessionConfig) -> SessionId {
        let session_id = Uuid::new_v4();

        let username = config
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.default_username.clone());
        let role = config
            .role
            .as_deref()
            .map(UserRole::from_str)
            .unwrap_or(self.default_role);

        let state = self.tutor.new_session(username, role);
        let session = Arc::new(Session::new(session_id, state));
        self.sessions.write().await.insert(session_id, session);

        log::info!("created web session {}", session_id);
        session_id
    }

    pub async fn get_session(&self, session_id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// List all active sessions, most recently active first
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos = Vec::new();

        for session in sessions.values() {
            infos.push(session.get_info().await);
        }

        infos.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        infos
    }

    /// Remove a session and its scratch directories; false when it did not exist
    pub async fn remove_session(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        if let Some(session) = &removed {
            session.cancel_streaming();
            session.discard_runs().await;
            log::info!("closed web session {}", session_id);
        }
        removed.is_some()
    }

    /// Remove the session once no client is connected and no turn is running
    pub async fn remove_if_abandoned(&self, session_id: &SessionId) -> bool {
        let abandoned = match self.get_session(session_id).await {
            Some(session) => session.client_count().await == 0 && !session.is_generating(),
            None => false,
        };
        abandoned && self.remove_session(session_id).await
    }
}
