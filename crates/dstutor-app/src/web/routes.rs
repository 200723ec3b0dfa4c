use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use dstutor_chat::{
    comparison_table, comparison_tables, diagram, diagrams, export_transcript, quick_question,
    remove_scratch_dir, QUICK_QUESTIONS,
};
use dstutor_types::TutorError;

use crate::web::{
    protocol::{ClientMessage, ServerMessage, SessionConfig, SessionId, SessionInfo},
    session_manager::{Session, SessionManager, WebSink},
};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // API routes
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_session_details).delete(close_session),
        )
        .route("/api/sessions/:id/transcript", get(download_transcript))
        .route("/api/sessions/:id/figures/:index", get(get_figure))
        .route("/api/quick-questions", get(list_quick_questions))
        .route("/api/tables", get(list_tables))
        .route("/api/tables/:name", get(get_table))
        .route("/api/diagrams", get(list_diagrams))
        .route("/api/diagrams/:name", get(get_diagram))
        // WebSocket endpoint
        .route("/ws/:session_id", get(websocket_handler))
        .route("/", get(serve_index))
        .with_state(state)
}

/// GET /api/sessions - List all active sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.session_manager.list_sessions().await;
    Json(serde_json::json!({ "sessions": sessions }))
}

/// POST /api/sessions - Create a new session; the body is optional
async fn create_session(
    State(state): State<AppState>,
    payload: Option<Json<SessionConfig>>,
) -> Json<serde_json::Value> {
    let config = payload.map(|Json(config)| config).unwrap_or_default();
    let session_id = state.session_manager.create_session(config).await;

    Json(serde_json::json!({
        "session_id": session_id,
        "created_at": chrono::Utc::now().to_rfc3339(),
        "websocket_url": format!("/ws/{}", session_id),
    }))
}

async fn find_session(state: &AppState, id: &SessionId) -> Result<Arc<Session>, AppError> {
    state
        .session_manager
        .get_session(id)
        .await
        .ok_or_else(|| AppError::NotFound("Session not found".into()))
}

#[derive(serde::Serialize)]
struct SessionDetails {
    #[serde(flatten)]
    info: SessionInfo,
    turns: Vec<dstutor_types::Turn>,
}

/// GET /api/sessions/:id - Session info plus its turns
async fn get_session_details(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionDetails>, AppError> {
    let session = find_session(&state, &id).await?;
    Ok(Json(SessionDetails {
        info: session.get_info().await,
        turns: session.history().await,
    }))
}

/// DELETE /api/sessions/:id - Close a session
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.session_manager.remove_session(&id).await {
        return Err(AppError::NotFound("Session not found".into()));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Session closed successfully",
    })))
}

/// GET /api/sessions/:id/transcript - Plain-text transcript download
async fn download_transcript(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &id).await?;
    let transcript = export_transcript(&session.history().await, &session.username);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"chat_history.txt\""),
        ],
        transcript,
    )
        .into_response())
}

/// GET /api/sessions/:id/figures/:index - A PNG saved by a code snippet
async fn get_figure(
    State(state): State<AppState>,
    Path((id, index)): Path<(SessionId, usize)>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &id).await?;
    let path = session
        .figure(index)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No figure {}", index)))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::NotFound(format!("Figure {} is gone: {}", index, e)))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

/// GET /api/quick-questions
async fn list_quick_questions() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "questions": QUICK_QUESTIONS }))
}

/// GET /api/tables - Names of the comparison tables
async fn list_tables() -> Json<serde_json::Value> {
    let names: Vec<&str> = comparison_tables().iter().map(|t| t.name).collect();
    Json(serde_json::json!({ "tables": names }))
}

/// GET /api/tables/:name - One table, with a Markdown rendering
async fn get_table(Path(name): Path<String>) -> Result<Json<serde_json::Value>, AppError> {
    let table = comparison_table(&name)
        .ok_or_else(|| AppError::NotFound(format!("No comparison table named '{}'", name)))?;

    Ok(Json(serde_json::json!({
        "name": table.name,
        "headers": table.headers,
        "rows": table.rows,
        "markdown": table.to_markdown(),
    })))
}

/// GET /api/diagrams - Names of the diagrams
async fn list_diagrams() -> Json<serde_json::Value> {
    let names: Vec<&str> = diagrams().iter().map(|d| d.name).collect();
    Json(serde_json::json!({ "diagrams": names }))
}

/// GET /api/diagrams/:name - DOT source of one diagram
async fn get_diagram(Path(name): Path<String>) -> Result<Json<serde_json::Value>, AppError> {
    let found = diagram(&name)
        .ok_or_else(|| AppError::NotFound(format!("No diagram named '{}'", name)))?;
    Ok(Json(serde_json::json!(found)))
}

/// GET /ws/:session_id - WebSocket endpoint
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &session_id).await?;
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, state, session)))
}

/// Message sent to a client right after it joins
pub async fn joined_message(session: &Session, state: &AppState) -> ServerMessage {
    let tutor = state.session_manager.tutor();
    ServerMessage::SessionJoined {
        session_id: session.id,
        created_at: session.created_at.to_rfc3339(),
        username: session.username.clone(),
        role: session.role,
        topic: tutor.config().topic.clone(),
        model: tutor.model_name().to_string(),
        history: session.history().await,
        quick_questions: QUICK_QUESTIONS.iter().map(|q| q.to_string()).collect(),
    }
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState, session: Arc<Session>) {
    let client_id = Uuid::new_v4();

    // Create channel for sending messages to this client
    let (ws_sender, mut ws_receiver) = mpsc::unbounded_channel();
    session.add_client(client_id, ws_sender).await;
    session
        .send_to_client(client_id, joined_message(&session, &state).await)
        .await;

    let (mut ws_sink, mut ws_stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sink.send(WsMessage::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(Ok(msg)) = ws_stream.next().await {
        if let WsMessage::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    log::debug!("session {}: {:?}", session.id, client_msg);
                    handle_client_message(client_id, client_msg, &session, &state).await;
                }
                Err(e) => {
                    log::warn!("unparseable WebSocket message {:?}: {}", text, e);
                    session
                        .send_to_client(
                            client_id,
                            ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                                recoverable: true,
                            },
                        )
                        .await;
                }
            }
        }
    }

    // Client disconnected
    session.remove_client(client_id).await;
    send_task.abort();
    log::debug!(
        "client {} left session {} ({} still connected)",
        client_id,
        session.id,
        session.client_count().await
    );
    state.session_manager.remove_if_abandoned(&session.id).await;
}

/// Handle a message from a client.
///
/// Turns and code runs are spawned so the socket keeps reading, which is what
/// lets `CancelStreaming` reach a turn in flight.
pub async fn handle_client_message(
    client_id: Uuid,
    message: ClientMessage,
    session: &Arc<Session>,
    state: &AppState,
) {
    session.update_activity().await;

    match message {
        ClientMessage::Ask { question } => {
            start_turn(client_id, question, session, state).await;
        }
        ClientMessage::QuickQuestion { index } => match quick_question(index) {
            Some(question) => start_turn(client_id, question.to_string(), session, state).await,
            None => {
                session
                    .send_to_client(
                        client_id,
                        ServerMessage::Error {
                            message: format!("No quick question {}", index),
                            recoverable: true,
                        },
                    )
                    .await;
            }
        },
        ClientMessage::ClearHistory => clear_history(client_id, session, state).await,
        ClientMessage::RunCode { code } => {
            let session = Arc::clone(session);
            let state = state.clone();
            tokio::spawn(async move {
                run_code(client_id, code, &session, &state).await;
            });
        }
        ClientMessage::CancelStreaming => {
            session.cancel_streaming();
        }
    }
}

async fn start_turn(client_id: Uuid, question: String, session: &Arc<Session>, state: &AppState) {
    let mut guard = match session.state.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            session.send_to_client(client_id, ServerMessage::Busy).await;
            return;
        }
    };

    let token = CancellationToken::new();
    session.set_cancel_token(Some(token.clone()));

    let session = Arc::clone(session);
    let manager = Arc::clone(&state.session_manager);
    let tutor = Arc::clone(manager.tutor());
    tokio::spawn(async move {
        let mut sink = WebSink::new(session.clone());
        let result = tutor
            .handle_question_cancellable(&mut guard, &question, &mut sink, &token)
            .await;
        session.set_cancel_token(None);

        match result {
            Ok(report) => {
                session.set_history(guard.turns.clone()).await;
                drop(guard);
                session
                    .broadcast(ServerMessage::TurnComplete {
                        turn: report.turn,
                        outcome: report.outcome,
                    })
                    .await;
            }
            Err(e) => {
                drop(guard);
                let message = match e {
                    TutorError::Busy => ServerMessage::Busy,
                    other => ServerMessage::Error {
                        message: other.to_string(),
                        recoverable: other.is_recoverable(),
                    },
                };
                session.send_to_client(client_id, message).await;
            }
        }

        // Everyone may have left while the turn ran
        manager.remove_if_abandoned(&session.id).await;
    });
}

async fn clear_history(client_id: Uuid, session: &Arc<Session>, state: &AppState) {
    let mut guard = match session.state.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            session.send_to_client(client_id, ServerMessage::Busy).await;
            return;
        }
    };

    let result = state.session_manager.tutor().clear_history(&mut guard);
    // Turns are gone from memory even when the file could not be rewritten
    session.set_history(guard.turns.clone()).await;
    drop(guard);

    session.broadcast(ServerMessage::HistoryCleared).await;
    if let Err(e) = result {
        session
            .send_to_client(
                client_id,
                ServerMessage::Error {
                    message: e.to_string(),
                    recoverable: true,
                },
            )
            .await;
    }
}

async fn run_code(client_id: Uuid, code: String, session: &Arc<Session>, state: &AppState) {
    match state.session_manager.tutor().run_code(&code).await {
        Ok(report) => {
            let output = report.output;
            if state.session_manager.get_session(&session.id).await.is_none() {
                // Closed while the snippet ran
                remove_scratch_dir(&output.scratch_dir);
                return;
            }
            let indices = session.add_run(output.scratch_dir, output.figures).await;
            let figures = indices
                .into_iter()
                .map(|i| format!("/api/sessions/{}/figures/{}", session.id, i))
                .collect();

            session
                .broadcast(ServerMessage::CodeResult {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.exit_code,
                    success: output.success,
                    figures,
                    explanation: report.explanation,
                })
                .await;
        }
        Err(e) => {
            session
                .send_to_client(
                    client_id,
                    ServerMessage::Error {
                        message: e.to_string(),
                        recoverable: true,
                    },
                )
                .await;
        }
    }
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../web/index.html"))
}

#[derive(Debug)]
enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
