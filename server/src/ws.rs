use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::game_loop::{GameBroadcast, GameCommand};
use driving_shared::protocol::{ClientMsg, ServerMsg};
use driving_shared::ControlInputs;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub broadcast_tx: broadcast::Sender<GameBroadcast>,
    pub max_inputs_per_sec: u32,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

/// Fixed one-second window counter.
struct RateLimiter {
    limit: u32,
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            window_start: Instant::now(),
            count: 0,
        }
    }

    fn allow(&mut self) -> bool {
        if self.window_start.elapsed() >= Duration::from_secs(1) {
            self.window_start = Instant::now();
            self.count = 0;
        }
        if self.count >= self.limit {
            return false;
        }
        self.count += 1;
        true
    }

    /// When the current window closes and `allow` starts passing again.
    fn window_end(&self) -> Instant {
        self.window_start + Duration::from_secs(1)
    }
}

fn encode(msg: &ServerMsg) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so no event after the snapshot is missed.
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::ParticipantJoin { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send ParticipantJoin command");
        return;
    }

    let welcome = match resp_rx.await {
        Ok(Some(welcome)) => welcome,
        Ok(None) => {
            let rejected = ServerMsg::Rejected {
                reason: "session is full".to_string(),
            };
            if let Some(msg) = encode(&rejected) {
                let _ = sink.send(msg).await;
            }
            let _ = sink.close().await;
            return;
        }
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    let my_id = welcome.self_id;
    let snapshot_seq = welcome.seq;
    tracing::info!("Participant {} connected", my_id);

    let sent = match encode(&ServerMsg::Welcome(welcome)) {
        Some(msg) => sink.send(msg).await.is_ok(),
        None => false,
    };

    if sent {
        let mut limiter = RateLimiter::new(app_state.max_inputs_per_sec);
        // Latest inputs that arrived over the limit. Clients only send on
        // change, so these are relayed once the window reopens.
        let mut pending: Option<ControlInputs> = None;

        loop {
            let flush_at = tokio::time::Instant::from_std(limiter.window_end());

            tokio::select! {
                // Client -> Server
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMsg>(&text) {
                                Ok(ClientMsg::SetInputs { inputs }) => {
                                    if !limiter.allow() {
                                        tracing::debug!("Participant {} input rate limited", my_id);
                                        pending = Some(inputs);
                                        continue;
                                    }
                                    pending = None;
                                    let _ = app_state.game_tx.send(GameCommand::SetInputs {
                                        id: my_id,
                                        inputs,
                                    }).await;
                                }
                                Err(e) => {
                                    tracing::debug!("Participant {} sent malformed message: {}", my_id, e);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        _ => {} // Ignore ping/pong/binary
                    }
                }

                _ = tokio::time::sleep_until(flush_at), if pending.is_some() => {
                    if limiter.allow() {
                        if let Some(inputs) = pending.take() {
                            let _ = app_state.game_tx.send(GameCommand::SetInputs {
                                id: my_id,
                                inputs,
                            }).await;
                        }
                    }
                }

                // Server -> Client (broadcast)
                result = broadcast_rx.recv() => {
                    match result {
                        Ok(event) => {
                            // Already contained in the welcome snapshot.
                            if event.seq().is_some_and(|seq| seq <= snapshot_seq) {
                                continue;
                            }
                            if let Some(msg) = encode(&event) {
                                if sink.send(msg).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // A replica that missed events cannot catch up;
                            // drop it so it reconnects from a fresh snapshot.
                            tracing::warn!("Participant {} lagged by {} events, disconnecting", my_id, n);
                            let _ = sink.close().await;
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::ParticipantLeave { id: my_id })
        .await;
    tracing::info!("Participant {} disconnected", my_id);
}
