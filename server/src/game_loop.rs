use crate::config::ServerConfig;
use crate::state::SessionState;
use driving_shared::protocol::{ServerMsg, WelcomeMsg};
use driving_shared::{ControlInputs, ParticipantId};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the game loop
pub enum GameCommand {
    ParticipantJoin {
        /// `None` when the session cannot take another participant
        response: oneshot::Sender<Option<WelcomeMsg>>,
    },
    ParticipantLeave {
        id: ParticipantId,
    },
    SetInputs {
        id: ParticipantId,
        inputs: ControlInputs,
    },
}

/// Session events fanned out to every connection, in `seq` order.
pub type GameBroadcast = ServerMsg;

/// Run the session loop. Owns all session state and is the only place
/// sequence numbers are assigned, so every client sees one event order.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    config: ServerConfig,
) {
    let mut state = SessionState::new(&config);

    let tick_duration = Duration::from_secs_f64(1.0 / config.tick_rate_hz as f64);
    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();

    tracing::info!(
        seed = state.world().seed(),
        tick_rate_hz = config.tick_rate_hz,
        "session started"
    );

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if state.world().is_empty() {
                    // Idle session: keep the clock fresh so the first tick
                    // after a join does not carry the idle time.
                    last_tick = Instant::now();
                    continue;
                }

                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                let _ = broadcast_tx.send(state.tick(dt));

                let n = config.checkpoint_every_n as u64;
                if n > 0 && state.world().tick_count() % n == 0 {
                    let _ = broadcast_tx.send(state.checkpoint());
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::ParticipantJoin { response } => {
                        match state.join() {
                            Some((joined, welcome)) => {
                                let _ = broadcast_tx.send(joined);
                                let _ = response.send(Some(welcome));
                            }
                            None => {
                                tracing::warn!("session full, join rejected");
                                let _ = response.send(None);
                            }
                        }
                    }
                    GameCommand::ParticipantLeave { id } => {
                        if let Some(left) = state.leave(id) {
                            let _ = broadcast_tx.send(left);
                        }
                    }
                    GameCommand::SetInputs { id, inputs } => {
                        if let Some(event) = state.set_inputs(id, inputs) {
                            let _ = broadcast_tx.send(event);
                        }
                    }
                }
            }

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}
