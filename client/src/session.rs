use driving_shared::protocol::{hash_hex, ServerMsg, WelcomeMsg};
use driving_shared::{ParticipantId, WorldSimulation};

use crate::connection::NetEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    /// Joining failed; the reason is shown to the user.
    Failed(String),
}

/// The client's view of one session: the local replica of the world and the
/// identity the server gave us.
///
/// The world exists only between `welcome` and the end of the connection.
/// Session events are applied strictly in `seq` order; anything at or below
/// the last applied `seq` is already part of the replica.
pub struct ClientSession {
    pub state: ConnectionState,
    pub server_version: String,
    local_id: Option<ParticipantId>,
    world: Option<WorldSimulation>,
    last_seq: u64,
    desynced: bool,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            server_version: String::new(),
            local_id: None,
            world: None,
            last_seq: 0,
            desynced: false,
        }
    }
}

impl ClientSession {
    pub fn world(&self) -> Option<&WorldSimulation> {
        self.world.as_ref()
    }

    /// Our participant id, resolved once from `welcome`.
    pub fn local_id(&self) -> Option<ParticipantId> {
        self.local_id
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// True once the replica is known to differ from the server's order of
    /// events. It stays set until the next session.
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    pub fn handle(&mut self, event: NetEvent) {
        match event {
            NetEvent::Connected => {
                tracing::info!("WebSocket connected");
                self.state = ConnectionState::Connected;
            }
            NetEvent::Disconnected => {
                if self.state != ConnectionState::Disconnected {
                    tracing::info!("WebSocket disconnected");
                }
                self.state = ConnectionState::Disconnected;
                self.end_session();
            }
            NetEvent::ProtocolMismatch { server, client } => {
                self.state = ConnectionState::Failed(format!(
                    "protocol mismatch (server {}, client {})",
                    server, client
                ));
                self.end_session();
            }
            NetEvent::Failed(reason) => {
                if self.world.is_none() {
                    self.state = ConnectionState::Failed(reason);
                }
            }
            NetEvent::Message(msg) => self.apply(msg),
        }
    }

    fn end_session(&mut self) {
        self.world = None;
        self.local_id = None;
        self.last_seq = 0;
        self.desynced = false;
    }

    fn start_session(&mut self, welcome: WelcomeMsg) {
        let mut world = WorldSimulation::from_snapshot(welcome.config, welcome.snapshot);
        for wire in welcome.inputs {
            world.set_control_inputs(wire.id, wire.inputs);
        }
        tracing::info!(
            self_id = welcome.self_id,
            participants = world.len(),
            server_version = %welcome.server_version,
            "joined session"
        );

        self.state = ConnectionState::Connected;
        self.server_version = welcome.server_version;
        self.local_id = Some(welcome.self_id);
        self.last_seq = welcome.seq;
        self.desynced = false;
        self.world = Some(world);
    }

    fn apply(&mut self, msg: ServerMsg) {
        let seq = match msg {
            ServerMsg::Welcome(welcome) => {
                self.start_session(welcome);
                return;
            }
            ServerMsg::Rejected { reason } => {
                tracing::warn!("join rejected: {}", reason);
                self.state = ConnectionState::Failed(reason);
                self.end_session();
                return;
            }
            ref event => match event.seq() {
                Some(seq) => seq,
                None => return,
            },
        };

        let Some(world) = self.world.as_mut() else {
            return;
        };
        if seq <= self.last_seq {
            return;
        }
        if seq != self.last_seq + 1 && !self.desynced {
            tracing::warn!(expected = self.last_seq + 1, got = seq, "missed session events");
            self.desynced = true;
        }
        self.last_seq = seq;

        match msg {
            ServerMsg::Joined { id, .. } => {
                world.add_participant(id);
                tracing::info!("Participant {} joined", id);
            }
            ServerMsg::Left { id, .. } => {
                world.remove_participant(id);
                tracing::info!("Participant {} left", id);
            }
            ServerMsg::Inputs { id, inputs, .. } => {
                world.set_control_inputs(id, inputs);
            }
            ServerMsg::Tick { dt, .. } => world.tick(dt),
            ServerMsg::Checkpoint { tick, hash, .. } => {
                let local = hash_hex(world.state_hash());
                if local != hash && !self.desynced {
                    tracing::warn!(tick, server = %hash, local = %local, "replica diverged");
                    self.desynced = true;
                }
            }
            ServerMsg::Welcome(_) | ServerMsg::Rejected { .. } => {}
        }
    }
}
