use crate::config::ServerConfig;
use driving_shared::protocol::{hash_hex, InputsWire, ServerMsg, WelcomeMsg, PROTOCOL_VERSION};
use driving_shared::{ControlInputs, ParticipantId, Replicable, WorldSimulation};
use std::collections::BTreeMap;

/// Session state owned by the game loop task.
///
/// The server orders events; it does not decide outcomes. It keeps a replica
/// of the world only so that late joiners can start from a snapshot and so
/// that clients can compare checkpoints against it.
pub struct SessionState {
    world: WorldSimulation,
    /// Last inputs per participant, handed to late joiners
    inputs: BTreeMap<ParticipantId, ControlInputs>,
    next_participant_id: ParticipantId,
    /// Sequence number of the last emitted session event
    seq: u64,
    max_participants: usize,
}

impl SessionState {
    pub fn new(config: &ServerConfig) -> Self {
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        Self {
            world: WorldSimulation::new(config.vehicle, seed),
            inputs: BTreeMap::new(),
            next_participant_id: 1,
            seq: 0,
            max_participants: config.max_participants,
        }
    }

    pub fn world(&self) -> &WorldSimulation {
        &self.world
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Admit a new participant. Returns the `joined` event for everybody else
    /// and the welcome for the newcomer, or `None` when the session is full.
    pub fn join(&mut self) -> Option<(ServerMsg, WelcomeMsg)> {
        if self.world.len() >= self.max_participants {
            return None;
        }

        let id = self.next_participant_id;
        self.next_participant_id += 1;

        let seq = self.next_seq();
        self.world.add_participant(id);
        tracing::info!(participant = id, seq, "participant joined");

        let welcome = WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            self_id: id,
            seq,
            config: *self.world.config(),
            snapshot: self.world.snapshot(),
            inputs: self
                .inputs
                .iter()
                .map(|(id, inputs)| InputsWire {
                    id: *id,
                    inputs: *inputs,
                })
                .collect(),
        };

        Some((ServerMsg::Joined { seq, id }, welcome))
    }

    /// Remove a participant. Unknown ids produce no event.
    pub fn leave(&mut self, id: ParticipantId) -> Option<ServerMsg> {
        self.world.remove_participant(id)?;
        self.inputs.remove(&id);
        let seq = self.next_seq();
        tracing::info!(participant = id, seq, "participant left");
        Some(ServerMsg::Left { seq, id })
    }

    /// Record new inputs for `id`. Returns the event to broadcast, or `None`
    /// when `id` is not playing or the inputs did not change.
    pub fn set_inputs(&mut self, id: ParticipantId, inputs: ControlInputs) -> Option<ServerMsg> {
        if !self.world.contains(id) {
            return None;
        }
        let inputs = inputs.sanitized();
        let previous = self.inputs.get(&id).copied().unwrap_or_default();
        if previous == inputs {
            return None;
        }

        if inputs == ControlInputs::default() {
            self.inputs.remove(&id);
        } else {
            self.inputs.insert(id, inputs);
        }
        self.world.set_control_inputs(id, inputs);

        let seq = self.next_seq();
        Some(ServerMsg::Inputs { seq, id, inputs })
    }

    /// Advance the replica and return the tick event.
    pub fn tick(&mut self, dt: f64) -> ServerMsg {
        self.world.tick(dt);
        let seq = self.next_seq();
        ServerMsg::Tick { seq, dt }
    }

    pub fn checkpoint(&mut self) -> ServerMsg {
        let seq = self.next_seq();
        ServerMsg::Checkpoint {
            seq,
            tick: self.world.tick_count(),
            hash: hash_hex(self.world.state_hash()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> SessionState {
        let config = ServerConfig {
            rng_seed: Some(12345),
            max_participants: 3,
            ..Default::default()
        };
        SessionState::new(&config)
    }

    fn forward() -> ControlInputs {
        ControlInputs::from_keys(true, false, false, false)
    }

    #[test]
    fn join_assigns_unique_ids_and_increasing_seq() {
        let mut state = test_state();
        let (_, w1) = state.join().unwrap();
        let (_, w2) = state.join().unwrap();
        assert_ne!(w1.self_id, w2.self_id);
        assert!(w2.seq > w1.seq);
        assert_eq!(w2.snapshot.vehicles.len(), 2);
    }

    #[test]
    fn join_rejected_when_full() {
        let mut state = test_state();
        for _ in 0..3 {
            assert!(state.join().is_some());
        }
        assert!(state.join().is_none());
    }

    #[test]
    fn leave_frees_a_slot() {
        let mut state = test_state();
        let ids: Vec<_> = (0..3).map(|_| state.join().unwrap().1.self_id).collect();
        assert!(state.join().is_none());

        assert!(matches!(state.leave(ids[1]), Some(ServerMsg::Left { .. })));
        assert!(state.join().is_some());
    }

    #[test]
    fn leave_of_unknown_id_emits_nothing() {
        let mut state = test_state();
        let seq = state.seq();
        assert!(state.leave(99).is_none());
        assert_eq!(state.seq(), seq);
    }

    #[test]
    fn unchanged_inputs_are_not_rebroadcast() {
        let mut state = test_state();
        let (_, w) = state.join().unwrap();
        assert!(state.set_inputs(w.self_id, forward()).is_some());
        assert!(state.set_inputs(w.self_id, forward()).is_none());
        assert!(state.set_inputs(w.self_id, ControlInputs::default()).is_some());
    }

    #[test]
    fn inputs_for_unknown_participant_ignored() {
        let mut state = test_state();
        assert!(state.set_inputs(42, forward()).is_none());
    }

    #[test]
    fn late_joiner_receives_input_ledger() {
        let mut state = test_state();
        let (_, first) = state.join().unwrap();
        state.set_inputs(first.self_id, forward());

        let (_, second) = state.join().unwrap();
        assert_eq!(second.inputs.len(), 1);
        assert_eq!(second.inputs[0].id, first.self_id);
        assert_eq!(second.inputs[0].inputs, forward());
    }

    #[test]
    fn late_joiner_snapshot_matches_replica() {
        let mut state = test_state();
        let (_, first) = state.join().unwrap();
        state.set_inputs(first.self_id, forward());
        for _ in 0..10 {
            state.tick(1.0 / 60.0);
        }

        let (_, welcome) = state.join().unwrap();
        let mut replica = WorldSimulation::from_snapshot(welcome.config, welcome.snapshot);
        for wire in &welcome.inputs {
            replica.set_control_inputs(wire.id, wire.inputs);
        }
        assert_eq!(replica.state_hash(), state.world().state_hash());

        state.tick(1.0 / 60.0);
        replica.tick(1.0 / 60.0);
        assert_eq!(replica.state_hash(), state.world().state_hash());
    }

    #[test]
    fn checkpoint_reports_replica_hash() {
        let mut state = test_state();
        state.join();
        state.tick(0.5);
        match state.checkpoint() {
            ServerMsg::Checkpoint { tick, hash, .. } => {
                assert_eq!(tick, 1);
                assert_eq!(hash, hash_hex(state.world().state_hash()));
            }
            other => panic!("Expected Checkpoint, got {:?}", other),
        }
    }
}
