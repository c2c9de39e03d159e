use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::VehicleConfig;
use crate::controls::ControlInputs;
use crate::replica::WorldSnapshot;
use crate::world::ParticipantId;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

/// Everything except `welcome` and `rejected` is a session event. Session
/// events carry a strictly increasing `seq` and must be applied in that order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "rejected")]
    Rejected { reason: String },
    #[serde(rename = "joined")]
    Joined {
        #[ts(type = "number")]
        seq: u64,
        id: ParticipantId,
    },
    #[serde(rename = "left")]
    Left {
        #[ts(type = "number")]
        seq: u64,
        id: ParticipantId,
    },
    #[serde(rename = "inputs")]
    Inputs {
        #[ts(type = "number")]
        seq: u64,
        id: ParticipantId,
        inputs: ControlInputs,
    },
    #[serde(rename = "tick")]
    Tick {
        #[ts(type = "number")]
        seq: u64,
        dt: f64,
    },
    #[serde(rename = "checkpoint")]
    Checkpoint {
        #[ts(type = "number")]
        seq: u64,
        #[ts(type = "number")]
        tick: u64,
        /// World state hash as 16 hex digits
        hash: String,
    },
}

impl ServerMsg {
    /// Sequence number of a session event, `None` for handshake messages.
    pub fn seq(&self) -> Option<u64> {
        match self {
            ServerMsg::Welcome(_) | ServerMsg::Rejected { .. } => None,
            ServerMsg::Joined { seq, .. }
            | ServerMsg::Left { seq, .. }
            | ServerMsg::Inputs { seq, .. }
            | ServerMsg::Tick { seq, .. }
            | ServerMsg::Checkpoint { seq, .. } => Some(*seq),
        }
    }
}

/// Sent once to a joining client: its identity plus the session state as of
/// event `seq`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: ParticipantId,
    #[ts(type = "number")]
    pub seq: u64,
    pub config: VehicleConfig,
    pub snapshot: WorldSnapshot,
    /// Current inputs of every participant that is not idle
    pub inputs: Vec<InputsWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct InputsWire {
    pub id: ParticipantId,
    pub inputs: ControlInputs,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "set_inputs")]
    SetInputs { inputs: ControlInputs },
}

/// Format a state hash for the wire.
pub fn hash_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replica::Replicable;
    use crate::world::WorldSimulation;

    #[test]
    fn welcome_carries_snapshot() {
        let mut world = WorldSimulation::new(VehicleConfig::default(), 9);
        world.add_participant(7);

        let msg = ServerMsg::Welcome(WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: "0.1.0".to_string(),
            self_id: 7,
            seq: 1,
            config: *world.config(),
            snapshot: world.snapshot(),
            inputs: vec![InputsWire {
                id: 7,
                inputs: ControlInputs::from_keys(true, false, false, false),
            }],
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"welcome\""));
        assert!(json.contains("\"protocolVersion\":1"));
        assert!(json.contains("\"selfId\":7"));

        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::Welcome(w) => {
                assert_eq!(w.self_id, 7);
                assert_eq!(w.seq, 1);
                assert_eq!(w.snapshot, world.snapshot());
                assert_eq!(w.inputs.len(), 1);
            }
            _ => panic!("Expected Welcome"),
        }
    }

    #[test]
    fn tick_dt_is_exact_over_json() {
        let dt = 0.016_666_666_666_666_666_f64 + 1e-17;
        let json = serde_json::to_string(&ServerMsg::Tick { seq: 42, dt }).unwrap();
        assert!(json.contains("\"type\":\"tick\""));
        match serde_json::from_str::<ServerMsg>(&json).unwrap() {
            ServerMsg::Tick { seq, dt: parsed } => {
                assert_eq!(seq, 42);
                assert_eq!(parsed.to_bits(), dt.to_bits());
            }
            _ => panic!("Expected Tick"),
        }
    }

    #[test]
    fn inputs_event_wire_format() {
        let msg = ServerMsg::Inputs {
            seq: 3,
            id: 2,
            inputs: ControlInputs::from_keys(false, false, true, false),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"inputs\""));
        assert!(json.contains("\"steerLeft\":1.0"));
        assert_eq!(msg.seq(), Some(3));
    }

    #[test]
    fn handshake_messages_have_no_seq() {
        let msg = ServerMsg::Rejected {
            reason: "session full".to_string(),
        };
        assert_eq!(msg.seq(), None);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"rejected\""));
    }

    #[test]
    fn client_set_inputs_parses_from_browser_json() {
        let json = r#"{"type":"set_inputs","inputs":{"accelerate":1,"steerRight":0.5}}"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::SetInputs { inputs } => {
                assert_eq!(inputs.throttle(), 1.0);
                assert_eq!(inputs.steering(), -0.5);
            }
        }
    }

    #[test]
    fn hash_hex_is_fixed_width() {
        assert_eq!(hash_hex(0xab), "00000000000000ab");
        assert_eq!(hash_hex(u64::MAX).len(), 16);
    }
}
