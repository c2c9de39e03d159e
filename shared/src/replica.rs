//! Replication contract between the simulation and whatever carries it
//! across clients.
//!
//! Replicas stay consistent by re-executing the same deterministic steps from
//! the same ordered events. Snapshots exist so a replica can start mid-session;
//! they carry every replicated field and nothing else. Control inputs are not
//! part of a snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::world::ParticipantId;

/// An entity whose replicated state can be captured and restored.
pub trait Replicable {
    type Snapshot;

    fn snapshot(&self) -> Self::Snapshot;

    /// Overwrite replicated state from a snapshot.
    fn apply_snapshot(&mut self, snapshot: Self::Snapshot);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct VehicleSnapshot {
    pub position: [f64; 3],
    pub orientation: f64,
    pub velocity: [f64; 3],
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ParticipantVehicle {
    pub id: ParticipantId,
    pub vehicle: VehicleSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub seed: u32,
    #[ts(type = "number")]
    pub spawn_count: u64,
    #[ts(type = "number")]
    pub tick_count: u64,
    pub vehicles: Vec<ParticipantVehicle>,
}
