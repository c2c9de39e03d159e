use driving_shared::{ControlInputs, ParticipantId, VehicleConfig, WorldSimulation};

use crate::bridge::{FrameReport, PresentationBridge};
use crate::scene::Scene;

/// Participant id of the only driver in an offline session.
pub const OFFLINE_PARTICIPANT: ParticipantId = 1;

/// A session with no server: this client holds the only replica, writes its
/// inputs straight into it and advances it with the frame clock.
pub struct OfflineSession<S: Scene> {
    world: WorldSimulation,
    bridge: PresentationBridge<S>,
}

impl<S: Scene> OfflineSession<S> {
    pub fn new(scene: S, config: VehicleConfig, seed: u32) -> Self {
        let mut world = WorldSimulation::new(config, seed);
        world.add_participant(OFFLINE_PARTICIPANT);
        Self {
            world,
            bridge: PresentationBridge::new(scene, OFFLINE_PARTICIPANT),
        }
    }

    pub fn world(&self) -> &WorldSimulation {
        &self.world
    }

    pub fn bridge(&self) -> &PresentationBridge<S> {
        &self.bridge
    }

    /// Apply changed inputs, advance by `dt`, then sync the scene.
    pub fn step(&mut self, dt: f64, inputs: ControlInputs) -> FrameReport {
        self.bridge.apply_local_inputs(&mut self.world, inputs);
        self.world.tick(dt);
        self.bridge.frame(Some(&self.world), inputs)
    }
}
