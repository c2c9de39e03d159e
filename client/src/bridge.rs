use std::collections::HashMap;

use driving_shared::vec3::{add, lerp, rotate_y, Vec3};
use driving_shared::{ControlInputs, ParticipantId, WorldSimulation};

use crate::scene::Scene;

/// Camera position before the local car is known.
const INITIAL_CAMERA: Vec3 = Vec3 {
    x: 0.0,
    y: 5.0,
    z: -10.0,
};
/// Chase point in car space: above and behind the car.
const CAMERA_OFFSET: Vec3 = Vec3 {
    x: 0.0,
    y: 2.0,
    z: -5.0,
};
/// Fraction of the way the camera moves to the chase point each frame.
const CAMERA_FOLLOW: f64 = 0.05;

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub rendered: usize,
    pub local_speed_kmh: Option<f64>,
    /// Local inputs to hand to the session layer; only set when they changed.
    pub outbound_inputs: Option<ControlInputs>,
}

/// Maps the world to scene entities once per frame and routes local control
/// inputs to the one car this client owns.
///
/// The local identity is fixed for the bridge's lifetime; a new session gets a
/// new bridge.
pub struct PresentationBridge<S: Scene> {
    scene: S,
    local_id: ParticipantId,
    cars: HashMap<ParticipantId, S::Handle>,
    camera: Vec3,
    last_sent: Option<ControlInputs>,
}

impl<S: Scene> PresentationBridge<S> {
    pub fn new(mut scene: S, local_id: ParticipantId) -> Self {
        scene.set_camera(INITIAL_CAMERA, Vec3::ZERO);
        Self {
            scene,
            local_id,
            cars: HashMap::new(),
            camera: INITIAL_CAMERA,
            last_sent: None,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Sync the scene with `world` and collect the local inputs.
    ///
    /// A missing world (session not ready yet) skips the frame entirely.
    pub fn frame(&mut self, world: Option<&WorldSimulation>, inputs: ControlInputs) -> FrameReport {
        let Some(world) = world else {
            return FrameReport::default();
        };

        for (id, vehicle) in world.participants() {
            let scene = &mut self.scene;
            let handle = *self
                .cars
                .entry(id)
                .or_insert_with(|| scene.spawn_car(vehicle.color()));
            scene.set_car_pose(handle, vehicle.position, vehicle.orientation);
        }

        let departed: Vec<ParticipantId> = self
            .cars
            .keys()
            .copied()
            .filter(|id| !world.contains(*id))
            .collect();
        for id in departed {
            if let Some(handle) = self.cars.remove(&id) {
                self.scene.despawn_car(handle);
            }
        }

        let mut report = FrameReport {
            rendered: self.cars.len(),
            ..Default::default()
        };

        if let Some(local) = world.get(self.local_id) {
            let target = add(local.position, rotate_y(CAMERA_OFFSET, local.orientation));
            self.camera = lerp(self.camera, target, CAMERA_FOLLOW);
            self.scene.set_camera(self.camera, local.position);

            report.local_speed_kmh = Some(local.speed_kmh());

            let inputs = inputs.sanitized();
            if self.last_sent != Some(inputs) {
                self.last_sent = Some(inputs);
                report.outbound_inputs = Some(inputs);
            }
        }

        report
    }

    /// Write inputs straight into the local car. For sessions where this
    /// client is the only replica; never touches any other participant.
    pub fn apply_local_inputs(&self, world: &mut WorldSimulation, inputs: ControlInputs) -> bool {
        world.set_control_inputs(self.local_id, inputs)
    }

    /// Remove every entity, e.g. when the session ends.
    pub fn clear(&mut self) {
        for (_, handle) in self.cars.drain() {
            self.scene.despawn_car(handle);
        }
        self.last_sent = None;
    }
}
