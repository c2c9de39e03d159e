use std::f64::consts::TAU;

use rand::Rng;

use crate::config::{MotionModel, TrackBounds, VehicleConfig};
use crate::controls::ControlInputs;
use crate::replica::{Replicable, VehicleSnapshot};
use crate::vec3::{add, heading, planar_length, scale, Vec3};

/// Meters per second to the km/h readout shown to drivers.
const MPS_TO_KMH: f64 = 3.6;

/// Kinematic state of one car.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub position: Vec3,
    /// Yaw in radians, kept in [0, 2π)
    pub orientation: f64,
    pub velocity: Vec3,
    color: u32,
    inputs: ControlInputs,
}

impl VehicleState {
    pub fn new(position: Vec3, orientation: f64, color: u32) -> Self {
        Self {
            position,
            orientation: wrap_yaw(orientation),
            velocity: Vec3::ZERO,
            color,
            inputs: ControlInputs::default(),
        }
    }

    /// Spawn at a random point of the spawn square, facing +Z, at rest.
    pub fn spawn(rng: &mut impl Rng, config: &VehicleConfig, color: u32) -> Self {
        let extent = config.spawn_extent;
        let (x, z) = if extent > 0.0 {
            (rng.gen_range(-extent..extent), rng.gen_range(-extent..extent))
        } else {
            (0.0, 0.0)
        };
        Self::new(Vec3::new(x, config.spawn_height, z), 0.0, color)
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn inputs(&self) -> &ControlInputs {
        &self.inputs
    }

    /// Replace the control inputs. Non-finite or out-of-range values are clamped.
    pub fn set_control_inputs(&mut self, inputs: ControlInputs) {
        self.inputs = inputs.sanitized();
    }

    /// Horizontal speed (m/s)
    pub fn speed(&self) -> f64 {
        planar_length(self.velocity)
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed() * MPS_TO_KMH
    }

    /// Unit forward direction
    pub fn heading(&self) -> Vec3 {
        heading(self.orientation)
    }

    /// Advance the car by `dt` seconds and return the resulting speed.
    ///
    /// The step is a pure function of (state, inputs, dt, config). A `dt` that
    /// is not a positive finite number changes nothing, and a step that would
    /// produce a non-finite value is discarded so the last valid state stays.
    pub fn advance(&mut self, dt: f64, config: &VehicleConfig) -> f64 {
        if !dt.is_finite() || dt <= 0.0 {
            return self.speed();
        }

        let steering = self.inputs.steering();
        let throttle = self.inputs.throttle();

        let orientation = wrap_yaw(self.orientation + steering * config.turn_rate * dt);
        let forward = heading(orientation);

        let (mut position, mut velocity) = match config.model {
            MotionModel::Instant => {
                let velocity = scale(forward, throttle * config.move_speed);
                (add(self.position, scale(velocity, dt)), velocity)
            }
            MotionModel::Momentum => {
                let mut velocity = add(
                    self.velocity,
                    scale(forward, throttle * config.acceleration * dt),
                );
                let speed = planar_length(velocity);
                if speed > config.max_speed {
                    velocity = scale(velocity, config.max_speed / speed);
                }
                velocity = scale(velocity, config.friction);
                (add(self.position, scale(velocity, dt)), velocity)
            }
        };

        if let Some(track) = &config.track {
            clamp_to_track(&mut position, &mut velocity, track);
        }

        if !(orientation.is_finite() && position.is_finite() && velocity.is_finite()) {
            return self.speed();
        }

        self.orientation = orientation;
        self.position = position;
        self.velocity = velocity;
        self.speed()
    }
}

/// Wrap a yaw into [0, 2π). `rem_euclid` rounds tiny negative angles up to
/// exactly 2π, which is folded back to 0.
fn wrap_yaw(yaw: f64) -> f64 {
    let wrapped = yaw.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Keep the car on the track; the velocity component pushing outwards is dropped.
fn clamp_to_track(position: &mut Vec3, velocity: &mut Vec3, track: &TrackBounds) {
    if position.x > track.half_width {
        position.x = track.half_width;
        velocity.x = velocity.x.min(0.0);
    } else if position.x < -track.half_width {
        position.x = -track.half_width;
        velocity.x = velocity.x.max(0.0);
    }

    if position.z > track.half_length {
        position.z = track.half_length;
        velocity.z = velocity.z.min(0.0);
    } else if position.z < -track.half_length {
        position.z = -track.half_length;
        velocity.z = velocity.z.max(0.0);
    }
}

impl Replicable for VehicleState {
    type Snapshot = VehicleSnapshot;

    fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            position: self.position.to_array(),
            orientation: self.orientation,
            velocity: self.velocity.to_array(),
            color: self.color,
        }
    }

    /// Inputs are kept: they are owned locally, not replicated.
    fn apply_snapshot(&mut self, snapshot: VehicleSnapshot) {
        self.position = Vec3::from_array(snapshot.position);
        self.orientation = snapshot.orientation;
        self.velocity = Vec3::from_array(snapshot.velocity);
        self.color = snapshot.color;
    }
}

impl From<VehicleSnapshot> for VehicleState {
    fn from(snapshot: VehicleSnapshot) -> Self {
        let mut vehicle = VehicleState::new(Vec3::ZERO, 0.0, snapshot.color);
        vehicle.apply_snapshot(snapshot);
        vehicle
    }
}
