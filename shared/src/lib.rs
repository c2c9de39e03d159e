//! Deterministic core of the multiplayer driving demo.
//!
//! Every client runs its own copy of [`world::WorldSimulation`] and feeds it
//! the same ordered session events, so all copies compute the same cars.

pub mod color;
pub mod config;
pub mod controls;
pub mod protocol;
pub mod replica;
pub mod vec3;
pub mod vehicle;
pub mod world;

pub use config::{MotionModel, TrackBounds, VehicleConfig};
pub use controls::ControlInputs;
pub use replica::Replicable;
pub use vehicle::VehicleState;
pub use world::{ParticipantId, WorldSimulation};
