use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::color::color_from_index;
use crate::config::VehicleConfig;
use crate::controls::ControlInputs;
use crate::replica::{ParticipantVehicle, Replicable, WorldSnapshot};
use crate::vehicle::VehicleState;

/// Identity of a connected participant, assigned by the session layer.
pub type ParticipantId = u32;

/// Every participant's car, advanced together once per tick.
///
/// The world never performs I/O. Membership changes, control inputs and ticks
/// are fed in by the session layer in one agreed order, and every replica that
/// applies the same order ends up in the same state.
#[derive(Debug, Clone)]
pub struct WorldSimulation {
    config: VehicleConfig,
    participants: BTreeMap<ParticipantId, VehicleState>,
    seed: u32,
    /// Number of vehicles ever spawned; selects the spawn point and color.
    spawn_count: u64,
    tick_count: u64,
}

impl WorldSimulation {
    pub fn new(config: VehicleConfig, seed: u32) -> Self {
        Self {
            config,
            participants: BTreeMap::new(),
            seed,
            spawn_count: 0,
            tick_count: 0,
        }
    }

    /// Rebuild a world from a snapshot taken on another replica.
    pub fn from_snapshot(config: VehicleConfig, snapshot: WorldSnapshot) -> Self {
        let mut world = Self::new(config, snapshot.seed);
        world.apply_snapshot(snapshot);
        world
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Add a car for `id`. Joining twice is idempotent: the existing car is
    /// kept and `false` is returned.
    pub fn add_participant(&mut self, id: ParticipantId) -> bool {
        if self.participants.contains_key(&id) {
            return false;
        }

        let index = self.spawn_count;
        self.spawn_count += 1;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed as u64);
        rng.set_stream(index);
        let vehicle = VehicleState::spawn(&mut rng, &self.config, color_from_index(index));

        self.participants.insert(id, vehicle);
        true
    }

    /// Remove the car for `id`, if any.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<VehicleState> {
        self.participants.remove(&id)
    }

    /// Set inputs on `id`'s car. Returns false when `id` is not playing.
    pub fn set_control_inputs(&mut self, id: ParticipantId, inputs: ControlInputs) -> bool {
        match self.participants.get_mut(&id) {
            Some(vehicle) => {
                vehicle.set_control_inputs(inputs);
                true
            }
            None => false,
        }
    }

    /// Advance every car by `dt` seconds. Cars do not interact, so the
    /// iteration order has no effect on the result.
    pub fn tick(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        for vehicle in self.participants.values_mut() {
            vehicle.advance(dt, &self.config);
        }
        self.tick_count += 1;
    }

    pub fn participants(&self) -> impl Iterator<Item = (ParticipantId, &VehicleState)> {
        self.participants.iter().map(|(id, v)| (*id, v))
    }

    pub fn get(&self, id: ParticipantId) -> Option<&VehicleState> {
        self.participants.get(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// FNV-1a over every replicated field. Equal hashes on two replicas at the
    /// same point of the event stream mean they have not diverged.
    pub fn state_hash(&self) -> u64 {
        let mut hash = Fnv1a::new();
        hash.write_u64(self.seed as u64);
        hash.write_u64(self.spawn_count);
        hash.write_u64(self.tick_count);
        for (id, vehicle) in &self.participants {
            hash.write_u64(*id as u64);
            hash.write_f64(vehicle.position.x);
            hash.write_f64(vehicle.position.y);
            hash.write_f64(vehicle.position.z);
            hash.write_f64(vehicle.orientation);
            hash.write_f64(vehicle.velocity.x);
            hash.write_f64(vehicle.velocity.y);
            hash.write_f64(vehicle.velocity.z);
            hash.write_u64(vehicle.color() as u64);
        }
        hash.finish()
    }
}

impl Replicable for WorldSimulation {
    type Snapshot = WorldSnapshot;

    fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            seed: self.seed,
            spawn_count: self.spawn_count,
            tick_count: self.tick_count,
            vehicles: self
                .participants
                .iter()
                .map(|(id, v)| ParticipantVehicle {
                    id: *id,
                    vehicle: v.snapshot(),
                })
                .collect(),
        }
    }

    /// Replaces all membership. Control inputs start released on every car.
    fn apply_snapshot(&mut self, snapshot: WorldSnapshot) {
        self.seed = snapshot.seed;
        self.spawn_count = snapshot.spawn_count;
        self.tick_count = snapshot.tick_count;
        self.participants = snapshot
            .vehicles
            .into_iter()
            .map(|p| (p.id, VehicleState::from(p.vehicle)))
            .collect();
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write_u64(&mut self, v: u64) {
        for byte in v.to_le_bytes() {
            self.0 ^= byte as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldSimulation {
        WorldSimulation::new(VehicleConfig::default(), 12345)
    }

    fn accelerate() -> ControlInputs {
        ControlInputs {
            accelerate: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn join_creates_one_vehicle_per_participant() {
        let mut w = world();
        assert!(w.add_participant(1));
        assert!(w.add_participant(2));
        assert_eq!(w.len(), 2);
        assert!(w.contains(1));
        assert!(w.contains(2));
    }

    #[test]
    fn duplicate_join_keeps_existing_vehicle() {
        let mut w = world();
        w.add_participant(1);
        w.set_control_inputs(1, accelerate());
        w.tick(0.5);
        let before = w.get(1).unwrap().clone();

        assert!(!w.add_participant(1));
        assert_eq!(w.len(), 1);
        assert_eq!(w.get(1).unwrap(), &before);
    }

    #[test]
    fn leave_of_unknown_participant_is_a_no_op() {
        let mut w = world();
        w.add_participant(1);
        assert!(w.remove_participant(42).is_none());
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn inputs_for_missing_participant_are_ignored() {
        let mut w = world();
        assert!(!w.set_control_inputs(7, accelerate()));
        assert!(w.is_empty());
    }

    #[test]
    fn join_leave_round_trip_gives_fresh_vehicle() {
        let mut w = world();
        w.add_participant(1);
        w.set_control_inputs(1, ControlInputs::from_keys(true, false, true, false));
        for _ in 0..30 {
            w.tick(0.1);
        }
        let old = w.remove_participant(1).unwrap();
        assert!(!w.contains(1));
        assert!(old.speed() > 0.0);

        assert!(w.add_participant(1));
        let fresh = w.get(1).unwrap();
        assert_eq!(fresh.speed(), 0.0);
        assert_eq!(fresh.orientation, 0.0);
        assert!(fresh.inputs().is_idle());
        assert_ne!(fresh.color(), old.color());
    }

    #[test]
    fn empty_world_tick_changes_nothing_but_the_clock() {
        let mut w = world();
        let before = w.snapshot();
        w.tick(1.0);
        assert!(w.is_empty());
        assert_eq!(w.snapshot().vehicles, before.vehicles);
    }

    #[test]
    fn invalid_dt_does_not_tick() {
        let mut w = world();
        w.add_participant(1);
        w.set_control_inputs(1, accelerate());
        let hash = w.state_hash();
        for dt in [0.0, -0.016, f64::NAN, f64::INFINITY] {
            w.tick(dt);
        }
        assert_eq!(w.state_hash(), hash);
        assert_eq!(w.tick_count(), 0);
    }

    #[test]
    fn participant_one_accelerates_to_the_cap() {
        let mut w = world();
        w.add_participant(1);
        w.set_control_inputs(1, accelerate());

        let mut speeds = Vec::new();
        for _ in 0..3 {
            w.tick(1.0);
            speeds.push(w.get(1).unwrap().speed());
        }

        assert!((speeds[0] - 19.0).abs() < 1e-9);
        assert!((speeds[1] - 28.5).abs() < 1e-9);
        assert!((speeds[2] - 28.5).abs() < 1e-9);
        assert!(speeds.iter().all(|s| *s <= 30.0 + 1e-9));
    }

    #[test]
    fn replicas_fed_the_same_events_agree() {
        let run = || {
            let mut w = world();
            w.add_participant(3);
            w.add_participant(1);
            w.set_control_inputs(3, ControlInputs::from_keys(true, false, true, false));
            for i in 0..120 {
                if i == 40 {
                    w.add_participant(2);
                    w.set_control_inputs(2, ControlInputs::from_keys(false, true, false, true));
                }
                if i == 80 {
                    w.remove_participant(1);
                }
                w.tick(0.016 + (i % 3) as f64 * 0.001);
            }
            w.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn spawns_depend_only_on_seed_and_join_order() {
        let mut a = world();
        let mut b = world();
        a.add_participant(10);
        b.add_participant(99);
        assert_eq!(
            a.get(10).unwrap().position,
            b.get(99).unwrap().position
        );

        let mut c = WorldSimulation::new(VehicleConfig::default(), 54321);
        c.add_participant(10);
        assert_ne!(a.get(10).unwrap().position, c.get(10).unwrap().position);
    }

    #[test]
    fn snapshot_replica_continues_identically() {
        let mut original = world();
        original.add_participant(1);
        original.add_participant(2);
        original.set_control_inputs(1, accelerate());
        for _ in 0..25 {
            original.tick(0.02);
        }

        let mut replica = WorldSimulation::from_snapshot(
            *original.config(),
            original.snapshot(),
        );
        assert_eq!(replica.state_hash(), original.state_hash());

        // Inputs travel separately from the snapshot.
        replica.set_control_inputs(1, accelerate());
        for _ in 0..25 {
            original.tick(0.02);
            replica.tick(0.02);
        }
        assert_eq!(replica.state_hash(), original.state_hash());

        // Later spawns also line up.
        original.add_participant(3);
        replica.add_participant(3);
        assert_eq!(replica.state_hash(), original.state_hash());
    }

    #[test]
    fn snapshot_survives_json() {
        let mut w = world();
        w.add_participant(1);
        w.set_control_inputs(1, ControlInputs::from_keys(true, false, false, true));
        for _ in 0..17 {
            w.tick(1.0 / 60.0);
        }

        let json = serde_json::to_string(&w.snapshot()).unwrap();
        let parsed: WorldSnapshot = serde_json::from_str(&json).unwrap();
        let replica = WorldSimulation::from_snapshot(*w.config(), parsed);
        assert_eq!(replica.state_hash(), w.state_hash());
    }

    #[test]
    fn hash_changes_when_a_car_moves() {
        let mut w = world();
        w.add_participant(1);
        let idle = w.state_hash();
        w.set_control_inputs(1, accelerate());
        w.tick(0.1);
        assert_ne!(w.state_hash(), idle);
    }
}
