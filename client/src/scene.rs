use std::collections::HashMap;

use driving_shared::color::color_hex;
use driving_shared::vec3::Vec3;

/// The slice of a 3D scene the presentation bridge drives. A renderer backend
/// implements this; the simulation never sees it.
pub trait Scene {
    type Handle: Copy + Eq;

    fn spawn_car(&mut self, color: u32) -> Self::Handle;
    fn set_car_pose(&mut self, handle: Self::Handle, position: Vec3, yaw: f64);
    fn despawn_car(&mut self, handle: Self::Handle);
    fn set_camera(&mut self, position: Vec3, look_at: Vec3);
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarRecord {
    pub color: u32,
    pub position: Vec3,
    pub yaw: f64,
}

/// Scene without a renderer. Keeps the latest pose of every car and the
/// camera, for the headless client and for tests.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    cars: HashMap<u32, CarRecord>,
    next_handle: u32,
    pub camera_position: Vec3,
    pub camera_look_at: Vec3,
}

impl HeadlessScene {
    pub fn car(&self, handle: u32) -> Option<&CarRecord> {
        self.cars.get(&handle)
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn cars(&self) -> impl Iterator<Item = &CarRecord> {
        self.cars.values()
    }
}

impl Scene for HeadlessScene {
    type Handle = u32;

    fn spawn_car(&mut self, color: u32) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        tracing::debug!(handle, color = %color_hex(color), "car spawned");
        self.cars.insert(
            handle,
            CarRecord {
                color,
                position: Vec3::ZERO,
                yaw: 0.0,
            },
        );
        handle
    }

    fn set_car_pose(&mut self, handle: u32, position: Vec3, yaw: f64) {
        if let Some(car) = self.cars.get_mut(&handle) {
            car.position = position;
            car.yaw = yaw;
        }
    }

    fn despawn_car(&mut self, handle: u32) {
        self.cars.remove(&handle);
    }

    fn set_camera(&mut self, position: Vec3, look_at: Vec3) {
        self.camera_position = position;
        self.camera_look_at = look_at;
    }
}
