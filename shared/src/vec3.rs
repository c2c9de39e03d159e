/// 3D vector utilities for the driving world.
/// Y is up; vehicles move on the XZ ground plane.

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Scale vector by scalar
pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Length of the ground-plane (XZ) component.
pub fn planar_length(v: Vec3) -> f64 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Linear interpolation, t=0 returns a, t=1 returns b.
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    Vec3::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

/// Unit forward direction on the ground plane for a yaw angle.
/// Yaw 0 faces +Z, positive yaw turns towards +X.
pub fn heading(yaw: f64) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Rotate a vector around the Y axis by yaw, same convention as `heading`.
pub fn rotate_y(v: Vec3, yaw: f64) -> Vec3 {
    let (s, c) = yaw.sin_cos();
    Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
    }

    #[test]
    fn heading_zero_faces_positive_z() {
        assert!(approx(heading(0.0), Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn heading_quarter_turn_faces_positive_x() {
        assert!(approx(
            heading(std::f64::consts::FRAC_PI_2),
            Vec3::new(1.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn rotate_y_matches_heading() {
        for i in 0..16 {
            let yaw = i as f64 * 0.4;
            assert!(approx(rotate_y(Vec3::new(0.0, 0.0, 1.0), yaw), heading(yaw)));
        }
    }

    #[test]
    fn planar_length_ignores_y() {
        assert_eq!(planar_length(Vec3::new(3.0, 100.0, 4.0)), 5.0);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-1.0, 0.0, 7.0);
        assert!(approx(lerp(a, b, 0.0), a));
        assert!(approx(lerp(a, b, 1.0), b));
        assert!(approx(lerp(a, b, 0.5), Vec3::new(0.0, 1.0, 5.0)));
    }

    #[test]
    fn non_finite_detected() {
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f64::INFINITY, 0.0).is_finite());
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
    }
}
