/// How throttle turns into motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum MotionModel {
    /// Position moves directly with throttle, no momentum.
    Instant,
    /// Throttle accelerates a velocity that is capped and decays by friction.
    Momentum,
}

/// Rectangular drivable area centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TrackBounds {
    /// Half extent along X (meters)
    pub half_width: f64,
    /// Half extent along Z (meters)
    pub half_length: f64,
}

/// Vehicle tuning shared by every replica of a session.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct VehicleConfig {
    pub model: MotionModel,
    /// Yaw rate at full steering (rad/s)
    pub turn_rate: f64,
    /// Speed at full throttle in the instant model (m/s)
    pub move_speed: f64,
    /// Acceleration at full throttle in the momentum model (m/s^2)
    pub acceleration: f64,
    pub max_speed: f64,
    /// Velocity multiplier applied once per tick in the momentum model
    pub friction: f64,
    pub track: Option<TrackBounds>,
    /// Spawn points are drawn from [-spawn_extent, spawn_extent) on X and Z
    pub spawn_extent: f64,
    pub spawn_height: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            model: MotionModel::Momentum,
            turn_rate: 2.5,
            move_speed: 5.0,
            acceleration: 20.0,
            max_speed: 30.0,
            friction: 0.95,
            track: Some(TrackBounds {
                half_width: 100.0,
                half_length: 100.0,
            }),
            spawn_extent: 10.0,
            spawn_height: 0.4,
        }
    }
}

impl VehicleConfig {
    /// Tuning of the simpler variant: instant velocity, unbounded ground.
    pub fn instant() -> Self {
        Self {
            model: MotionModel::Instant,
            track: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.turn_rate.is_finite() || self.turn_rate < 0.0 {
            return Err("turn_rate must be finite and >= 0".to_string());
        }
        if !self.move_speed.is_finite() || self.move_speed < 0.0 {
            return Err("move_speed must be finite and >= 0".to_string());
        }
        if !self.acceleration.is_finite() || self.acceleration < 0.0 {
            return Err("acceleration must be finite and >= 0".to_string());
        }
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err("max_speed must be finite and > 0".to_string());
        }
        if !self.friction.is_finite() || self.friction <= 0.0 || self.friction > 1.0 {
            return Err("friction must be in (0, 1]".to_string());
        }
        if let Some(track) = &self.track {
            if !track.half_width.is_finite() || track.half_width <= 0.0 {
                return Err("track.half_width must be finite and > 0".to_string());
            }
            if !track.half_length.is_finite() || track.half_length <= 0.0 {
                return Err("track.half_length must be finite and > 0".to_string());
            }
            if self.spawn_extent > track.half_width.min(track.half_length) {
                return Err("spawn_extent must fit inside the track".to_string());
            }
        }
        if !self.spawn_extent.is_finite() || self.spawn_extent < 0.0 {
            return Err("spawn_extent must be finite and >= 0".to_string());
        }
        if !self.spawn_height.is_finite() {
            return Err("spawn_height must be finite".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vehicle_config_is_valid() {
        assert!(VehicleConfig::default().validate().is_ok());
    }

    #[test]
    fn instant_vehicle_config_is_valid() {
        let config = VehicleConfig::instant();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, MotionModel::Instant);
        assert!(config.track.is_none());
    }

    #[test]
    fn friction_above_one_invalid() {
        let config = VehicleConfig {
            friction: 1.2,
            ..VehicleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_max_speed_invalid() {
        let config = VehicleConfig {
            max_speed: f64::NAN,
            ..VehicleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn spawn_outside_track_invalid() {
        let config = VehicleConfig {
            spawn_extent: 150.0,
            ..VehicleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_uses_camel_case() {
        let json = serde_json::to_string(&VehicleConfig::default()).unwrap();
        assert!(json.contains("\"turnRate\":2.5"));
        assert!(json.contains("\"model\":\"momentum\""));
        assert!(json.contains("\"halfWidth\":100.0"));
    }
}
