/// Control inputs for one vehicle.
///
/// Each field is a press magnitude where 0 is released and 1 is fully pressed.
/// Inputs are owned by the participant driving the vehicle and reach other
/// replicas only as session events; they are never part of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ControlInputs {
    #[serde(default)]
    pub accelerate: f64,
    #[serde(default)]
    pub brake: f64,
    #[serde(default)]
    pub steer_left: f64,
    #[serde(default)]
    pub steer_right: f64,
}

impl ControlInputs {
    /// Map digital buttons (keyboard, touch) to inputs.
    pub fn from_keys(forward: bool, backward: bool, left: bool, right: bool) -> Self {
        let on = |pressed: bool| if pressed { 1.0 } else { 0.0 };
        Self {
            accelerate: on(forward),
            brake: on(backward),
            steer_left: on(left),
            steer_right: on(right),
        }
    }

    /// Same inputs with every field finite and within [0, 1].
    pub fn sanitized(self) -> Self {
        Self {
            accelerate: unit(self.accelerate),
            brake: unit(self.brake),
            steer_left: unit(self.steer_left),
            steer_right: unit(self.steer_right),
        }
    }

    /// Signed steering in [-1, 1], left positive.
    pub fn steering(&self) -> f64 {
        (unit(self.steer_left) - unit(self.steer_right)).clamp(-1.0, 1.0)
    }

    /// Signed throttle in [-1, 1], forward positive.
    pub fn throttle(&self) -> f64 {
        (unit(self.accelerate) - unit(self.brake)).clamp(-1.0, 1.0)
    }

    pub fn is_idle(&self) -> bool {
        self.steering() == 0.0 && self.throttle() == 0.0
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_signed_signals() {
        let inputs = ControlInputs::from_keys(true, false, true, false);
        assert_eq!(inputs.throttle(), 1.0);
        assert_eq!(inputs.steering(), 1.0);

        let inputs = ControlInputs::from_keys(false, true, false, true);
        assert_eq!(inputs.throttle(), -1.0);
        assert_eq!(inputs.steering(), -1.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let inputs = ControlInputs::from_keys(true, true, true, true);
        assert!(inputs.is_idle());
    }

    #[test]
    fn steering_stays_bounded_for_raw_magnitudes() {
        for raw in [-1e9, -3.0, -0.5, 0.0, 0.25, 1.0, 7.5, 1e12] {
            let inputs = ControlInputs {
                steer_left: raw,
                steer_right: -raw,
                accelerate: raw,
                brake: -raw,
            };
            assert!((-1.0..=1.0).contains(&inputs.steering()), "raw {}", raw);
            assert!((-1.0..=1.0).contains(&inputs.throttle()), "raw {}", raw);
        }
    }

    #[test]
    fn non_finite_inputs_are_ignored() {
        let inputs = ControlInputs {
            accelerate: f64::NAN,
            brake: f64::INFINITY,
            steer_left: f64::NEG_INFINITY,
            steer_right: 0.5,
        };
        assert_eq!(inputs.throttle(), 0.0);
        assert_eq!(inputs.steering(), -0.5);

        let clean = inputs.sanitized();
        assert_eq!(clean.accelerate, 0.0);
        assert_eq!(clean.brake, 0.0);
        assert_eq!(clean.steer_left, 0.0);
        assert_eq!(clean.steer_right, 0.5);
    }

    #[test]
    fn missing_fields_default_to_released() {
        let inputs: ControlInputs = serde_json::from_str(r#"{"accelerate":1.0}"#).unwrap();
        assert_eq!(inputs.accelerate, 1.0);
        assert_eq!(inputs.brake, 0.0);
        assert_eq!(inputs.steering(), 0.0);
    }
}
