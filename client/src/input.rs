use driving_shared::ControlInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
}

/// Key names as reported by browser keyboard events.
pub fn control_for_key(key: &str) -> Option<Control> {
    match key {
        "w" | "W" | "ArrowUp" => Some(Control::Forward),
        "s" | "S" | "ArrowDown" => Some(Control::Backward),
        "a" | "A" | "ArrowLeft" => Some(Control::Left),
        "d" | "D" | "ArrowRight" => Some(Control::Right),
        _ => None,
    }
}

/// Pressed state of the four driving controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub fn set(&mut self, control: Control, pressed: bool) {
        match control {
            Control::Forward => self.forward = pressed,
            Control::Backward => self.backward = pressed,
            Control::Left => self.left = pressed,
            Control::Right => self.right = pressed,
        }
    }

    /// Returns false for keys that are not bound.
    pub fn key_down(&mut self, key: &str) -> bool {
        self.key(key, true)
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        self.key(key, false)
    }

    fn key(&mut self, key: &str, pressed: bool) -> bool {
        match control_for_key(key) {
            Some(control) => {
                self.set(control, pressed);
                true
            }
            None => false,
        }
    }

    /// Touch buttons lose their press when the pointer leaves them, and the
    /// window losing focus releases everything.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    pub fn to_inputs(&self) -> ControlInputs {
        ControlInputs::from_keys(self.forward, self.backward, self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_and_arrows_share_controls() {
        assert_eq!(control_for_key("w"), Some(Control::Forward));
        assert_eq!(control_for_key("ArrowUp"), Some(Control::Forward));
        assert_eq!(control_for_key("s"), Some(Control::Backward));
        assert_eq!(control_for_key("ArrowDown"), Some(Control::Backward));
        assert_eq!(control_for_key("a"), Some(Control::Left));
        assert_eq!(control_for_key("ArrowLeft"), Some(Control::Left));
        assert_eq!(control_for_key("d"), Some(Control::Right));
        assert_eq!(control_for_key("ArrowRight"), Some(Control::Right));
        assert_eq!(control_for_key("q"), None);
    }

    #[test]
    fn press_and_release_drive_inputs() {
        let mut state = InputState::default();
        assert!(state.key_down("w"));
        assert!(state.key_down("ArrowLeft"));
        let inputs = state.to_inputs();
        assert_eq!(inputs.throttle(), 1.0);
        assert_eq!(inputs.steering(), 1.0);

        assert!(state.key_up("w"));
        assert_eq!(state.to_inputs().throttle(), 0.0);
    }

    #[test]
    fn unbound_keys_change_nothing() {
        let mut state = InputState::default();
        assert!(!state.key_down("Space"));
        assert_eq!(state, InputState::default());
    }

    #[test]
    fn release_all_idles_the_car() {
        let mut state = InputState::default();
        state.key_down("d");
        state.key_down("s");
        state.release_all();
        assert!(state.to_inputs().is_idle());
    }
}
