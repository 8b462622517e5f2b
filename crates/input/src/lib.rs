//! Keyboard and mouse input, reduced to the logical driving actions.

use std::collections::HashSet;

/// Logical actions the simulation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    /// One-shot: triggers once per press.
    Fire,
}

impl Action {
    /// The four held drive actions.
    pub const DRIVE: [Action; 4] = [
        Action::Forward,
        Action::Backward,
        Action::TurnLeft,
        Action::TurnRight,
    ];

    /// Default keyboard binding (WASD plus arrow keys, Space fires).
    pub fn for_key(key: KeyCode) -> Option<Action> {
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => Some(Action::Forward),
            KeyCode::KeyS | KeyCode::ArrowDown => Some(Action::Backward),
            KeyCode::KeyA | KeyCode::ArrowLeft => Some(Action::TurnLeft),
            KeyCode::KeyD | KeyCode::ArrowRight => Some(Action::TurnRight),
            KeyCode::Space => Some(Action::Fire),
            _ => None,
        }
    }
}

/// Per-tick view of the logical actions. Taken once at the start of a tick so the
/// whole tick sees one consistent input state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub forward: bool,
    pub backward: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    /// Fire was triggered since the previous tick.
    pub fire: bool,
}

impl InputSnapshot {
    /// Snapshot with the given actions active.
    pub fn pressing(actions: &[Action]) -> Self {
        actions
            .iter()
            .fold(Self::default(), |snapshot, &action| snapshot.with(action, true))
    }

    pub fn with(mut self, action: Action, active: bool) -> Self {
        match action {
            Action::Forward => self.forward = active,
            Action::Backward => self.backward = active,
            Action::TurnLeft => self.turn_left = active,
            Action::TurnRight => self.turn_right = active,
            Action::Fire => self.fire = active,
        }
        self
    }

    pub fn is_active(&self, action: Action) -> bool {
        match action {
            Action::Forward => self.forward,
            Action::Backward => self.backward,
            Action::TurnLeft => self.turn_left,
            Action::TurnRight => self.turn_right,
            Action::Fire => self.fire,
        }
    }

    /// True when any of the four drive actions is held.
    pub fn any_drive_held(&self) -> bool {
        Action::DRIVE.iter().any(|&action| self.is_active(action))
    }
}

/// Manages raw device state between ticks.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,
    /// Mouse buttons currently held.
    mouse_held: HashSet<MouseButton>,
    /// Mouse buttons pressed this frame.
    mouse_pressed: HashSet<MouseButton>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call once the tick has consumed its snapshot.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process a mouse button event.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.mouse_held.contains(&button) {
                    self.mouse_pressed.insert(button);
                }
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    fn action_held(&self, action: Action) -> bool {
        self.keys_held
            .iter()
            .any(|&key| Action::for_key(key) == Some(action))
    }

    /// Check if fire was pressed this frame (bound key or left mouse button, one-shot per press).
    pub fn is_fire_pressed(&self) -> bool {
        self.mouse_pressed.contains(&MouseButton::Left)
            || self
                .keys_pressed
                .iter()
                .any(|&key| Action::for_key(key) == Some(Action::Fire))
    }

    /// Latest state of every logical action.
    pub fn snapshot(&self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            forward: self.action_held(Action::Forward),
            backward: self.action_held(Action::Backward),
            turn_left: self.action_held(Action::TurnLeft),
            turn_right: self.action_held(Action::TurnRight),
            fire: self.is_fire_pressed(),
        };
        if snapshot.fire {
            log::trace!("fire triggered");
        }
        snapshot
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_drive_actions() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        input.process_keyboard(KeyCode::ArrowLeft, ElementState::Pressed);
        let snapshot = input.snapshot();
        assert!(snapshot.forward && snapshot.turn_left);
        assert!(!snapshot.backward && !snapshot.turn_right && !snapshot.fire);
        assert!(snapshot.any_drive_held());

        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        input.process_keyboard(KeyCode::ArrowLeft, ElementState::Released);
        assert!(!input.snapshot().any_drive_held());
    }

    #[test]
    fn held_state_survives_begin_frame() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyS, ElementState::Pressed);
        input.begin_frame();
        assert!(input.snapshot().backward);
    }

    #[test]
    fn fire_is_one_shot_per_press() {
        let mut input = InputState::new();
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.snapshot().fire);
        input.begin_frame();
        // Still held, but no new press.
        assert!(!input.snapshot().fire);

        // Key repeat while held does not retrigger.
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.begin_frame();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        assert!(!input.snapshot().fire);
    }

    #[test]
    fn press_and_release_within_a_frame_still_fires() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Released);
        assert!(input.snapshot().fire);
        assert!(!input.is_key_held(KeyCode::Space));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyQ, ElementState::Pressed);
        assert_eq!(input.snapshot(), InputSnapshot::default());
        assert!(input.is_key_pressed(KeyCode::KeyQ));
    }

    #[test]
    fn pressing_builds_snapshot() {
        let snapshot = InputSnapshot::pressing(&[Action::Backward, Action::Fire]);
        assert!(snapshot.backward && snapshot.fire);
        assert!(snapshot.is_active(Action::Backward));
        assert!(!snapshot.is_active(Action::Forward));
        assert!(snapshot.any_drive_held());
        assert!(!InputSnapshot::pressing(&[Action::Fire]).any_drive_held());
    }
}
