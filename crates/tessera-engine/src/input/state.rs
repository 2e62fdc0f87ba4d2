use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState};

/// Current input state for the window.
///
/// Holds "is down" information and the pointer position. Per-frame
/// transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = m,

            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Releases are not delivered while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                if let Some((px, py)) = self.pointer_pos {
                    frame.pointer_delta.0 += x - px;
                    frame.pointer_delta.1 += y - py;
                }
                self.pointer_pos = Some((x, y));
            }

            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.keys_down.insert(key) {
                        frame.keys_pressed.insert(key);
                    }
                }
                KeyState::Released => {
                    if self.keys_down.remove(&key) {
                        frame.keys_released.insert(key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                MouseButtonState::Pressed => {
                    if self.buttons_down.insert(button) {
                        frame.buttons_pressed.insert(button);
                    }
                }
                MouseButtonState::Released => {
                    if self.buttons_down.remove(&button) {
                        frame.buttons_released.insert(button);
                    }
                }
            },

            InputEvent::MouseWheel(delta) => frame.wheel_lines += delta.lines_y(),
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;

    fn key(key: Key, state: KeyState) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            repeat: false,
        }
    }

    #[test]
    fn press_is_recorded_once_while_held() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::Space, KeyState::Pressed));
        f.clear();
        // Auto-repeat delivers another press without a release.
        s.apply_event(&mut f, key(Key::Space, KeyState::Pressed));

        assert!(s.key_down(Key::Space));
        assert!(f.keys_pressed.is_empty());
    }

    #[test]
    fn held_key_reports_pressed_across_frames() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::W, KeyState::Pressed));
        f.clear();

        // Held state outlives the frame that saw the press.
        assert!(s.key_down(Key::W));
        assert!(f.keys_pressed.is_empty());
        assert!(!s.key_down(Key::A));

        s.apply_event(&mut f, key(Key::W, KeyState::Released));
        assert!(!s.key_down(Key::W));
    }

    #[test]
    fn release_clears_down_state() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::Escape, KeyState::Pressed));
        s.apply_event(&mut f, key(Key::Escape, KeyState::Released));

        assert!(!s.key_down(Key::Escape));
        assert!(f.keys_pressed.contains(&Key::Escape));
        assert!(f.keys_released.contains(&Key::Escape));
    }

    #[test]
    fn focus_loss_drops_held_keys() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::W, KeyState::Pressed));
        s.apply_event(&mut f, InputEvent::Focused(false));

        assert!(s.keys_down.is_empty());
    }

    #[test]
    fn wheel_accumulates_in_lines() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 }));
        s.apply_event(&mut f, InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 0.0, y: 40.0 }));

        assert_eq!(f.wheel_lines, 2.0);
    }

    #[test]
    fn pointer_delta_starts_after_first_position() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, InputEvent::PointerMoved { x: 10.0, y: 10.0 });
        s.apply_event(&mut f, InputEvent::PointerMoved { x: 15.0, y: 7.0 });

        assert_eq!(f.pointer_delta, (5.0, -3.0));
    }
}
