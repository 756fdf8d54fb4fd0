//! Keyboard to movement-flag mapping.

use reef_engine::input::{InputState, Key};
use reef_scene::{InputFlag, INPUT_FLAG_COUNT};

/// Maps each movement flag to the keys that hold it on.
#[derive(Debug, Clone)]
pub struct FlagBindings {
    bindings: Vec<(Key, InputFlag)>,
}

impl Default for FlagBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Key::W, InputFlag::Forward),
                (Key::A, InputFlag::StrafeLeft),
                (Key::S, InputFlag::Back),
                (Key::D, InputFlag::StrafeRight),
                (Key::Space, InputFlag::Up),
                (Key::ShiftLeft, InputFlag::Down),
                (Key::ArrowLeft, InputFlag::YawLeft),
                (Key::ArrowRight, InputFlag::YawRight),
                (Key::ArrowUp, InputFlag::PitchUp),
                (Key::ArrowDown, InputFlag::PitchDown),
            ],
        }
    }
}

impl FlagBindings {
    pub fn bind(&mut self, key: Key, flag: InputFlag) {
        self.bindings.push((key, flag));
    }

    /// The per-frame input vector for the scene; always `INPUT_FLAG_COUNT` long.
    pub fn flags(&self, input: &InputState) -> Vec<bool> {
        let mut flags = vec![false; INPUT_FLAG_COUNT];
        for (key, flag) in &self.bindings {
            if input.key_down(*key) {
                flags[flag.index()] = true;
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_engine::input::{InputEvent, InputFrame, KeyState};

    fn press(state: &mut InputState, key: Key) {
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                repeat: false,
            },
        );
    }

    #[test]
    fn idle_keyboard_gives_all_false() {
        let flags = FlagBindings::default().flags(&InputState::default());
        assert_eq!(flags, vec![false; INPUT_FLAG_COUNT]);
    }

    #[test]
    fn held_keys_set_their_flags() {
        let mut state = InputState::default();
        press(&mut state, Key::W);
        press(&mut state, Key::D);
        press(&mut state, Key::Q);

        let flags = FlagBindings::default().flags(&state);
        assert!(flags[InputFlag::Forward.index()]);
        assert!(flags[InputFlag::StrafeRight.index()]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 2);
    }

    #[test]
    fn extra_binding_shares_a_flag() {
        let mut bindings = FlagBindings::default();
        bindings.bind(Key::ArrowUp, InputFlag::Forward);

        let mut state = InputState::default();
        press(&mut state, Key::ArrowUp);
        let flags = bindings.flags(&state);
        assert!(flags[InputFlag::Forward.index()]);
        assert!(flags[InputFlag::PitchUp.index()]);
    }
}
