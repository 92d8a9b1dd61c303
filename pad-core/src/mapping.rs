//! Button, D-pad and pressure remapping.

use pad_proto::{AnalogButton, Buttons, Dpad, InboundSnapshot};

use crate::profile::ProfileRecord;

/// Remap table built from a profile.
///
/// Each logical input maps to an arbitrary output mask. Two inputs mapped
/// onto the same output are OR-ed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMap {
    buttons: [Buttons; 12],
    up: Dpad,
    down: Dpad,
    left: Dpad,
    right: Dpad,
    analog_offsets: [u8; AnalogButton::COUNT],
}

impl ButtonMap {
    /// One-to-one mapping.
    pub const IDENTITY: Self = Self::from_profile(&ProfileRecord::DEFAULT);

    /// Build the table from a profile's remap fields.
    #[must_use]
    pub const fn from_profile(profile: &ProfileRecord) -> Self {
        Self {
            buttons: profile.buttons,
            up: profile.dpad_up,
            down: profile.dpad_down,
            left: profile.dpad_left,
            right: profile.dpad_right,
            analog_offsets: profile.analog_offsets,
        }
    }

    /// Output mask for a single logical button.
    #[must_use]
    pub fn button(&self, button: Buttons) -> Buttons {
        Buttons::ALL
            .iter()
            .zip(self.buttons.iter())
            .filter(|(input, _)| button.contains(**input))
            .fold(Buttons::NONE, |acc, (_, &output)| acc | output)
    }

    /// Output D-pad for an input direction. Diagonals map to the OR of
    /// their mapped cardinals.
    #[must_use]
    pub fn dpad(&self, dpad: Dpad) -> Dpad {
        let mut out = Dpad::NONE;
        for (input, output) in [
            (Dpad::UP, self.up),
            (Dpad::DOWN, self.down),
            (Dpad::LEFT, self.left),
            (Dpad::RIGHT, self.right),
        ] {
            if dpad.contains(input) {
                out |= output;
            }
        }
        out.normalized()
    }

    /// Apply the table to buttons, D-pad and the pressure array.
    ///
    /// Pressure values whose target offset falls outside the array are
    /// dropped; colliding offsets keep the larger value.
    #[must_use]
    pub fn remap(&self, pad: &InboundSnapshot) -> InboundSnapshot {
        let mut analog = [0u8; AnalogButton::COUNT];
        for (value, &offset) in pad.analog.iter().zip(self.analog_offsets.iter()) {
            if let Some(slot) = analog.get_mut(usize::from(offset)) {
                *slot = (*slot).max(*value);
            }
        }

        InboundSnapshot {
            dpad: self.dpad(pad.dpad),
            buttons: self.button(pad.buttons),
            analog,
            ..*pad
        }
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let mut pad = InboundSnapshot::neutral();
        pad.buttons = Buttons::A | Buttons::RB | Buttons::MISC;
        pad.dpad = Dpad::DOWN_LEFT;
        pad.analog = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        pad.trigger_l = 77;
        assert_eq!(ButtonMap::IDENTITY.remap(&pad), pad);
    }

    #[test]
    fn test_swap_buttons() {
        let mut profile = ProfileRecord::DEFAULT;
        profile.buttons[0] = Buttons::B;
        profile.buttons[1] = Buttons::A;
        let map = ButtonMap::from_profile(&profile);
        assert_eq!(map.button(Buttons::A), Buttons::B);
        assert_eq!(map.button(Buttons::A | Buttons::X), Buttons::B | Buttons::X);
    }

    #[test]
    fn test_aliasing_ors_outputs() {
        let mut profile = ProfileRecord::DEFAULT;
        profile.buttons[2] = Buttons::A; // X -> A
        let map = ButtonMap::from_profile(&profile);
        assert_eq!(map.button(Buttons::X), Buttons::A);
        assert_eq!(map.button(Buttons::A | Buttons::X), Buttons::A);
        assert_eq!(map.button(Buttons::Y), Buttons::Y);
    }

    #[test]
    fn test_dpad_diagonal_follows_cardinals() {
        let mut profile = ProfileRecord::DEFAULT;
        profile.dpad_up = Dpad::DOWN;
        profile.dpad_down = Dpad::UP;
        let map = ButtonMap::from_profile(&profile);
        assert_eq!(map.dpad(Dpad::UP), Dpad::DOWN);
        assert_eq!(map.dpad(Dpad::UP_LEFT), Dpad::DOWN_LEFT);
        assert_eq!(map.dpad(Dpad::NONE), Dpad::NONE);
    }

    #[test]
    fn test_dpad_collision_cancels() {
        let mut profile = ProfileRecord::DEFAULT;
        profile.dpad_right = Dpad::LEFT;
        profile.dpad_left = Dpad::RIGHT;
        profile.dpad_up = Dpad::RIGHT;
        let map = ButtonMap::from_profile(&profile);
        // up -> right, left -> right: both land on right
        assert_eq!(map.dpad(Dpad::UP_LEFT), Dpad::RIGHT);
    }

    #[test]
    fn test_analog_offsets() {
        let mut profile = ProfileRecord::DEFAULT;
        profile.analog_offsets[AnalogButton::A.index()] = AnalogButton::B.index() as u8;
        profile.analog_offsets[AnalogButton::B.index()] = AnalogButton::A.index() as u8;
        profile.analog_offsets[AnalogButton::Up.index()] = 42;
        let map = ButtonMap::from_profile(&profile);

        let mut pad = InboundSnapshot::neutral();
        pad.analog[AnalogButton::A.index()] = 200;
        pad.analog[AnalogButton::B.index()] = 10;
        pad.analog[AnalogButton::Up.index()] = 99;
        let out = map.remap(&pad);
        assert_eq!(out.analog_value(AnalogButton::B), 200);
        assert_eq!(out.analog_value(AnalogButton::A), 10);
        assert_eq!(out.analog_value(AnalogButton::Up), 0);
    }
}
