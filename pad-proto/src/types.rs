//! Canonical gamepad types: Buttons, Dpad, AnalogStick, snapshots.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state represented as a bitfield.
///
/// Twelve logical buttons, independent of any console's own bit order.
/// Implements bitwise operators for ergonomic button manipulation.
///
/// # Example
///
/// ```
/// use pad_proto::Buttons;
///
/// let buttons = Buttons::A | Buttons::B;
/// assert!(buttons.contains(Buttons::A));
/// assert!(buttons.contains(Buttons::B));
/// assert!(!buttons.contains(Buttons::X));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const L3: Self = Self(1 << 4); // Left stick press
    pub const R3: Self = Self(1 << 5); // Right stick press
    pub const BACK: Self = Self(1 << 6); // Select/Back
    pub const START: Self = Self(1 << 7);
    pub const LB: Self = Self(1 << 8); // Left bumper
    pub const RB: Self = Self(1 << 9); // Right bumper
    pub const SYS: Self = Self(1 << 10); // Guide/Home/PS
    pub const MISC: Self = Self(1 << 11); // Share/Capture/Touchpad

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// All logical buttons, in bit order.
    pub const ALL: [Self; 12] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::L3,
        Self::R3,
        Self::BACK,
        Self::START,
        Self::LB,
        Self::RB,
        Self::SYS,
        Self::MISC,
    ];

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if the given button is pressed (alias for contains).
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Buttons) -> bool {
        self.contains(button)
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// D-pad direction as up to four combinable cardinal bits.
///
/// Diagonals are the OR of their two cardinals. Opposing cardinals
/// (up+down, left+right) are not legal values; use
/// [`Dpad::from_directions`] or [`Dpad::normalized`] before storing.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dpad(pub u8);

impl Dpad {
    pub const NONE: Self = Self(0x00);
    pub const UP: Self = Self(0x01);
    pub const DOWN: Self = Self(0x02);
    pub const LEFT: Self = Self(0x04);
    pub const RIGHT: Self = Self(0x08);
    pub const UP_LEFT: Self = Self(Self::UP.0 | Self::LEFT.0);
    pub const UP_RIGHT: Self = Self(Self::UP.0 | Self::RIGHT.0);
    pub const DOWN_LEFT: Self = Self(Self::DOWN.0 | Self::LEFT.0);
    pub const DOWN_RIGHT: Self = Self(Self::DOWN.0 | Self::RIGHT.0);

    const MASK: u8 = 0x0F;

    /// Build a D-pad value from individual direction states.
    ///
    /// Opposing directions cancel each other out.
    #[must_use]
    pub const fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let mut bits = 0;
        if up != down {
            bits |= if up { Self::UP.0 } else { Self::DOWN.0 };
        }
        if left != right {
            bits |= if left { Self::LEFT.0 } else { Self::RIGHT.0 };
        }
        Self(bits)
    }

    /// Drop unknown bits and cancel opposing cardinals.
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self::from_directions(
            self.contains(Self::UP),
            self.contains(Self::DOWN),
            self.contains(Self::LEFT),
            self.contains(Self::RIGHT),
        )
    }

    /// True if this value satisfies the D-pad invariant.
    #[must_use]
    pub const fn is_normalized(self) -> bool {
        self.0 & !Self::MASK == 0
            && !(self.contains(Self::UP) && self.contains(Self::DOWN))
            && !(self.contains(Self::LEFT) && self.contains(Self::RIGHT))
    }

    /// Whether every direction in `dir` is held.
    #[inline]
    #[must_use]
    pub const fn contains(self, dir: Dpad) -> bool {
        dir.0 != 0 && (self.0 & dir.0) == dir.0
    }

    /// Raw direction bits.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl BitOr for Dpad {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Dpad {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Analog stick with X/Y axes.
///
/// Range: [-32768, 32767], center 0.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    /// Stick at `(x, y)`.
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const NEUTRAL: Self = Self { x: 0, y: 0 };
}

/// Index into the per-button pressure array ([`InboundSnapshot::analog`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AnalogButton {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    A = 4,
    B = 5,
    X = 6,
    Y = 7,
    Lb = 8,
    Rb = 9,
}

impl AnalogButton {
    pub const COUNT: usize = 10;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::Lb,
        Self::Rb,
    ];

    /// Offset into the pressure array.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Complete controller-to-host snapshot.
///
/// Produced by input adapters, consumed by output adapters and the
/// shaping engine.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InboundSnapshot {
    pub dpad: Dpad,
    pub buttons: Buttons,
    pub trigger_l: u8,
    pub trigger_r: u8,
    pub stick_l: AnalogStick,
    pub stick_r: AnalogStick,
    /// Per-button pressure values, indexed by [`AnalogButton`].
    pub analog: [u8; AnalogButton::COUNT],
}

impl InboundSnapshot {
    /// Create a zeroed/neutral snapshot (no buttons pressed, sticks centered).
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            dpad: Dpad::NONE,
            buttons: Buttons::NONE,
            trigger_l: 0,
            trigger_r: 0,
            stick_l: AnalogStick::NEUTRAL,
            stick_r: AnalogStick::NEUTRAL,
            analog: [0; AnalogButton::COUNT],
        }
    }

    /// Pressure reading for `button`.
    #[inline]
    #[must_use]
    pub const fn analog_value(&self, button: AnalogButton) -> u8 {
        self.analog[button.index()]
    }
}

/// Host-to-controller feedback snapshot.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutboundSnapshot {
    pub rumble_l: u8,
    pub rumble_r: u8,
}

impl OutboundSnapshot {
    /// Rumble off.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            rumble_l: 0,
            rumble_r: 0,
        }
    }
}

/// Chat-pad key triplet, as reported by controllers that carry one.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChatpadSnapshot(pub [u8; 3]);

impl ChatpadSnapshot {
    /// No keys held.
    #[must_use]
    pub const fn neutral() -> Self {
        Self([0; 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_bitwise_or() {
        let buttons = Buttons::A | Buttons::B;
        assert!(buttons.contains(Buttons::A));
        assert!(buttons.contains(Buttons::B));
        assert!(!buttons.contains(Buttons::X));
        assert_eq!(buttons.raw(), 0x0003);
    }

    #[test]
    fn test_buttons_set_clear() {
        let mut buttons = Buttons::NONE;
        buttons.set(Buttons::SYS, true);
        assert!(buttons.is_pressed(Buttons::SYS));
        buttons.set(Buttons::SYS, false);
        assert!(buttons.is_empty());
    }

    #[test]
    fn test_button_bits_are_distinct() {
        let all = Buttons::ALL.iter().fold(Buttons::NONE, |acc, &b| acc | b);
        assert_eq!(all.raw(), 0x0FFF);
    }

    #[test]
    fn test_dpad_diagonals_are_or_of_cardinals() {
        assert_eq!(Dpad::UP | Dpad::LEFT, Dpad::UP_LEFT);
        assert_eq!(Dpad::DOWN | Dpad::RIGHT, Dpad::DOWN_RIGHT);
        assert!(Dpad::UP_RIGHT.contains(Dpad::UP));
        assert!(Dpad::UP_RIGHT.contains(Dpad::RIGHT));
        assert!(!Dpad::UP_RIGHT.contains(Dpad::LEFT));
    }

    #[test]
    fn test_dpad_from_directions_cancels_opposites() {
        assert_eq!(Dpad::from_directions(true, true, false, false), Dpad::NONE);
        assert_eq!(Dpad::from_directions(true, false, true, true), Dpad::UP);
        assert_eq!(Dpad::from_directions(false, true, false, true), Dpad::DOWN_RIGHT);
    }

    #[test]
    fn test_dpad_normalized() {
        assert!(!Dpad(0x03).is_normalized());
        assert_eq!(Dpad(0x03).normalized(), Dpad::NONE);
        assert_eq!(Dpad(0x1D).normalized(), Dpad::UP);
        assert!(Dpad::DOWN_LEFT.is_normalized());
    }

    #[test]
    fn test_neutral_snapshots() {
        let pad = InboundSnapshot::neutral();
        assert_eq!(pad, InboundSnapshot::default());
        assert_eq!(pad.stick_l, AnalogStick::NEUTRAL);
        assert_eq!(OutboundSnapshot::neutral(), OutboundSnapshot::default());
    }
}
