//! Analog shaping engine.
//!
//! Deadzones, anti-deadzones, axis and angle restriction, diagonal
//! compensation and response curves for sticks and triggers, computed in
//! [`Fix16`](crate::fix16::Fix16) so results are identical on every build.
//!
//! The free functions [`shape_stick`] and [`shape_trigger`] are pure. A
//! [`Shaper`] owns the derived [`ShapingProfile`] and re-derives it only for
//! channels whose stored settings changed; a [`PadMapper`] combines it with
//! the button remap table.
//!
//! # Example
//!
//! ```
//! use pad_core::profile::ProfileRecord;
//! use pad_core::shaping::{shape_trigger, Shaper, Side};
//!
//! let mut shaper = Shaper::new();
//! shaper.apply(&ProfileRecord::DEFAULT);
//! assert_eq!(shape_trigger(255, Side::Left, shaper.profile()), 255);
//! ```

mod stick;
mod trigger;

pub use stick::StickSettings;
pub use trigger::TriggerSettings;

use pad_proto::{range, AnalogStick, InboundSnapshot};

use crate::mapping::ButtonMap;
use crate::profile::{ProfileRecord, StickSettingsRaw, TriggerSettingsRaw};

/// Which stick or trigger a sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

/// Derived settings for one channel plus whether shaping applies to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel<T> {
    pub settings: T,
    /// False while the stored settings equal the defaults; the channel then
    /// passes samples through untouched.
    pub enabled: bool,
}

/// Working shaping parameters for both sticks and both triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShapingProfile {
    pub stick_l: Channel<StickSettings>,
    pub stick_r: Channel<StickSettings>,
    pub trigger_l: Channel<TriggerSettings>,
    pub trigger_r: Channel<TriggerSettings>,
}

impl ShapingProfile {
    /// Derive every channel from a stored record.
    #[must_use]
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            stick_l: stick_channel(&record.stick_l),
            stick_r: stick_channel(&record.stick_r),
            trigger_l: trigger_channel(&record.trigger_l),
            trigger_r: trigger_channel(&record.trigger_r),
        }
    }

    /// The stick channel for `side`.
    #[must_use]
    pub fn stick(&self, side: Side) -> &Channel<StickSettings> {
        match side {
            Side::Left => &self.stick_l,
            Side::Right => &self.stick_r,
        }
    }

    /// The trigger channel for `side`.
    #[must_use]
    pub fn trigger(&self, side: Side) -> &Channel<TriggerSettings> {
        match side {
            Side::Left => &self.trigger_l,
            Side::Right => &self.trigger_r,
        }
    }
}

impl Default for ShapingProfile {
    fn default() -> Self {
        Self::from_record(&ProfileRecord::DEFAULT)
    }
}

fn stick_channel(raw: &StickSettingsRaw) -> Channel<StickSettings> {
    Channel {
        settings: StickSettings::from_raw(raw),
        enabled: *raw != StickSettingsRaw::DEFAULT,
    }
}

fn trigger_channel(raw: &TriggerSettingsRaw) -> Channel<TriggerSettings> {
    Channel {
        settings: TriggerSettings::from_raw(raw),
        enabled: *raw != TriggerSettingsRaw::DEFAULT,
    }
}

/// Shape a trigger sample with the profile's settings for `side`.
#[must_use]
pub fn shape_trigger(raw: u8, side: Side, profile: &ShapingProfile) -> u8 {
    let channel = profile.trigger(side);
    if channel.enabled {
        trigger::shape(raw, &channel.settings)
    } else {
        raw
    }
}

/// Shape a stick sample with the profile's settings for `side`.
///
/// A disabled channel only applies the caller's `invert_y`.
#[must_use]
pub fn shape_stick(
    raw_x: i16,
    raw_y: i16,
    side: Side,
    invert_y: bool,
    profile: &ShapingProfile,
) -> (i16, i16) {
    let channel = profile.stick(side);
    if channel.enabled {
        stick::shape(raw_x, raw_y, &channel.settings, invert_y)
    } else if invert_y {
        (raw_x, range::invert(raw_y))
    } else {
        (raw_x, raw_y)
    }
}

/// Raw settings most recently applied, per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Applied {
    stick_l: StickSettingsRaw,
    stick_r: StickSettingsRaw,
    trigger_l: TriggerSettingsRaw,
    trigger_r: TriggerSettingsRaw,
}

/// Holds the derived shaping profile for one session.
#[derive(Clone, Debug)]
pub struct Shaper {
    profile: ShapingProfile,
    applied: Applied,
}

impl Shaper {
    /// A shaper with every channel disabled.
    #[must_use]
    pub fn new() -> Self {
        let record = ProfileRecord::DEFAULT;
        Self {
            profile: ShapingProfile::from_record(&record),
            applied: Applied {
                stick_l: record.stick_l,
                stick_r: record.stick_r,
                trigger_l: record.trigger_l,
                trigger_r: record.trigger_r,
            },
        }
    }

    /// Apply a profile record, re-deriving only the channels whose stored
    /// settings differ from the last applied ones.
    ///
    /// Returns true if any channel changed.
    pub fn apply(&mut self, record: &ProfileRecord) -> bool {
        let mut changed = false;

        if record.stick_l != self.applied.stick_l {
            self.profile.stick_l = stick_channel(&record.stick_l);
            self.applied.stick_l = record.stick_l;
            changed = true;
        }
        if record.stick_r != self.applied.stick_r {
            self.profile.stick_r = stick_channel(&record.stick_r);
            self.applied.stick_r = record.stick_r;
            changed = true;
        }
        if record.trigger_l != self.applied.trigger_l {
            self.profile.trigger_l = trigger_channel(&record.trigger_l);
            self.applied.trigger_l = record.trigger_l;
            changed = true;
        }
        if record.trigger_r != self.applied.trigger_r {
            self.profile.trigger_r = trigger_channel(&record.trigger_r);
            self.applied.trigger_r = record.trigger_r;
            changed = true;
        }

        if changed {
            debug!(
                "shaping: stick_l {} stick_r {} trigger_l {} trigger_r {}",
                self.profile.stick_l.enabled,
                self.profile.stick_r.enabled,
                self.profile.trigger_l.enabled,
                self.profile.trigger_r.enabled
            );
        }
        changed
    }

    /// The working profile as last applied.
    #[must_use]
    pub fn profile(&self) -> &ShapingProfile {
        &self.profile
    }
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new()
    }
}

/// Remap plus shaping for whole snapshots.
#[derive(Clone, Debug)]
pub struct PadMapper {
    map: ButtonMap,
    shaper: Shaper,
    analog_enabled: bool,
}

impl PadMapper {
    /// Build the remap table and shaping profile for `record`.
    #[must_use]
    pub fn new(record: &ProfileRecord) -> Self {
        let mut mapper = Self {
            map: ButtonMap::IDENTITY,
            shaper: Shaper::new(),
            analog_enabled: false,
        };
        mapper.set_profile(record);
        mapper
    }

    /// Switch to another profile. Returns true if the shaping changed.
    pub fn set_profile(&mut self, record: &ProfileRecord) -> bool {
        self.map = ButtonMap::from_profile(record);
        self.analog_enabled = record.analog_enabled;
        self.shaper.apply(record)
    }

    /// Whether the active profile reports per-button pressure.
    #[must_use]
    pub fn analog_enabled(&self) -> bool {
        self.analog_enabled
    }

    /// The shaper holding the working profile.
    #[must_use]
    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    /// Remap buttons and reshape sticks and triggers.
    ///
    /// `invert_y` flips the Y convention of both sticks.
    #[must_use]
    pub fn map(&self, pad: &InboundSnapshot, invert_y: bool) -> InboundSnapshot {
        let profile = self.shaper.profile();
        let mut out = self.map.remap(pad);

        let (lx, ly) = shape_stick(pad.stick_l.x, pad.stick_l.y, Side::Left, invert_y, profile);
        let (rx, ry) = shape_stick(pad.stick_r.x, pad.stick_r.y, Side::Right, invert_y, profile);
        out.stick_l = AnalogStick::new(lx, ly);
        out.stick_r = AnalogStick::new(rx, ry);
        out.trigger_l = shape_trigger(pad.trigger_l, Side::Left, profile);
        out.trigger_r = shape_trigger(pad.trigger_r, Side::Right, profile);
        out
    }
}
