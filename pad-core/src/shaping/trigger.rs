//! Single-axis trigger shaping.

use crate::fix16::Fix16;
use crate::profile::TriggerSettingsRaw;

/// Working trigger parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerSettings {
    pub dz_inner: Fix16,
    pub dz_outer: Fix16,
    pub anti_dz_inner: Fix16,
    pub anti_dz_outer: Fix16,
    pub curve: Fix16,
}

impl TriggerSettings {
    /// Working settings from the stored record; triggers use the raw values as-is.
    #[must_use]
    pub const fn from_raw(raw: &TriggerSettingsRaw) -> Self {
        Self {
            dz_inner: raw.dz_inner,
            dz_outer: raw.dz_outer,
            anti_dz_inner: raw.anti_dz_inner,
            anti_dz_outer: raw.anti_dz_outer,
            curve: raw.curve,
        }
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self::from_raw(&TriggerSettingsRaw::DEFAULT)
    }
}

/// Shape one trigger sample. Values at or below `dz_inner` return 0.
#[must_use]
pub fn shape(value: u8, set: &TriggerSettings) -> u8 {
    let full = Fix16::from(u8::MAX);
    let level = (Fix16::from(value) / full).abs();
    if level <= set.dz_inner {
        return 0;
    }

    let mut out = (level - set.dz_inner)
        .checked_div(set.anti_dz_outer - set.dz_inner)
        .unwrap_or(Fix16::ONE)
        .clamp(Fix16::ZERO, Fix16::ONE);

    if set.anti_dz_inner > Fix16::ZERO {
        out = set.anti_dz_inner + (Fix16::ONE - set.anti_dz_inner) * out;
    }
    if set.curve != Fix16::ONE {
        out = out.pow(Fix16::ONE.checked_div(set.curve).unwrap_or(Fix16::ONE));
    }
    if set.anti_dz_outer < Fix16::ONE {
        out = (out * (Fix16::ONE / (Fix16::ONE - set.anti_dz_outer))).clamp(Fix16::ZERO, Fix16::ONE);
    }

    out *= set.dz_outer;
    (out * full).to_int_round().clamp(0, i32::from(u8::MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_is_identity() {
        let set = TriggerSettings::default();
        for value in [0u8, 1, 64, 128, 200, 254, 255] {
            assert_eq!(shape(value, &set), value);
        }
    }

    #[test]
    fn test_inner_deadzone() {
        let set = TriggerSettings {
            dz_inner: Fix16::from_bits(13107), // 0.2
            ..TriggerSettings::default()
        };
        assert_eq!(shape(51, &set), 0);
        assert_eq!(shape(40, &set), 0);
        assert!(shape(52, &set) > 0);
        assert_eq!(shape(255, &set), 255);
    }

    #[test]
    fn test_anti_deadzone_floor() {
        let set = TriggerSettings {
            anti_dz_inner: Fix16::from_bits(16384), // 0.25
            ..TriggerSettings::default()
        };
        assert_eq!(shape(0, &set), 0);
        assert_eq!(shape(1, &set), 65);
        assert_eq!(shape(255, &set), 255);
    }

    #[test]
    fn test_outer_cap() {
        let set = TriggerSettings {
            dz_outer: Fix16::from_bits(32768), // 0.5
            ..TriggerSettings::default()
        };
        assert_eq!(shape(255, &set), 128);
    }

    #[test]
    fn test_curve() {
        let set = TriggerSettings {
            curve: Fix16::from_int(2),
            ..TriggerSettings::default()
        };
        // sqrt response is above linear in the middle
        assert!(shape(64, &set) > 64);
        assert_eq!(shape(255, &set), 255);
    }
}
