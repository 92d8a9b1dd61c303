//! User profile record: remap table plus raw shaping parameters.
//!
//! The record is a packed little-endian layout read from external storage:
//!
//! ```text
//! version:u8  id:u8
//! stick_l:StickSettingsRaw(55)  stick_r:StickSettingsRaw(55)
//! trigger_l:TriggerSettingsRaw(20)  trigger_r:TriggerSettingsRaw(20)
//! dpad_up, dpad_down, dpad_left, dpad_right: u8
//! button_a .. button_misc: u16 x 12
//! analog_enabled:u8
//! analog_off_up .. analog_off_rb: u8 x 10
//! ```
//!
//! New fields go at the end, or bump [`PROFILE_VERSION`].

use pad_proto::{AnalogButton, Buttons, Dpad};

use crate::fix16::Fix16;

/// Layout version written as the first byte of every record.
pub const PROFILE_VERSION: u8 = 1;

/// Profile ids are `1..=MAX_PROFILES`.
pub const MAX_PROFILES: u8 = 8;

/// Profile used when nothing valid is stored.
pub const DEFAULT_PROFILE_ID: u8 = 1;

/// Profile record error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileError {
    /// Buffer shorter than [`ProfileRecord::SIZE`].
    TooShort,
    /// Leading version byte is not [`PROFILE_VERSION`].
    UnsupportedVersion(u8),
    /// Output buffer cannot hold the record.
    BufferTooSmall,
}

impl core::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort => write!(f, "profile record too short"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported profile version {v}"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn u8(&mut self) -> u8 {
        let value = self.buf[self.pos];
        self.pos += 1;
        value
    }

    fn bool(&mut self) -> bool {
        self.u8() != 0
    }

    fn u16(&mut self) -> u16 {
        let value = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        value
    }

    fn fix16(&mut self) -> Fix16 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Fix16::from_bits(i32::from_le_bytes(bytes))
    }
}

struct Sink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Sink<'_> {
    fn u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    fn bytes(&mut self, value: &[u8]) {
        self.buf[self.pos..self.pos + value.len()].copy_from_slice(value);
        self.pos += value.len();
    }

    fn fix16(&mut self, value: Fix16) {
        self.bytes(&value.to_bits().to_le_bytes());
    }
}

/// Stick shaping parameters as stored.
///
/// `axis_restrict`, `angle_restrict` and `anti_dz_angular` are stored in
/// hundredths of their working value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StickSettingsRaw {
    pub dz_inner: Fix16,
    pub dz_outer: Fix16,
    pub anti_dz_circle: Fix16,
    pub anti_dz_circle_y_scale: Fix16,
    pub anti_dz_square: Fix16,
    pub anti_dz_square_y_scale: Fix16,
    pub anti_dz_angular: Fix16,
    pub anti_dz_outer: Fix16,
    pub axis_restrict: Fix16,
    pub angle_restrict: Fix16,
    pub diag_scale_min: Fix16,
    pub diag_scale_max: Fix16,
    pub curve: Fix16,
    pub uncap_radius: bool,
    pub invert_y: bool,
    pub invert_x: bool,
}

impl StickSettingsRaw {
    pub const SIZE: usize = 13 * 4 + 3;

    pub const DEFAULT: Self = Self {
        dz_inner: Fix16::ZERO,
        dz_outer: Fix16::ONE,
        anti_dz_circle: Fix16::ZERO,
        anti_dz_circle_y_scale: Fix16::ZERO,
        anti_dz_square: Fix16::ZERO,
        anti_dz_square_y_scale: Fix16::ZERO,
        anti_dz_angular: Fix16::ZERO,
        anti_dz_outer: Fix16::ONE,
        axis_restrict: Fix16::ZERO,
        angle_restrict: Fix16::ZERO,
        diag_scale_min: Fix16::ONE,
        diag_scale_max: Fix16::ONE,
        curve: Fix16::ONE,
        uncap_radius: true,
        invert_y: false,
        invert_x: false,
    };

    fn read(c: &mut Cursor<'_>) -> Self {
        Self {
            dz_inner: c.fix16(),
            dz_outer: c.fix16(),
            anti_dz_circle: c.fix16(),
            anti_dz_circle_y_scale: c.fix16(),
            anti_dz_square: c.fix16(),
            anti_dz_square_y_scale: c.fix16(),
            anti_dz_angular: c.fix16(),
            anti_dz_outer: c.fix16(),
            axis_restrict: c.fix16(),
            angle_restrict: c.fix16(),
            diag_scale_min: c.fix16(),
            diag_scale_max: c.fix16(),
            curve: c.fix16(),
            uncap_radius: c.bool(),
            invert_y: c.bool(),
            invert_x: c.bool(),
        }
    }

    fn write(&self, s: &mut Sink<'_>) {
        for value in [
            self.dz_inner,
            self.dz_outer,
            self.anti_dz_circle,
            self.anti_dz_circle_y_scale,
            self.anti_dz_square,
            self.anti_dz_square_y_scale,
            self.anti_dz_angular,
            self.anti_dz_outer,
            self.axis_restrict,
            self.angle_restrict,
            self.diag_scale_min,
            self.diag_scale_max,
            self.curve,
        ] {
            s.fix16(value);
        }
        s.u8(u8::from(self.uncap_radius));
        s.u8(u8::from(self.invert_y));
        s.u8(u8::from(self.invert_x));
    }
}

impl Default for StickSettingsRaw {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trigger shaping parameters as stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerSettingsRaw {
    pub dz_inner: Fix16,
    pub dz_outer: Fix16,
    pub anti_dz_inner: Fix16,
    pub anti_dz_outer: Fix16,
    pub curve: Fix16,
}

impl TriggerSettingsRaw {
    pub const SIZE: usize = 5 * 4;

    pub const DEFAULT: Self = Self {
        dz_inner: Fix16::ZERO,
        dz_outer: Fix16::ONE,
        anti_dz_inner: Fix16::ZERO,
        anti_dz_outer: Fix16::ONE,
        curve: Fix16::ONE,
    };

    fn read(c: &mut Cursor<'_>) -> Self {
        Self {
            dz_inner: c.fix16(),
            dz_outer: c.fix16(),
            anti_dz_inner: c.fix16(),
            anti_dz_outer: c.fix16(),
            curve: c.fix16(),
        }
    }

    fn write(&self, s: &mut Sink<'_>) {
        s.fix16(self.dz_inner);
        s.fix16(self.dz_outer);
        s.fix16(self.anti_dz_inner);
        s.fix16(self.anti_dz_outer);
        s.fix16(self.curve);
    }
}

impl Default for TriggerSettingsRaw {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One user profile.
///
/// `buttons[i]` is the output mask for the logical button `Buttons::ALL[i]`;
/// `analog_offsets[i]` is the output pressure slot for `AnalogButton::ALL[i]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProfileRecord {
    pub id: u8,
    pub stick_l: StickSettingsRaw,
    pub stick_r: StickSettingsRaw,
    pub trigger_l: TriggerSettingsRaw,
    pub trigger_r: TriggerSettingsRaw,
    pub dpad_up: Dpad,
    pub dpad_down: Dpad,
    pub dpad_left: Dpad,
    pub dpad_right: Dpad,
    pub buttons: [Buttons; 12],
    pub analog_enabled: bool,
    pub analog_offsets: [u8; AnalogButton::COUNT],
}

impl ProfileRecord {
    /// Encoded size, version byte included.
    pub const SIZE: usize =
        2 + 2 * StickSettingsRaw::SIZE + 2 * TriggerSettingsRaw::SIZE + 4 + 12 * 2 + 1 + AnalogButton::COUNT;

    /// Identity mapping, neutral shaping, aux analog on.
    pub const DEFAULT: Self = Self {
        id: DEFAULT_PROFILE_ID,
        stick_l: StickSettingsRaw::DEFAULT,
        stick_r: StickSettingsRaw::DEFAULT,
        trigger_l: TriggerSettingsRaw::DEFAULT,
        trigger_r: TriggerSettingsRaw::DEFAULT,
        dpad_up: Dpad::UP,
        dpad_down: Dpad::DOWN,
        dpad_left: Dpad::LEFT,
        dpad_right: Dpad::RIGHT,
        buttons: Buttons::ALL,
        analog_enabled: true,
        analog_offsets: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    };

    /// Decode a stored record. Bytes past [`ProfileRecord::SIZE`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::TooShort`] or [`ProfileError::UnsupportedVersion`].
    pub fn decode(buf: &[u8]) -> Result<Self, ProfileError> {
        let Some(&version) = buf.first() else {
            return Err(ProfileError::TooShort);
        };
        if version != PROFILE_VERSION {
            return Err(ProfileError::UnsupportedVersion(version));
        }
        if buf.len() < Self::SIZE {
            return Err(ProfileError::TooShort);
        }

        let mut c = Cursor { buf, pos: 1 };
        let id = c.u8();
        let stick_l = StickSettingsRaw::read(&mut c);
        let stick_r = StickSettingsRaw::read(&mut c);
        let trigger_l = TriggerSettingsRaw::read(&mut c);
        let trigger_r = TriggerSettingsRaw::read(&mut c);
        let dpad_up = Dpad(c.u8());
        let dpad_down = Dpad(c.u8());
        let dpad_left = Dpad(c.u8());
        let dpad_right = Dpad(c.u8());
        let mut buttons = [Buttons::NONE; 12];
        for button in &mut buttons {
            *button = Buttons(c.u16());
        }
        let analog_enabled = c.bool();
        let mut analog_offsets = [0u8; AnalogButton::COUNT];
        for offset in &mut analog_offsets {
            *offset = c.u8();
        }

        Ok(Self {
            id,
            stick_l,
            stick_r,
            trigger_l,
            trigger_r,
            dpad_up,
            dpad_down,
            dpad_left,
            dpad_right,
            buttons,
            analog_enabled,
            analog_offsets,
        })
    }

    /// Encode into `buf`, returning [`ProfileRecord::SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::BufferTooSmall`] if `buf` is too short.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ProfileError> {
        if buf.len() < Self::SIZE {
            return Err(ProfileError::BufferTooSmall);
        }
        let mut s = Sink { buf, pos: 0 };
        s.u8(PROFILE_VERSION);
        s.u8(self.id);
        self.stick_l.write(&mut s);
        self.stick_r.write(&mut s);
        self.trigger_l.write(&mut s);
        self.trigger_r.write(&mut s);
        for dpad in [self.dpad_up, self.dpad_down, self.dpad_left, self.dpad_right] {
            s.u8(dpad.raw());
        }
        for button in &self.buttons {
            s.bytes(&button.raw().to_le_bytes());
        }
        s.u8(u8::from(self.analog_enabled));
        s.bytes(&self.analog_offsets);
        Ok(s.pos)
    }

    /// Whether `id` names a stored profile slot (`1..=MAX_PROFILES`).
    #[must_use]
    pub const fn is_valid_id(id: u8) -> bool {
        id >= 1 && id <= MAX_PROFILES
    }
}

impl Default for ProfileRecord {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Storage collaborator that holds encoded profile records.
pub trait ProfileSource {
    /// Copy the record stored for `id` into `buf`.
    ///
    /// Returns the number of bytes copied, or `None` if nothing is stored.
    fn read(&mut self, id: u8, buf: &mut [u8]) -> Option<usize>;
}

/// Load profile `id`, falling back to [`ProfileRecord::DEFAULT`] for an
/// invalid id, a missing record, a record that fails to decode, or one
/// whose stored id does not match.
pub fn load_profile<S: ProfileSource>(source: &mut S, id: u8) -> ProfileRecord {
    if !ProfileRecord::is_valid_id(id) {
        warn!("invalid profile id {}, using default", id);
        return ProfileRecord::DEFAULT;
    }

    let mut buf = [0u8; ProfileRecord::SIZE];
    let Some(len) = source.read(id, &mut buf) else {
        debug!("profile {} not stored, using default", id);
        return ProfileRecord::DEFAULT;
    };

    match ProfileRecord::decode(&buf[..len.min(buf.len())]) {
        Ok(record) if record.id == id => record,
        Ok(record) => {
            warn!("profile {} holds id {}, using default", id, record.id);
            ProfileRecord::DEFAULT
        }
        Err(e) => {
            warn!("profile {} unreadable: {}, using default", id, e);
            ProfileRecord::DEFAULT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemorySource {
        slots: [Option<([u8; ProfileRecord::SIZE], usize)>; MAX_PROFILES as usize + 1],
    }

    impl MemorySource {
        fn new() -> Self {
            Self {
                slots: [None; MAX_PROFILES as usize + 1],
            }
        }

        fn store(&mut self, id: u8, bytes: &[u8]) {
            let mut buf = [0u8; ProfileRecord::SIZE];
            let len = bytes.len().min(buf.len());
            buf[..len].copy_from_slice(&bytes[..len]);
            self.slots[id as usize] = Some((buf, len));
        }
    }

    impl ProfileSource for MemorySource {
        fn read(&mut self, id: u8, buf: &mut [u8]) -> Option<usize> {
            let (data, len) = self.slots.get(id as usize).copied().flatten()?;
            buf[..len].copy_from_slice(&data[..len]);
            Some(len)
        }
    }

    fn custom_record(id: u8) -> ProfileRecord {
        let mut record = ProfileRecord::DEFAULT;
        record.id = id;
        record.stick_l.dz_inner = Fix16::from_bits(6554);
        record.stick_r.invert_y = true;
        record.trigger_r.curve = Fix16::from_int(2);
        record.buttons[0] = Buttons::B;
        record.dpad_up = Dpad::DOWN;
        record.analog_enabled = false;
        record.analog_offsets[4] = 5;
        record
    }

    #[test]
    fn test_sizes() {
        assert_eq!(StickSettingsRaw::SIZE, 55);
        assert_eq!(TriggerSettingsRaw::SIZE, 20);
        assert_eq!(ProfileRecord::SIZE, 191);
    }

    #[test]
    fn test_default_layout() {
        let mut buf = [0u8; ProfileRecord::SIZE];
        assert_eq!(ProfileRecord::DEFAULT.encode(&mut buf), Ok(191));
        assert_eq!(buf[0], PROFILE_VERSION);
        assert_eq!(buf[1], 1);
        // stick_l.dz_outer = 1.0
        assert_eq!(&buf[6..10], &[0x00, 0x00, 0x01, 0x00]);
        // stick_l.uncap_radius
        assert_eq!(buf[2 + 52], 1);
        // dpad table follows both sticks and triggers
        assert_eq!(&buf[152..156], &[0x01, 0x02, 0x04, 0x08]);
        // button_a, button_misc
        assert_eq!(&buf[156..158], &[0x01, 0x00]);
        assert_eq!(&buf[178..180], &[0x00, 0x08]);
        assert_eq!(buf[180], 1);
        assert_eq!(&buf[181..], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_encode_decode_custom() {
        let record = custom_record(3);
        let mut buf = [0u8; ProfileRecord::SIZE];
        record.encode(&mut buf).unwrap();
        assert_eq!(ProfileRecord::decode(&buf), Ok(record));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(ProfileRecord::decode(&[]), Err(ProfileError::TooShort));
        assert_eq!(ProfileRecord::decode(&[1, 1, 0]), Err(ProfileError::TooShort));
        let mut buf = [0u8; ProfileRecord::SIZE];
        ProfileRecord::DEFAULT.encode(&mut buf).unwrap();
        buf[0] = 2;
        assert_eq!(ProfileRecord::decode(&buf), Err(ProfileError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 10];
        assert_eq!(
            ProfileRecord::DEFAULT.encode(&mut buf),
            Err(ProfileError::BufferTooSmall)
        );
    }

    #[test]
    fn test_load_profile_stored() {
        let mut source = MemorySource::new();
        let mut buf = [0u8; ProfileRecord::SIZE];
        custom_record(4).encode(&mut buf).unwrap();
        source.store(4, &buf);
        assert_eq!(load_profile(&mut source, 4), custom_record(4));
    }

    #[test]
    fn test_load_profile_fallbacks() {
        let mut source = MemorySource::new();
        assert_eq!(load_profile(&mut source, 0), ProfileRecord::DEFAULT);
        assert_eq!(load_profile(&mut source, 9), ProfileRecord::DEFAULT);
        assert_eq!(load_profile(&mut source, 2), ProfileRecord::DEFAULT);

        // stored under the wrong id
        let mut buf = [0u8; ProfileRecord::SIZE];
        custom_record(5).encode(&mut buf).unwrap();
        source.store(6, &buf);
        assert_eq!(load_profile(&mut source, 6), ProfileRecord::DEFAULT);

        // truncated
        source.store(7, &buf[..100]);
        assert_eq!(load_profile(&mut source, 7), ProfileRecord::DEFAULT);
    }
}
