//! Bit-exact inter-chip report codec.
//!
//! Every packet starts with a three byte header followed by a payload whose
//! size is fixed by the tag:
//!
//! ```text
//! [len:u8][tag:u8][slot:u8][payload ...]
//! ```
//!
//! | Tag | Request payload | Response payload |
//! |---|---|---|
//! | `PadData` (1) | dpad, buttons, lt, rt, lx, ly, rx, ry (13 bytes) | rumble_l, rumble_r (2 bytes) |
//! | `PadDataAnalog` (5) | as `PadData` + 10 pressure bytes (23 bytes) | rumble_l, rumble_r (2 bytes) |
//! | `Status` (2), `Connect` (3), `Disconnect` (4) | status byte | status byte |
//!
//! Multi-byte fields are little-endian. Responses echo the request's tag and
//! slot, so the Poller can tell a stale or misrouted reply from a real one.
//!
//! # Example
//!
//! ```
//! use pad_proto::packet::{PadFormat, Request};
//! use pad_proto::{Buttons, InboundSnapshot};
//!
//! let pad = InboundSnapshot { buttons: Buttons::A | Buttons::B, ..InboundSnapshot::neutral() };
//! let req = Request::Pad { slot: 2, pad, format: PadFormat::Compact };
//!
//! let mut buf = [0u8; 32];
//! let len = req.encode(&mut buf).unwrap();
//! assert_eq!(&buf[..6], &[16, 1, 2, 0, 0x03, 0x00]);
//! assert_eq!(Request::decode(&buf[..len]).unwrap(), req);
//! ```

use crate::types::{AnalogButton, AnalogStick, Buttons, Dpad, InboundSnapshot, OutboundSnapshot};

/// Size of the `{len, tag, slot}` header.
pub const HEADER_SIZE: usize = 3;

/// Largest packet in either direction (`PadDataAnalog` request).
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + PAD_PAYLOAD_SIZE + AnalogButton::COUNT;

const PAD_PAYLOAD_SIZE: usize = 13;
const STATUS_PAYLOAD_SIZE: usize = 1;
const RUMBLE_PAYLOAD_SIZE: usize = 2;

/// Report kind carried in the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Tag {
    PadData = 1,
    Status = 2,
    Connect = 3,
    Disconnect = 4,
    PadDataAnalog = 5,
}

impl Tag {
    /// Parse a tag byte.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::UnknownTag`] for any byte outside `1..=5`.
    pub const fn from_u8(value: u8) -> Result<Self, PacketError> {
        match value {
            1 => Ok(Self::PadData),
            2 => Ok(Self::Status),
            3 => Ok(Self::Connect),
            4 => Ok(Self::Disconnect),
            5 => Ok(Self::PadDataAnalog),
            other => Err(PacketError::UnknownTag(other)),
        }
    }

    /// Total length of a Poller-to-Relay packet with this tag.
    #[must_use]
    pub const fn request_len(self) -> usize {
        match self {
            Self::PadData => HEADER_SIZE + PAD_PAYLOAD_SIZE,
            Self::PadDataAnalog => HEADER_SIZE + PAD_PAYLOAD_SIZE + AnalogButton::COUNT,
            Self::Status | Self::Connect | Self::Disconnect => HEADER_SIZE + STATUS_PAYLOAD_SIZE,
        }
    }

    /// Total length of the Relay's reply to a packet with this tag.
    #[must_use]
    pub const fn response_len(self) -> usize {
        match self {
            Self::PadData | Self::PadDataAnalog => HEADER_SIZE + RUMBLE_PAYLOAD_SIZE,
            Self::Status | Self::Connect | Self::Disconnect => HEADER_SIZE + STATUS_PAYLOAD_SIZE,
        }
    }
}

/// Per-slot liveness as tracked by the Poller and reported by a Relay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LinkStatus {
    #[default]
    NotConnected = 0,
    NotReady = 1,
    Ready = 2,
    /// Acknowledgement of a connect/disconnect push.
    ResponseOk = 3,
}

impl LinkStatus {
    /// Parse a status byte.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::InvalidStatus`] for any byte outside `0..=3`.
    pub const fn from_u8(value: u8) -> Result<Self, PacketError> {
        match value {
            0 => Ok(Self::NotConnected),
            1 => Ok(Self::NotReady),
            2 => Ok(Self::Ready),
            3 => Ok(Self::ResponseOk),
            other => Err(PacketError::InvalidStatus(other)),
        }
    }
}

/// Whether pad data travels with the auxiliary pressure array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PadFormat {
    /// Buttons, D-pad, triggers and sticks only.
    #[default]
    Compact,
    /// Compact payload plus the 10 per-button pressure bytes.
    WithAnalog,
}

impl PadFormat {
    /// Tag used on the wire for this format.
    #[must_use]
    pub const fn tag(self) -> Tag {
        match self {
            Self::Compact => Tag::PadData,
            Self::WithAnalog => Tag::PadDataAnalog,
        }
    }
}

/// Codec errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Fewer bytes than the header or the declared length require.
    TooShort,
    /// The header length does not match the fixed length for its tag.
    LengthMismatch { expected: u8, found: u8 },
    /// Tag byte is not a known report kind.
    UnknownTag(u8),
    /// Status byte is not a known [`LinkStatus`].
    InvalidStatus(u8),
    /// The output buffer cannot hold the encoded packet.
    BufferTooSmall,
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort => write!(f, "packet too short"),
            Self::LengthMismatch { expected, found } => {
                write!(f, "length mismatch: expected {expected}, found {found}")
            }
            Self::UnknownTag(tag) => write!(f, "unknown tag {tag}"),
            Self::InvalidStatus(status) => write!(f, "invalid status {status}"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// Poller-to-Relay packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Inbound snapshot push. In [`PadFormat::Compact`] the pressure array
    /// is not transmitted and decodes as zeros.
    Pad {
        slot: u8,
        pad: InboundSnapshot,
        format: PadFormat,
    },
    Status { slot: u8 },
    Connect { slot: u8 },
    Disconnect { slot: u8 },
}

/// Relay-to-Poller packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    Pad {
        slot: u8,
        format: PadFormat,
        rumble: OutboundSnapshot,
    },
    Status { slot: u8, status: LinkStatus },
    Connect { slot: u8, status: LinkStatus },
    Disconnect { slot: u8, status: LinkStatus },
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8], len: usize) -> Result<Self, PacketError> {
        if buf.len() < len {
            return Err(PacketError::BufferTooSmall);
        }
        Ok(Self { buf, pos: 0 })
    }

    #[inline]
    fn u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    #[inline]
    fn bytes(&mut self, value: &[u8]) {
        self.buf[self.pos..self.pos + value.len()].copy_from_slice(value);
        self.pos += value.len();
    }

    fn header(&mut self, tag: Tag, len: usize, slot: u8) {
        // fixed lengths all fit a byte
        self.u8(len as u8);
        self.u8(tag as u8);
        self.u8(slot);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    fn u8(&mut self) -> u8 {
        let value = self.buf[self.pos];
        self.pos += 1;
        value
    }

    #[inline]
    fn u16(&mut self) -> u16 {
        let value = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        value
    }

    #[inline]
    fn i16(&mut self) -> i16 {
        self.u16() as i16
    }
}

/// Validate the header against the fixed length for its tag.
///
/// Returns the tag, the slot and a reader positioned at the payload.
fn open(buf: &[u8], len_for: fn(Tag) -> usize) -> Result<(Tag, u8, Reader<'_>), PacketError> {
    if buf.len() < HEADER_SIZE {
        return Err(PacketError::TooShort);
    }
    let tag = Tag::from_u8(buf[1])?;
    let expected = len_for(tag);
    if usize::from(buf[0]) != expected {
        return Err(PacketError::LengthMismatch {
            expected: expected as u8,
            found: buf[0],
        });
    }
    if buf.len() < expected {
        return Err(PacketError::TooShort);
    }
    Ok((
        tag,
        buf[2],
        Reader {
            buf: &buf[..expected],
            pos: HEADER_SIZE,
        },
    ))
}

impl Request {
    /// Wire tag of this packet.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Pad { format, .. } => format.tag(),
            Self::Status { .. } => Tag::Status,
            Self::Connect { .. } => Tag::Connect,
            Self::Disconnect { .. } => Tag::Disconnect,
        }
    }

    /// Slot index carried in the header.
    #[must_use]
    pub const fn slot(&self) -> u8 {
        match *self {
            Self::Pad { slot, .. }
            | Self::Status { slot }
            | Self::Connect { slot }
            | Self::Disconnect { slot } => slot,
        }
    }

    /// Number of bytes [`Request::encode`] writes.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.tag().request_len()
    }

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::BufferTooSmall`] if `buf` is shorter than
    /// [`Request::encoded_len`].
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, PacketError> {
        let len = self.encoded_len();
        let mut w = Writer::new(buf, len)?;
        w.header(self.tag(), len, self.slot());
        match self {
            Self::Pad { pad, format, .. } => {
                w.u8(pad.dpad.raw());
                w.bytes(&pad.buttons.raw().to_le_bytes());
                w.u8(pad.trigger_l);
                w.u8(pad.trigger_r);
                w.bytes(&pad.stick_l.x.to_le_bytes());
                w.bytes(&pad.stick_l.y.to_le_bytes());
                w.bytes(&pad.stick_r.x.to_le_bytes());
                w.bytes(&pad.stick_r.y.to_le_bytes());
                if *format == PadFormat::WithAnalog {
                    w.bytes(&pad.analog);
                }
            }
            // the Poller never has a status of its own to report
            Self::Status { .. } | Self::Connect { .. } | Self::Disconnect { .. } => {
                w.u8(LinkStatus::NotConnected as u8);
            }
        }
        Ok(w.pos)
    }

    /// Encode into a `heapless::Vec` sized for the largest packet.
    ///
    /// # Errors
    ///
    /// Propagates [`Request::encode`] errors.
    #[cfg(feature = "heapless")]
    pub fn encode_to_vec(&self) -> Result<heapless::Vec<u8, MAX_PACKET_SIZE>, PacketError> {
        let mut vec = heapless::Vec::new();
        vec.resize(MAX_PACKET_SIZE, 0)
            .map_err(|_| PacketError::BufferTooSmall)?;
        let len = self.encode(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }

    /// Decode a packet written by the Poller.
    ///
    /// Bytes past the header's declared length are ignored. The D-pad is
    /// normalized, so opposing directions on the wire cancel.
    ///
    /// # Errors
    ///
    /// Returns a [`PacketError`] if the header, length or tag is invalid.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let (tag, slot, mut r) = open(buf, Tag::request_len)?;
        let request = match tag {
            Tag::PadData | Tag::PadDataAnalog => {
                let mut pad = InboundSnapshot::neutral();
                pad.dpad = Dpad(r.u8()).normalized();
                pad.buttons = Buttons(r.u16());
                pad.trigger_l = r.u8();
                pad.trigger_r = r.u8();
                pad.stick_l = AnalogStick::new(r.i16(), r.i16());
                pad.stick_r = AnalogStick::new(r.i16(), r.i16());
                let format = if tag == Tag::PadDataAnalog {
                    for value in &mut pad.analog {
                        *value = r.u8();
                    }
                    PadFormat::WithAnalog
                } else {
                    PadFormat::Compact
                };
                Self::Pad { slot, pad, format }
            }
            Tag::Status => Self::Status { slot },
            Tag::Connect => Self::Connect { slot },
            Tag::Disconnect => Self::Disconnect { slot },
        };
        Ok(request)
    }
}

impl Response {
    /// Wire tag of this packet.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Pad { format, .. } => format.tag(),
            Self::Status { .. } => Tag::Status,
            Self::Connect { .. } => Tag::Connect,
            Self::Disconnect { .. } => Tag::Disconnect,
        }
    }

    /// Slot index carried in the header.
    #[must_use]
    pub const fn slot(&self) -> u8 {
        match *self {
            Self::Pad { slot, .. }
            | Self::Status { slot, .. }
            | Self::Connect { slot, .. }
            | Self::Disconnect { slot, .. } => slot,
        }
    }

    /// Status byte carried by a status/connect/disconnect reply.
    #[must_use]
    pub const fn status(&self) -> Option<LinkStatus> {
        match *self {
            Self::Pad { .. } => None,
            Self::Status { status, .. }
            | Self::Connect { status, .. }
            | Self::Disconnect { status, .. } => Some(status),
        }
    }

    /// True if this reply answers `request` (same tag, same slot).
    #[must_use]
    pub fn answers(&self, request: &Request) -> bool {
        self.tag() == request.tag() && self.slot() == request.slot()
    }

    /// Length of the encoded packet, header included.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.tag().response_len()
    }

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::BufferTooSmall`] if `buf` is shorter than
    /// [`Response::encoded_len`].
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, PacketError> {
        let len = self.encoded_len();
        let mut w = Writer::new(buf, len)?;
        w.header(self.tag(), len, self.slot());
        match self {
            Self::Pad { rumble, .. } => {
                w.u8(rumble.rumble_l);
                w.u8(rumble.rumble_r);
            }
            Self::Status { status, .. }
            | Self::Connect { status, .. }
            | Self::Disconnect { status, .. } => w.u8(*status as u8),
        }
        Ok(w.pos)
    }

    /// Encode into a `heapless::Vec` sized for the largest packet.
    ///
    /// # Errors
    ///
    /// Propagates [`Response::encode`] errors.
    #[cfg(feature = "heapless")]
    pub fn encode_to_vec(&self) -> Result<heapless::Vec<u8, MAX_PACKET_SIZE>, PacketError> {
        let mut vec = heapless::Vec::new();
        vec.resize(MAX_PACKET_SIZE, 0)
            .map_err(|_| PacketError::BufferTooSmall)?;
        let len = self.encode(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }

    /// Decode a reply read back from a Relay.
    ///
    /// # Errors
    ///
    /// Returns a [`PacketError`] if the header, length, tag or status byte
    /// is invalid.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let (tag, slot, mut r) = open(buf, Tag::response_len)?;
        let response = match tag {
            Tag::PadData | Tag::PadDataAnalog => Self::Pad {
                slot,
                format: if tag == Tag::PadData {
                    PadFormat::Compact
                } else {
                    PadFormat::WithAnalog
                },
                rumble: OutboundSnapshot {
                    rumble_l: r.u8(),
                    rumble_r: r.u8(),
                },
            },
            Tag::Status => Self::Status {
                slot,
                status: LinkStatus::from_u8(r.u8())?,
            },
            Tag::Connect => Self::Connect {
                slot,
                status: LinkStatus::from_u8(r.u8())?,
            },
            Tag::Disconnect => Self::Disconnect {
                slot,
                status: LinkStatus::from_u8(r.u8())?,
            },
        };
        Ok(response)
    }
}
