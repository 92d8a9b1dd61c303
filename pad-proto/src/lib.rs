//! Canonical gamepad types, range scaling, and the inter-chip report codec.
//!
//! This crate holds everything that both chips of a split adapter must agree
//! on, with no platform dependencies:
//!
//! - **Types**: the canonical controller representation
//!   - [`Buttons`] - 12 logical buttons as a bitfield
//!   - [`Dpad`] - up to four combinable cardinal bits
//!   - [`AnalogStick`] - signed 16-bit X/Y
//!   - [`InboundSnapshot`] / [`OutboundSnapshot`] / [`ChatpadSnapshot`]
//! - **Range**: [`range`] remaps controller-native widths onto the canonical ones
//! - **Packet**: [`packet`] encodes and decodes the fixed-length inter-chip reports
//!
//! # Example
//!
//! ```
//! use pad_proto::packet::{LinkStatus, Request, Response};
//!
//! let mut buf = [0u8; pad_proto::packet::MAX_PACKET_SIZE];
//! let len = Request::Status { slot: 1 }.encode(&mut buf).unwrap();
//! assert_eq!(&buf[..len], &[4, 2, 1, 0]);
//!
//! let reply = Response::decode(&[4, 2, 1, 2]).unwrap();
//! assert_eq!(reply.status(), Some(LinkStatus::Ready));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`heapless`**: Enable `encode_to_vec()` methods
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod packet;
pub mod range;
pub mod types;

// Re-export types at crate root for convenience
pub use packet::{LinkStatus, PacketError, PadFormat, Request, Response, Tag, MAX_PACKET_SIZE};
pub use types::{
    AnalogButton, AnalogStick, Buttons, ChatpadSnapshot, Dpad, InboundSnapshot, OutboundSnapshot,
};
