//! Platform-agnostic gamepad state store, analog shaping, and inter-chip
//! link roles.
//!
//! This crate is the part of the adapter firmware shared by every board and
//! every protocol adapter. It has no chip dependencies and runs unchanged in
//! `no_std` targets and in host tests.
//!
//! # Overview
//!
//! - [`fix16`]: deterministic 16.16 fixed-point math ([`Fix16`])
//! - [`profile`]: the versioned profile record and its loader ([`ProfileRecord`], [`load_profile`])
//! - [`mapping`]: button, D-pad and pressure remapping ([`ButtonMap`])
//! - [`shaping`]: stick and trigger shaping ([`shape_stick`], [`shape_trigger`], [`PadMapper`])
//! - [`store`]: lock-protected canonical state ([`GamepadStore`])
//! - [`pump`]: input source trait and the pump that feeds a store ([`InputSource`], [`InputPump`])
//! - [`link`]: the Poller and Relay roles of the inter-chip link ([`Poller`], [`Relay`])
//!
//! # Data flow
//!
//! ```text
//! InputSource --> InputPump --(PadMapper)--> GamepadStore --> output adapter
//!                                                 ^   |
//!                                   rumble -------+   +--> Poller ==I2C==> Relay --> GamepadStore
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format` (embedded)
//! - **`log`**: Log through the `log` facade (host builds)
//!
//! `defmt` and `log` are mutually exclusive. With neither, logging compiles
//! away.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod fix16;
pub mod link;
pub mod mapping;
pub mod profile;
pub mod pump;
pub mod shaping;
pub mod store;

pub use fix16::Fix16;
pub use link::{ConfigError, LinkConfig, LinkError, Liveness, Poller, Relay, RelaySlots};
pub use mapping::ButtonMap;
pub use profile::{
    load_profile, ProfileError, ProfileRecord, ProfileSource, StickSettingsRaw, TriggerSettingsRaw,
    DEFAULT_PROFILE_ID, MAX_PROFILES,
};
pub use pump::{InputError, InputPump, InputSource};
pub use shaping::{shape_stick, shape_trigger, PadMapper, Shaper, ShapingProfile, Side};
pub use store::{AnalogGate, GamepadStore, Latest};
