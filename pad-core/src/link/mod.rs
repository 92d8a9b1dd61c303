//! Inter-chip report protocol roles.
//!
//! One chip is the [`Poller`](poller::Poller): it owns the I2C bus and
//! initiates every exchange. Every other chip runs a
//! [`Relay`](relay::Relay) that only answers. Relay slot `s` listens at
//! `base_address + s`; slot 0 is the Poller's own directly attached pad.
//!
//! Each exchange is one write followed by exactly one matched read. Packet
//! lengths are fixed by the tag (see [`pad_proto::packet`]).

pub mod liveness;
pub mod poller;
pub mod relay;

use embedded_hal::i2c::ErrorKind;
use pad_proto::{LinkStatus, PacketError, PadFormat};

pub use liveness::Liveness;
pub use poller::{Poller, RelaySlots};
pub use relay::Relay;

/// Highest valid 7-bit I2C address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Failure of a single exchange. Always transient: the slot is retried on a
/// later cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The bus transfer failed (NACK, arbitration loss, timeout, ...).
    Bus(ErrorKind),
    /// The reply could not be decoded.
    Packet(PacketError),
    /// The reply decoded but does not answer the request (tag or slot).
    Unexpected,
    /// A connect/disconnect push was answered without `ResponseOk`.
    Refused(LinkStatus),
}

impl LinkError {
    /// Classify a HAL bus error.
    pub fn bus<E: embedded_hal::i2c::Error>(err: E) -> Self {
        Self::Bus(err.kind())
    }

    /// True for failures of the bus itself rather than of the reply.
    #[must_use]
    pub const fn is_bus(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}

impl From<PacketError> for LinkError {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "bus error: {kind}"),
            Self::Packet(err) => write!(f, "malformed reply: {err}"),
            Self::Unexpected => write!(f, "reply does not match request"),
            Self::Refused(status) => write!(f, "push refused with status {}", *status as u8),
        }
    }
}

/// Start-up configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// At least one relay slot is required.
    NoSlots,
    /// Relay slots `1..=slots` need `slots + 1` stores.
    StoreCount { slots: usize, stores: usize },
    /// `base_address + slots` leaves the 7-bit address space.
    AddressOutOfRange { base: u8, slots: usize },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoSlots => write!(f, "no relay slots configured"),
            Self::StoreCount { slots, stores } => {
                write!(f, "{slots} relay slots need {} stores, got {stores}", slots + 1)
            }
            Self::AddressOutOfRange { base, slots } => {
                write!(f, "base address {base:#04x} + {slots} slots exceeds 0x7f")
            }
        }
    }
}

/// Link timing and addressing, fixed per board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Relay slot `s` answers at `base_address + s`.
    pub base_address: u8,
    /// Pad-data layout when the store's analog gate is open.
    pub format: PadFormat,
    /// Extra disconnect attempts per slot on shutdown.
    pub disconnect_retries: u8,
    /// Pause between disconnect attempts.
    pub retry_delay_us: u32,
    /// Pause between consecutive slots within one cycle.
    pub slot_gap_us: u32,
    /// Malformed pad replies tolerated before a `Ready` slot is downgraded.
    pub max_bad_responses: u8,
}

impl LinkConfig {
    pub const DEFAULT: Self = Self {
        base_address: 0,
        format: PadFormat::Compact,
        disconnect_retries: 6,
        retry_delay_us: 1_000,
        slot_gap_us: 100,
        max_bad_responses: 3,
    };

    /// Check that `slots` relays fit both the store array and the address
    /// space.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, slots: usize, stores: usize) -> Result<(), ConfigError> {
        if slots == 0 {
            return Err(ConfigError::NoSlots);
        }
        if stores < slots + 1 {
            return Err(ConfigError::StoreCount { slots, stores });
        }
        if usize::from(self.base_address) + slots > usize::from(MAX_ADDRESS) {
            return Err(ConfigError::AddressOutOfRange {
                base: self.base_address,
                slots,
            });
        }
        Ok(())
    }

    /// Bus address of relay `slot`.
    #[must_use]
    pub const fn address(&self, slot: u8) -> u8 {
        self.base_address.wrapping_add(slot)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::NoAcknowledgeSource;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(LinkConfig::DEFAULT.validate(3, 4), Ok(()));
        assert_eq!(LinkConfig::DEFAULT.address(1), 1);
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let config = LinkConfig::DEFAULT;
        assert_eq!(config.validate(0, 4), Err(ConfigError::NoSlots));
        assert_eq!(
            config.validate(3, 3),
            Err(ConfigError::StoreCount {
                slots: 3,
                stores: 3
            })
        );

        let high = LinkConfig {
            base_address: 0x7D,
            ..LinkConfig::DEFAULT
        };
        assert_eq!(high.validate(2, 3), Ok(()));
        assert_eq!(
            high.validate(3, 4),
            Err(ConfigError::AddressOutOfRange {
                base: 0x7D,
                slots: 3
            })
        );
    }

    #[test]
    fn test_bus_error_classification() {
        let err = LinkError::bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        assert!(err.is_bus());
        assert_eq!(
            err,
            LinkError::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        );
        assert!(!LinkError::from(PacketError::TooShort).is_bus());
    }
}
