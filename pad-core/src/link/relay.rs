//! Responding side of the inter-chip link.
//!
//! A board's I2C target driver hands every completed write to
//! [`Relay::handle_request`] and answers the following read with
//! [`Relay::response`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use pad_proto::{LinkStatus, PadFormat, Request, Response, MAX_PACKET_SIZE};
use portable_atomic::{AtomicBool, Ordering};

use super::LinkError;
use crate::store::GamepadStore;

/// One relay slot: decodes Poller writes into its store and holds the reply.
pub struct Relay<'a, M: RawMutex> {
    slot: u8,
    store: &'a GamepadStore<M>,
    local_controller: AtomicBool,
    enabled: AtomicBool,
    response: [u8; MAX_PACKET_SIZE],
    response_len: usize,
}

impl<'a, M: RawMutex> Relay<'a, M> {
    /// A relay answering for `slot`, mirroring pad data into `store`.
    pub fn new(slot: u8, store: &'a GamepadStore<M>) -> Self {
        Self {
            slot,
            store,
            local_controller: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            response: [0; MAX_PACKET_SIZE],
            response_len: 0,
        }
    }

    /// The slot this relay answers for.
    #[must_use]
    pub const fn slot(&self) -> u8 {
        self.slot
    }

    /// Decode one Poller write, apply it, and prepare the reply for the
    /// matched read.
    ///
    /// A packet that fails to decode or targets another slot leaves no reply
    /// prepared, so the Poller reads nothing valid and retries later.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Packet`] or [`LinkError::Unexpected`] for such
    /// packets.
    pub fn handle_request(&mut self, bytes: &[u8]) -> Result<Request, LinkError> {
        self.response_len = 0;

        let request = Request::decode(bytes).map_err(|e| {
            warn!("relay {}: malformed request: {}", self.slot, e);
            LinkError::Packet(e)
        })?;
        if request.slot() != self.slot {
            warn!("relay {}: request for slot {}", self.slot, request.slot());
            return Err(LinkError::Unexpected);
        }

        let local = self.has_local_controller();
        let response = match request {
            Request::Pad { slot, pad, format } => {
                if !local {
                    self.store
                        .analog()
                        .set_device(format == PadFormat::WithAnalog);
                    self.store.set_inbound(pad);
                }
                Response::Pad {
                    slot,
                    format,
                    rumble: self.store.get_outbound().snapshot,
                }
            }
            Request::Status { slot } => Response::Status {
                slot,
                // a relay driving its own controller stays out of the exchange
                status: if local {
                    LinkStatus::NotReady
                } else {
                    LinkStatus::Ready
                },
            },
            Request::Connect { slot } => {
                if !self.enabled.swap(true, Ordering::AcqRel) {
                    debug!("relay {}: enabled by poller", slot);
                }
                Response::Connect {
                    slot,
                    status: LinkStatus::ResponseOk,
                }
            }
            Request::Disconnect { slot } => {
                if self.enabled.swap(false, Ordering::AcqRel) {
                    debug!("relay {}: disabled by poller", slot);
                    if !local {
                        self.store.reset_inbound();
                    }
                }
                Response::Disconnect {
                    slot,
                    status: LinkStatus::ResponseOk,
                }
            }
        };

        self.response_len = response.encode(&mut self.response)?;
        Ok(request)
    }

    /// Bytes to return on the next read; empty if nothing is prepared.
    #[must_use]
    pub fn response(&self) -> &[u8] {
        &self.response[..self.response_len]
    }

    /// Mark a directly attached controller active. While set, the relay
    /// reports `NotReady` and ignores pad data from the Poller.
    pub fn set_local_controller(&self, active: bool) {
        self.local_controller.store(active, Ordering::Release);
    }

    /// Whether a directly attached controller is active.
    #[must_use]
    pub fn has_local_controller(&self) -> bool {
        self.local_controller.load(Ordering::Acquire)
    }

    /// Whether the Poller's last push was a connect. When false the board
    /// should drive its own output standalone.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
