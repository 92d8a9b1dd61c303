//! Bus-owning side of the inter-chip link.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use pad_proto::{LinkStatus, PadFormat, Request, Response, MAX_PACKET_SIZE};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use super::{ConfigError, LinkConfig, LinkError, Liveness};
use crate::store::GamepadStore;

/// Per-relay flags shared with other execution contexts.
///
/// Slots are numbered `1..=N`. The controller side marks slots enabled or
/// disabled as pads come and go; the [`Poller`] publishes each slot's
/// liveness here after every transition.
pub struct RelaySlots<const N: usize> {
    enabled: [AtomicBool; N],
    status: [AtomicU8; N],
}

impl<const N: usize> RelaySlots<N> {
    /// All slots disabled and `NotConnected`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: [const { AtomicBool::new(false) }; N],
            status: [const { AtomicU8::new(LinkStatus::NotConnected as u8) }; N],
        }
    }

    fn index(slot: u8) -> Option<usize> {
        let index = usize::from(slot).checked_sub(1)?;
        (index < N).then_some(index)
    }

    /// A pad for `slot` came up. Out-of-range slots are ignored.
    pub fn notify_connected(&self, slot: u8) {
        if let Some(i) = Self::index(slot) {
            self.enabled[i].store(true, Ordering::Release);
        }
    }

    /// The pad for `slot` went away. Out-of-range slots are ignored.
    pub fn notify_disconnected(&self, slot: u8) {
        if let Some(i) = Self::index(slot) {
            self.enabled[i].store(false, Ordering::Release);
        }
    }

    /// Whether a pad is attached for `slot`; false when out of range.
    #[must_use]
    pub fn is_enabled(&self, slot: u8) -> bool {
        Self::index(slot).is_some_and(|i| self.enabled[i].load(Ordering::Acquire))
    }

    /// Last published liveness of `slot`; `NotConnected` when out of range.
    #[must_use]
    pub fn status(&self, slot: u8) -> LinkStatus {
        Self::index(slot)
            .and_then(|i| LinkStatus::from_u8(self.status[i].load(Ordering::Acquire)).ok())
            .unwrap_or(LinkStatus::NotConnected)
    }

    fn publish(&self, slot: u8, status: LinkStatus) {
        if let Some(i) = Self::index(slot) {
            self.status[i].store(status as u8, Ordering::Release);
        }
    }
}

impl<const N: usize> Default for RelaySlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives `N` relays over one I2C bus.
///
/// `stores[s]` is the state for slot `s`; `stores[0]` belongs to the
/// Poller's own pad and is never sent.
pub struct Poller<'a, B, D, M: RawMutex, const N: usize> {
    bus: B,
    delay: D,
    config: LinkConfig,
    slots: &'a RelaySlots<N>,
    stores: &'a [GamepadStore<M>],
    liveness: [Liveness; N],
}

impl<'a, B, D, M, const N: usize> Poller<'a, B, D, M, N>
where
    B: I2c,
    D: DelayNs,
    M: RawMutex,
{
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `N` relays do not fit `stores` or the
    /// address space.
    pub fn new(
        bus: B,
        delay: D,
        config: LinkConfig,
        slots: &'a RelaySlots<N>,
        stores: &'a [GamepadStore<M>],
    ) -> Result<Self, ConfigError> {
        config.validate(N, stores.len())?;
        Ok(Self {
            bus,
            delay,
            config,
            slots,
            stores,
            liveness: [Liveness::new(); N],
        })
    }

    /// Tracked liveness of `slot`.
    #[must_use]
    pub fn status(&self, slot: u8) -> LinkStatus {
        RelaySlots::<N>::index(slot).map_or(LinkStatus::NotConnected, |i| self.liveness[i].status())
    }

    /// Probe every relay, push its enabled state and, for enabled relays,
    /// query readiness. Called periodically (about once a second).
    pub async fn update_status(&mut self) {
        for slot in Self::slot_numbers() {
            self.update_slot(slot).await;
            self.delay.delay_us(self.config.slot_gap_us).await;
        }
    }

    async fn update_slot(&mut self, slot: u8) {
        let address = self.config.address(slot);
        let enabled = self.slots.is_enabled(slot);

        if let Err(e) = self.probe(address).await {
            trace!("relay {}: probe failed: {}", slot, e);
            self.transition(slot, Liveness::bus_failed);
            return;
        }

        let push = if enabled {
            Request::Connect { slot }
        } else {
            Request::Disconnect { slot }
        };
        let acked = self.push(address, &push).await;
        if let Err(e) = acked {
            debug!("relay {}: push not acknowledged: {}", slot, e);
        }
        self.transition(slot, |live| live.acknowledged(acked.is_ok()));
        if acked.is_err() {
            return;
        }

        if !enabled {
            self.transition(slot, Liveness::disabled);
            return;
        }

        let reported = match self.exchange(address, &Request::Status { slot }).await {
            Ok(response) => response.status().unwrap_or(LinkStatus::NotReady),
            Err(e) => {
                debug!("relay {}: status query failed: {}", slot, e);
                LinkStatus::NotReady
            }
        };
        self.transition(slot, |live| live.status_reported(reported));
    }

    /// Exchange pad data with every `Ready` relay, in slot order.
    ///
    /// Each relay gets its slot's latest inbound snapshot and its rumble reply
    /// is written back as that slot's outbound snapshot. Returns the number
    /// of completed exchanges.
    pub async fn process(&mut self) -> usize {
        let stores = self.stores;
        let mut exchanged = 0;
        for slot in Self::slot_numbers() {
            let Some(i) = RelaySlots::<N>::index(slot) else {
                continue;
            };
            if !self.slots.is_enabled(slot) || !self.liveness[i].is_ready() {
                continue;
            }

            let store = &stores[usize::from(slot)];
            let format = match self.config.format {
                PadFormat::WithAnalog if store.analog_enabled() => PadFormat::WithAnalog,
                _ => PadFormat::Compact,
            };
            let request = Request::Pad {
                slot,
                pad: store.get_inbound().snapshot,
                format,
            };

            match self.exchange(self.config.address(slot), &request).await {
                Ok(Response::Pad { rumble, .. }) => {
                    store.set_outbound(rumble);
                    self.liveness[i].exchanged();
                    exchanged += 1;
                }
                Ok(_) => self.bad_response(slot, LinkError::Unexpected),
                Err(e) if e.is_bus() => {
                    warn!("relay {}: pad exchange failed: {}", slot, e);
                    self.transition(slot, Liveness::bus_failed);
                }
                Err(e) => self.bad_response(slot, e),
            }

            self.delay.delay_us(self.config.slot_gap_us).await;
        }
        exchanged
    }

    /// Tell every enabled, reachable relay that the Poller is going away so
    /// it can fall back to standalone operation.
    ///
    /// Each relay gets one attempt plus `disconnect_retries` retries.
    pub async fn shutdown(&mut self) {
        for slot in Self::slot_numbers() {
            if self.status(slot) == LinkStatus::NotConnected || !self.slots.is_enabled(slot) {
                continue;
            }
            let address = self.config.address(slot);
            if self.probe(address).await.is_err() {
                self.transition(slot, Liveness::bus_failed);
                continue;
            }

            let request = Request::Disconnect { slot };
            let mut attempts = 0u8;
            loop {
                match self.push(address, &request).await {
                    Ok(()) => {
                        debug!("relay {}: disconnected", slot);
                        self.transition(slot, Liveness::disabled);
                        break;
                    }
                    Err(e) if attempts >= self.config.disconnect_retries => {
                        warn!("relay {}: giving up disconnect: {}", slot, e);
                        break;
                    }
                    Err(_) => {
                        attempts += 1;
                        self.delay.delay_us(self.config.retry_delay_us).await;
                    }
                }
            }
        }
    }

    /// Decompose the poller into its bus and delay.
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn slot_numbers() -> impl Iterator<Item = u8> {
        // validate() keeps N inside the 7-bit address space
        (1..=N).map(|slot| slot as u8)
    }

    fn transition(&mut self, slot: u8, f: impl FnOnce(&mut Liveness)) {
        let Some(i) = RelaySlots::<N>::index(slot) else {
            return;
        };
        let before = self.liveness[i].status();
        f(&mut self.liveness[i]);
        let after = self.liveness[i].status();
        if before != after {
            debug!("relay {}: {} -> {}", slot, before as u8, after as u8);
            self.slots.publish(slot, after);
        }
    }

    fn bad_response(&mut self, slot: u8, err: LinkError) {
        warn!("relay {}: malformed reply: {}", slot, err);
        let limit = self.config.max_bad_responses;
        self.transition(slot, |live| live.bad_response(limit));
    }

    /// Zero-length write; the relay acks its address or it is absent.
    async fn probe(&mut self, address: u8) -> Result<(), LinkError> {
        self.bus.write(address, &[]).await.map_err(LinkError::bus)
    }

    /// Connect/disconnect push; anything but `ResponseOk` is a refusal.
    async fn push(&mut self, address: u8, request: &Request) -> Result<(), LinkError> {
        match self.exchange(address, request).await?.status() {
            Some(LinkStatus::ResponseOk) => Ok(()),
            Some(status) => Err(LinkError::Refused(status)),
            None => Err(LinkError::Unexpected),
        }
    }

    /// Write `request`, then read back exactly its reply.
    async fn exchange(&mut self, address: u8, request: &Request) -> Result<Response, LinkError> {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let len = request.encode(&mut buf)?;
        self.bus
            .write(address, &buf[..len])
            .await
            .map_err(LinkError::bus)?;

        let len = request.tag().response_len();
        self.bus
            .read(address, &mut buf[..len])
            .await
            .map_err(LinkError::bus)?;

        let response = Response::decode(&buf[..len])?;
        if !response.answers(request) {
            return Err(LinkError::Unexpected);
        }
        Ok(response)
    }
}
