//! Input sources and the pump that feeds them into a [`GamepadStore`].

use core::future::Future;

use embassy_sync::blocking_mutex::raw::RawMutex;
use pad_proto::InboundSnapshot;

use crate::shaping::PadMapper;
use crate::store::GamepadStore;

/// Error type for input operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Bus or transport I/O error.
    Io,
    /// The controller's native report could not be decoded.
    Parse,
    /// The controller went away.
    Disconnected,
}

impl core::fmt::Display for InputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "input I/O error"),
            Self::Parse => write!(f, "malformed controller report"),
            Self::Disconnected => write!(f, "controller disconnected"),
        }
    }
}

/// Async trait for physical-controller adapters.
///
/// Implementations decode their controller's native report into canonical
/// form (normalizing the D-pad) and hand it over one snapshot at a time.
pub trait InputSource {
    /// Wait for and receive the next snapshot.
    fn receive(&mut self) -> impl Future<Output = Result<InboundSnapshot, InputError>>;

    /// Check if the controller is currently attached.
    fn is_connected(&self) -> bool;
}

/// Drives one [`InputSource`] into one [`GamepadStore`].
///
/// With a [`PadMapper`] installed, snapshots are remapped and shaped before
/// they are stored (write-time shaping).
pub struct InputPump<'a, I, M: RawMutex> {
    input: I,
    store: &'a GamepadStore<M>,
    mapper: Option<PadMapper>,
    invert_y: bool,
}

impl<'a, I: InputSource, M: RawMutex> InputPump<'a, I, M> {
    /// Create a pump that stores snapshots unchanged.
    pub fn new(input: I, store: &'a GamepadStore<M>) -> Self {
        Self {
            input,
            store,
            mapper: None,
            invert_y: false,
        }
    }

    /// Shape snapshots with `mapper` before storing them. `invert_y` is the
    /// board's stick Y convention.
    #[must_use]
    pub fn with_mapper(mut self, mapper: PadMapper, invert_y: bool) -> Self {
        self.store.analog().set_profile(mapper.analog_enabled());
        self.mapper = Some(mapper);
        self.invert_y = invert_y;
        self
    }

    /// Replace the active mapper, e.g. after a profile switch.
    pub fn set_mapper(&mut self, mapper: Option<PadMapper>) {
        self.store
            .analog()
            .set_profile(mapper.as_ref().is_some_and(PadMapper::analog_enabled));
        self.mapper = mapper;
    }

    /// Run the pump indefinitely.
    pub async fn run(&mut self) -> ! {
        loop {
            let _ = self.process_one().await;
        }
    }

    /// Receive one snapshot and store it.
    ///
    /// On [`InputError::Disconnected`] both directions of the store are reset
    /// so no button stays held and no rumble keeps running. Other errors drop
    /// the event.
    pub async fn process_one(&mut self) -> Result<(), InputError> {
        match self.input.receive().await {
            Ok(pad) => {
                let pad = match &self.mapper {
                    Some(mapper) => mapper.map(&pad, self.invert_y),
                    None => pad,
                };
                self.store.set_inbound(pad);
                Ok(())
            }
            Err(InputError::Disconnected) => {
                info!("input disconnected, resetting store");
                self.store.reset_inbound();
                self.store.reset_outbound();
                Err(InputError::Disconnected)
            }
            Err(e) => {
                trace!("input event dropped: {}", e);
                Err(e)
            }
        }
    }

    /// The wrapped input source.
    #[must_use]
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Mutable access to the wrapped input source.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Decompose the pump into its input source.
    pub fn into_input(self) -> I {
        self.input
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::fix16::Fix16;
    use crate::profile::ProfileRecord;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use pad_proto::{AnalogStick, Buttons, OutboundSnapshot};
    use std::vec;
    use std::vec::Vec;

    struct MockInput {
        events: Vec<Result<InboundSnapshot, InputError>>,
        index: usize,
    }

    impl MockInput {
        fn new(events: Vec<Result<InboundSnapshot, InputError>>) -> Self {
            Self { events, index: 0 }
        }
    }

    impl InputSource for MockInput {
        fn receive(&mut self) -> impl Future<Output = Result<InboundSnapshot, InputError>> {
            let result = self
                .events
                .get(self.index)
                .copied()
                .unwrap_or(Err(InputError::Disconnected));
            self.index += 1;
            core::future::ready(result)
        }

        fn is_connected(&self) -> bool {
            self.index < self.events.len()
        }
    }

    fn pad(buttons: Buttons) -> InboundSnapshot {
        InboundSnapshot {
            buttons,
            stick_l: AnalogStick::new(300, 400),
            ..InboundSnapshot::neutral()
        }
    }

    #[test]
    fn test_pump_stores_snapshot() {
        let store = GamepadStore::<NoopRawMutex>::new();
        let mut pump = InputPump::new(MockInput::new(vec![Ok(pad(Buttons::A))]), &store);

        assert!(block_on(pump.process_one()).is_ok());
        let latest = store.get_inbound();
        assert!(latest.is_new);
        assert_eq!(latest.snapshot, pad(Buttons::A));
    }

    #[test]
    fn test_disconnect_resets_both_directions() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.set_outbound(OutboundSnapshot {
            rumble_l: 255,
            rumble_r: 255,
        });
        let events = vec![Ok(pad(Buttons::B)), Err(InputError::Disconnected)];
        let mut pump = InputPump::new(MockInput::new(events), &store);

        block_on(pump.process_one()).unwrap();
        let _ = store.get_inbound();
        let _ = store.get_outbound();

        let result = block_on(pump.process_one());
        assert_eq!(result, Err(InputError::Disconnected));
        let inbound = store.get_inbound();
        assert!(inbound.is_new);
        assert_eq!(inbound.snapshot, InboundSnapshot::neutral());
        let outbound = store.get_outbound();
        assert!(outbound.is_new);
        assert_eq!(outbound.snapshot, OutboundSnapshot::neutral());
    }

    #[test]
    fn test_parse_error_keeps_last_snapshot() {
        let store = GamepadStore::<NoopRawMutex>::new();
        let events = vec![Ok(pad(Buttons::X)), Err(InputError::Parse)];
        let mut pump = InputPump::new(MockInput::new(events), &store);

        block_on(pump.process_one()).unwrap();
        let _ = store.get_inbound();
        assert_eq!(block_on(pump.process_one()), Err(InputError::Parse));
        let latest = store.get_inbound();
        assert!(!latest.is_new);
        assert_eq!(latest.snapshot.buttons, Buttons::X);
    }

    #[test]
    fn test_mapper_applied_at_write_time() {
        let mut record = ProfileRecord::DEFAULT;
        record.buttons[0] = Buttons::START;
        record.trigger_l.dz_inner = Fix16::from_bits(32768);
        let mapper = PadMapper::new(&record);

        let store = GamepadStore::<NoopRawMutex>::new();
        let mut input = pad(Buttons::A);
        input.trigger_l = 100;
        let mut pump =
            InputPump::new(MockInput::new(vec![Ok(input)]), &store).with_mapper(mapper, true);

        block_on(pump.process_one()).unwrap();
        let stored = store.get_inbound().snapshot;
        assert_eq!(stored.buttons, Buttons::START);
        assert_eq!(stored.trigger_l, 0);
        assert_eq!(stored.stick_l, AnalogStick::new(300, -400));
    }

    #[test]
    fn test_mapper_feeds_analog_gate() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.analog().set_host(true);
        store.analog().set_device(true);

        let pump = InputPump::new(MockInput::new(vec![]), &store)
            .with_mapper(PadMapper::new(&ProfileRecord::DEFAULT), false);
        assert!(store.analog_enabled());

        let mut pump = pump;
        pump.set_mapper(None);
        assert!(!store.analog_enabled());
    }
}
