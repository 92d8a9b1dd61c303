//! Canonical gamepad state shared between execution contexts.
//!
//! A [`GamepadStore`] holds the latest inbound, outbound and chat-pad
//! snapshots. Every access copies a whole snapshot in or out under a
//! short-held blocking mutex, so it is safe to call from interrupt handlers,
//! polling tasks and a second core alike.
//!
//! Writers raise a "new data" flag; readers clear it. A consumer that reads
//! twice without an intervening write sees `is_new == false` the second time
//! and should keep using its last-known snapshot.
//!
//! # Example
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use pad_core::store::GamepadStore;
//! use pad_proto::{Buttons, InboundSnapshot};
//!
//! let store = GamepadStore::<NoopRawMutex>::new();
//! let mut pad = InboundSnapshot::neutral();
//! pad.buttons = Buttons::A;
//! store.set_inbound(pad);
//!
//! let latest = store.get_inbound();
//! assert!(latest.is_new);
//! assert!(!store.get_inbound().is_new);
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use pad_proto::{ChatpadSnapshot, InboundSnapshot, OutboundSnapshot};
use portable_atomic::{AtomicBool, Ordering};

/// A snapshot copied out of the store, with whether it was written since the
/// previous read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Latest<T> {
    pub snapshot: T,
    pub is_new: bool,
}

/// One lock-protected snapshot plus its "new data" flag.
struct Slot<M: RawMutex, T> {
    value: Mutex<M, Cell<T>>,
    fresh: AtomicBool,
}

impl<M: RawMutex, T: Copy> Slot<M, T> {
    const fn new(value: T) -> Self {
        Self {
            value: Mutex::new(Cell::new(value)),
            fresh: AtomicBool::new(false),
        }
    }

    fn set(&self, value: T) {
        self.value.lock(|cell| {
            cell.set(value);
            self.fresh.store(true, Ordering::Release);
        });
    }

    fn take(&self) -> Latest<T> {
        self.value.lock(|cell| Latest {
            snapshot: cell.get(),
            is_new: self.fresh.swap(false, Ordering::AcqRel),
        })
    }

    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }
}

/// Three-way enable for auxiliary analog (per-button pressure) values.
///
/// The host side, the device side and the active profile must all agree
/// before pressure values are treated as valid. The combined flag is
/// recomputed whenever any input changes.
pub struct AnalogGate {
    host: AtomicBool,
    device: AtomicBool,
    profile: AtomicBool,
    enabled: AtomicBool,
}

impl AnalogGate {
    /// All flags cleared, so the gate starts closed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: AtomicBool::new(false),
            device: AtomicBool::new(false),
            profile: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
        }
    }

    /// Host-originated capability (the output protocol can carry pressure).
    pub fn set_host(&self, enabled: bool) {
        self.host.store(enabled, Ordering::Release);
        self.recompute();
    }

    /// Device-originated capability (the attached controller reports pressure).
    pub fn set_device(&self, enabled: bool) {
        self.device.store(enabled, Ordering::Release);
        self.recompute();
    }

    /// The active profile's analog setting.
    pub fn set_profile(&self, enabled: bool) {
        self.profile.store(enabled, Ordering::Release);
        self.recompute();
    }

    /// True only while host, device and profile flags are all set.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn recompute(&self) {
        let enabled = self.host.load(Ordering::Acquire)
            && self.device.load(Ordering::Acquire)
            && self.profile.load(Ordering::Acquire);
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl Default for AnalogGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest canonical state for one controller slot.
///
/// `M` selects the mutex: `CriticalSectionRawMutex` when the store is shared
/// with interrupts or another core, `NoopRawMutex` or `ThreadModeRawMutex`
/// when everything runs in one context.
pub struct GamepadStore<M: RawMutex> {
    inbound: Slot<M, InboundSnapshot>,
    outbound: Slot<M, OutboundSnapshot>,
    chatpad: Slot<M, ChatpadSnapshot>,
    analog: AnalogGate,
}

impl<M: RawMutex> GamepadStore<M> {
    /// Create a store with neutral snapshots and no "new" flags raised.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inbound: Slot::new(InboundSnapshot::neutral()),
            outbound: Slot::new(OutboundSnapshot::neutral()),
            chatpad: Slot::new(ChatpadSnapshot::neutral()),
            analog: AnalogGate::new(),
        }
    }

    /// Overwrite the inbound snapshot and raise its "new" flag.
    pub fn set_inbound(&self, snapshot: InboundSnapshot) {
        self.inbound.set(snapshot);
    }

    /// Copy out the inbound snapshot, clearing its "new" flag.
    pub fn get_inbound(&self) -> Latest<InboundSnapshot> {
        self.inbound.take()
    }

    /// Whether inbound data arrived since the last [`get_inbound`](Self::get_inbound),
    /// without consuming it.
    #[must_use]
    pub fn has_new_inbound(&self) -> bool {
        self.inbound.is_fresh()
    }

    /// Force the inbound snapshot to neutral. Raises the "new" flag so
    /// consumers release held inputs on their next read.
    pub fn reset_inbound(&self) {
        self.inbound.set(InboundSnapshot::neutral());
    }

    /// Overwrite the rumble snapshot and raise its "new" flag.
    pub fn set_outbound(&self, snapshot: OutboundSnapshot) {
        self.outbound.set(snapshot);
    }

    /// Copy out the rumble snapshot, clearing its "new" flag.
    pub fn get_outbound(&self) -> Latest<OutboundSnapshot> {
        self.outbound.take()
    }

    /// Whether rumble data arrived since the last read, without consuming it.
    #[must_use]
    pub fn has_new_outbound(&self) -> bool {
        self.outbound.is_fresh()
    }

    /// Stop rumble. Raises the "new" flag.
    pub fn reset_outbound(&self) {
        self.outbound.set(OutboundSnapshot::neutral());
    }

    /// Overwrite the chat-pad key buffer.
    pub fn set_chatpad(&self, snapshot: ChatpadSnapshot) {
        self.chatpad.set(snapshot);
    }

    /// Copy out the chat-pad key buffer, clearing its "new" flag.
    pub fn get_chatpad(&self) -> Latest<ChatpadSnapshot> {
        self.chatpad.take()
    }

    /// Release all chat-pad keys.
    pub fn reset_chatpad(&self) {
        self.chatpad.set(ChatpadSnapshot::neutral());
    }

    /// The auxiliary analog enable flags.
    #[must_use]
    pub fn analog(&self) -> &AnalogGate {
        &self.analog
    }

    /// Shorthand for `self.analog().is_enabled()`.
    #[must_use]
    pub fn analog_enabled(&self) -> bool {
        self.analog.is_enabled()
    }
}

impl<M: RawMutex> Default for GamepadStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
    use pad_proto::{AnalogStick, Buttons, Dpad};
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    fn pressed(buttons: Buttons) -> InboundSnapshot {
        InboundSnapshot {
            buttons,
            dpad: Dpad::UP_RIGHT,
            stick_l: AnalogStick::new(-1200, 3400),
            trigger_r: 99,
            ..InboundSnapshot::neutral()
        }
    }

    #[test]
    fn test_starts_neutral_and_stale() {
        let store = GamepadStore::<NoopRawMutex>::new();
        assert!(!store.has_new_inbound());
        assert!(!store.has_new_outbound());
        let latest = store.get_inbound();
        assert!(!latest.is_new);
        assert_eq!(latest.snapshot, InboundSnapshot::neutral());
        assert_eq!(store.get_outbound().snapshot, OutboundSnapshot::neutral());
        assert_eq!(store.get_chatpad().snapshot, ChatpadSnapshot::neutral());
    }

    #[test]
    fn test_read_clears_flag() {
        let store = GamepadStore::<NoopRawMutex>::new();
        let pad = pressed(Buttons::A | Buttons::START);
        store.set_inbound(pad);

        assert!(store.has_new_inbound());
        // peeking does not consume
        assert!(store.has_new_inbound());

        let first = store.get_inbound();
        assert!(first.is_new);
        assert_eq!(first.snapshot, pad);

        let second = store.get_inbound();
        assert!(!second.is_new);
        assert_eq!(second.snapshot, pad);
        assert!(!store.has_new_inbound());
    }

    #[test]
    fn test_last_write_wins() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.set_inbound(pressed(Buttons::A));
        store.set_inbound(pressed(Buttons::B));
        let latest = store.get_inbound();
        assert!(latest.is_new);
        assert_eq!(latest.snapshot.buttons, Buttons::B);
    }

    #[test]
    fn test_reset_raises_flag() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.set_inbound(pressed(Buttons::X));
        store.set_outbound(OutboundSnapshot {
            rumble_l: 200,
            rumble_r: 10,
        });
        let _ = store.get_inbound();
        let _ = store.get_outbound();

        store.reset_inbound();
        store.reset_outbound();
        let inbound = store.get_inbound();
        assert!(inbound.is_new);
        assert_eq!(inbound.snapshot, InboundSnapshot::neutral());
        let outbound = store.get_outbound();
        assert!(outbound.is_new);
        assert_eq!(outbound.snapshot, OutboundSnapshot::neutral());
    }

    #[test]
    fn test_directions_are_independent() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.set_outbound(OutboundSnapshot {
            rumble_l: 1,
            rumble_r: 2,
        });
        assert!(!store.has_new_inbound());
        assert!(store.has_new_outbound());

        store.set_chatpad(ChatpadSnapshot([0x31, 0x32, 0]));
        let chat = store.get_chatpad();
        assert!(chat.is_new);
        assert_eq!(chat.snapshot, ChatpadSnapshot([0x31, 0x32, 0]));
        store.reset_chatpad();
        assert_eq!(store.get_chatpad().snapshot, ChatpadSnapshot::neutral());
        // chat-pad traffic does not touch the outbound flag
        assert!(store.has_new_outbound());
    }

    #[test]
    fn test_analog_gate_needs_all_three() {
        let gate = AnalogGate::new();
        assert!(!gate.is_enabled());
        gate.set_host(true);
        gate.set_device(true);
        assert!(!gate.is_enabled());
        gate.set_profile(true);
        assert!(gate.is_enabled());
        gate.set_device(false);
        assert!(!gate.is_enabled());
        gate.set_device(true);
        assert!(gate.is_enabled());
        gate.set_host(false);
        assert!(!gate.is_enabled());
    }

    #[test]
    fn test_store_analog_shorthand() {
        let store = GamepadStore::<NoopRawMutex>::new();
        store.analog().set_host(true);
        store.analog().set_device(true);
        store.analog().set_profile(true);
        assert!(store.analog_enabled());
    }

    #[test]
    fn test_concurrent_writers_and_reader() {
        let store = Arc::new(GamepadStore::<CriticalSectionRawMutex>::new());

        let writers: Vec<_> = [Buttons::A, Buttons::B]
            .into_iter()
            .map(|buttons| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        store.set_inbound(pressed(buttons));
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let latest = store.get_inbound();
                    let buttons = latest.snapshot.buttons;
                    // never a torn mix of two writes
                    assert!(
                        buttons == Buttons::NONE || buttons == Buttons::A || buttons == Buttons::B
                    );
                    if buttons != Buttons::NONE {
                        assert_eq!(latest.snapshot.stick_l, AnalogStick::new(-1200, 3400));
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let last = store.get_inbound();
        assert!(last.snapshot.buttons == Buttons::A || last.snapshot.buttons == Buttons::B);
    }
}
