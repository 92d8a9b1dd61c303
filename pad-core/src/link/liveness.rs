//! Per-slot relay liveness, as tracked by the Poller.
//!
//! ```text
//! NotConnected --probe ok + push acked--> NotReady --status Ready--> Ready
//!      ^                                     |                         |
//!      +---------- probe/bus failure --------+-------------------------+
//! ```
//!
//! `ResponseOk` only ever appears on the wire as a push acknowledgement; it
//! is never a tracked state.

use pad_proto::LinkStatus;

/// Liveness of one relay slot plus its run of malformed responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Liveness {
    status: LinkStatus,
    bad_responses: u8,
}

impl Liveness {
    /// A slot that has never answered.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: LinkStatus::NotConnected,
            bad_responses: 0,
        }
    }

    /// Current tracked status; never `ResponseOk`.
    #[must_use]
    pub const fn status(&self) -> LinkStatus {
        self.status
    }

    /// Whether the slot takes part in the pad exchange.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.status, LinkStatus::Ready)
    }

    /// The relay did not answer its address, or a transfer to it failed.
    pub fn bus_failed(&mut self) {
        self.bad_responses = 0;
        self.status = LinkStatus::NotConnected;
    }

    /// Result of the connect/disconnect push that follows a good probe.
    pub fn acknowledged(&mut self, ok: bool) {
        if ok {
            // a push never promotes past NotReady; only a status query can
            if self.status != LinkStatus::Ready {
                self.status = LinkStatus::NotReady;
            }
        } else {
            self.bus_failed();
        }
    }

    /// The relay reported its own status.
    pub fn status_reported(&mut self, reported: LinkStatus) {
        if self.status == LinkStatus::NotConnected {
            return;
        }
        self.status = if reported == LinkStatus::Ready {
            LinkStatus::Ready
        } else {
            LinkStatus::NotReady
        };
    }

    /// The relay is no longer an enabled target.
    pub fn disabled(&mut self) {
        if self.status == LinkStatus::Ready {
            self.status = LinkStatus::NotReady;
        }
    }

    /// A pad exchange completed.
    pub fn exchanged(&mut self) {
        self.bad_responses = 0;
    }

    /// A pad reply was malformed. After `limit` in a row a `Ready` slot
    /// drops back to `NotReady`.
    pub fn bad_response(&mut self, limit: u8) {
        self.bad_responses = self.bad_responses.saturating_add(1);
        if self.bad_responses >= limit {
            self.bad_responses = 0;
            self.disabled();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> Liveness {
        let mut live = Liveness::new();
        live.acknowledged(true);
        live.status_reported(LinkStatus::Ready);
        live
    }

    #[test]
    fn test_failed_probe_stays_disconnected() {
        let mut live = Liveness::new();
        live.bus_failed();
        assert_eq!(live.status(), LinkStatus::NotConnected);
    }

    #[test]
    fn test_happy_path() {
        let mut live = Liveness::new();
        live.acknowledged(true);
        assert_eq!(live.status(), LinkStatus::NotReady);
        live.status_reported(LinkStatus::Ready);
        assert_eq!(live.status(), LinkStatus::Ready);
        assert!(live.is_ready());
    }

    #[test]
    fn test_failed_ack_disconnects() {
        let mut live = ready();
        live.acknowledged(false);
        assert_eq!(live.status(), LinkStatus::NotConnected);
    }

    #[test]
    fn test_probe_failure_from_ready() {
        let mut live = ready();
        live.bus_failed();
        assert_eq!(live.status(), LinkStatus::NotConnected);
    }

    #[test]
    fn test_status_needs_prior_ack() {
        let mut live = Liveness::new();
        live.status_reported(LinkStatus::Ready);
        assert_eq!(live.status(), LinkStatus::NotConnected);
    }

    #[test]
    fn test_busy_relay_is_not_ready() {
        let mut live = ready();
        live.status_reported(LinkStatus::NotReady);
        assert_eq!(live.status(), LinkStatus::NotReady);
        // an ack alone does not restore readiness
        live.acknowledged(true);
        assert_eq!(live.status(), LinkStatus::NotReady);
    }

    #[test]
    fn test_ack_keeps_ready() {
        let mut live = ready();
        live.acknowledged(true);
        assert_eq!(live.status(), LinkStatus::Ready);
    }

    #[test]
    fn test_bad_responses_downgrade() {
        let mut live = ready();
        live.bad_response(3);
        live.bad_response(3);
        assert!(live.is_ready());
        live.exchanged();
        live.bad_response(3);
        live.bad_response(3);
        assert!(live.is_ready());
        live.bad_response(3);
        assert_eq!(live.status(), LinkStatus::NotReady);
    }
}
