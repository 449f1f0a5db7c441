//! Interference tracking on the shared medium.
//!
//! - `entity`: signals on the air and the noise changes they cause
//! - `cache`: bounded, expiring store of transfers for PER lookups
//! - `tracker`: the tracker itself (insertion, pruning, PER, carrier sense)

pub(crate) mod cache;
pub mod entity;
pub mod tracker;

use std::time::Duration;

use crate::simulation::types::MacAddress;
use crate::time_driver::SimTime;

pub use entity::{Interference, InterferenceKind, NiChange, TransferInfo};
pub use tracker::{InterferenceTracker, Transmission};

/// Work the tracker hands to the host scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Tell the carrier-sense neighbors of `source` that the medium is busy
    /// for `duration`, starting at `start`.
    CarrierSense {
        source: MacAddress,
        duration: Duration,
        start: SimTime,
    },
}
