//! Signals on the medium and the instants at which they change the noise.

use std::rc::Rc;
use std::time::Duration;

use crate::simulation::geometry::Position;
use crate::simulation::mode::{Preamble, WifiMode};
use crate::simulation::types::{HostId, MacAddress, MessageId};
use crate::time_driver::SimTime;

/// Everything needed to evaluate the reception of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInfo {
    pub message_id: MessageId,
    pub payload_bytes: u32,
    pub mode: WifiMode,
    pub preamble: Preamble,
    pub host: HostId,
    pub mac: MacAddress,
}

impl TransferInfo {
    pub fn header_mode(&self) -> WifiMode {
        self.mode.header_mode(self.preamble)
    }

    pub fn preamble_duration_us(&self) -> u64 {
        self.mode.plcp_preamble_duration_us(self.preamble)
    }

    pub fn header_duration_us(&self) -> u64 {
        self.mode.plcp_header_duration_us(self.preamble)
    }

    pub fn payload_duration_us(&self) -> u64 {
        self.mode.payload_duration_us(self.payload_bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterferenceKind {
    /// Energy on the medium without frame metadata. Only adds noise.
    Bare { source: Option<MacAddress> },
    /// A frame whose reception can be evaluated.
    Transfer(TransferInfo),
}

/// A signal occupying the medium during `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interference {
    start: SimTime,
    end: SimTime,
    source_position: Position,
    tx_power_dbm: f64,
    kind: InterferenceKind,
}

impl Interference {
    /// `tx_power_dbm` must already include the transmit antenna gain.
    pub(crate) fn new(start: SimTime, end: SimTime, source_position: Position, tx_power_dbm: f64, kind: InterferenceKind) -> Self {
        Self {
            start,
            end,
            source_position,
            tx_power_dbm,
            kind,
        }
    }

    pub fn start(&self) -> SimTime {
        self.start
    }

    pub fn end(&self) -> SimTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start)
    }

    pub fn source_position(&self) -> Position {
        self.source_position
    }

    /// Transmit power including the antenna gain.
    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    pub fn transfer(&self) -> Option<&TransferInfo> {
        match &self.kind {
            InterferenceKind::Transfer(info) => Some(info),
            InterferenceKind::Bare { .. } => None,
        }
    }

    pub fn host(&self) -> Option<HostId> {
        self.transfer().map(|t| t.host)
    }

    pub fn source_mac(&self) -> Option<MacAddress> {
        match &self.kind {
            InterferenceKind::Transfer(info) => Some(info.mac),
            InterferenceKind::Bare { source } => *source,
        }
    }

    /// On the air at `now`.
    pub fn is_active_at(&self, now: SimTime) -> bool {
        self.start <= now && now < self.end
    }
}

/// Start or end of a signal, as seen by a transfer it overlaps.
#[derive(Debug, Clone)]
pub struct NiChange {
    time: SimTime,
    is_end: bool,
    interference: Rc<Interference>,
}

impl NiChange {
    pub fn start_of(interference: &Rc<Interference>) -> Self {
        Self {
            time: interference.start(),
            is_end: false,
            interference: Rc::clone(interference),
        }
    }

    pub fn end_of(interference: &Rc<Interference>) -> Self {
        Self {
            time: interference.end(),
            is_end: true,
            interference: Rc::clone(interference),
        }
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn interference(&self) -> &Rc<Interference> {
        &self.interference
    }

    /// Signed change of the interference power: `+rx_w` at a start, `-rx_w`
    /// at an end.
    pub fn signed(&self, rx_w: f64) -> f64 {
        if self.is_end { -rx_w } else { rx_w }
    }
}

/// A transfer and the changes of every peer linked to it.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    interference: Rc<Interference>,
    changes: Vec<NiChange>,
    sorted: bool,
}

impl TransferRecord {
    pub fn new(interference: Rc<Interference>) -> Self {
        Self {
            interference,
            changes: Vec::new(),
            sorted: true,
        }
    }

    pub fn interference(&self) -> &Rc<Interference> {
        &self.interference
    }

    pub fn link_peer(&mut self, peer: &Rc<Interference>) {
        self.changes.push(NiChange::start_of(peer));
        self.changes.push(NiChange::end_of(peer));
        self.sorted = false;
    }

    pub fn peer_count(&self) -> usize {
        self.changes.len() / 2
    }

    /// Linked changes in ascending time. Changes at the same instant keep the
    /// order in which their peers were linked.
    pub fn ordered_changes(&mut self) -> &[NiChange] {
        if !self.sorted {
            self.changes.sort_by_key(|c| c.time);
            self.sorted = true;
        }
        &self.changes
    }
}
