//! Shared-medium interference tracker.
//!
//! The tracker owns every signal currently on the air. For each new signal it:
//!
//! - rejects bad timing (start in the past, empty interval)
//! - prunes signals that ended more than the prune slack ago
//! - links the signal with every active peer whose transmitter is within the
//!   signal attenuation (SAT) radius, in both directions
//! - stores transfers in a bounded cache for later PER evaluation
//! - notifies the carrier-sense neighbors of the sender at the signal's start
//!
//! # PER evaluation
//!
//! A frame is split into preamble, PLCP header and payload. The preamble only
//! synchronizes the receiver and carries no bits. Between two consecutive
//! interference changes the SINR is constant, so each such chunk contributes
//! one factor to the packet success rate:
//!
//! ```text
//! SNR   = P_rx / (N_floor(mode) + I)
//! bits  = floor(phy_rate × duration_us / 10⁶)
//! PSR  *= chunk_success_rate(mode, SNR, bits)
//! PER   = 1 - PSR
//! ```
//!
//! Time after the last change up to the frame end is evaluated with the
//! payload mode.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::cache::TransferCache;
use super::entity::{Interference, InterferenceKind, NiChange, TransferInfo, TransferRecord};
use super::ChannelEvent;
use crate::control::config::TrackerConfig;
use crate::error::PhyError;
use crate::simulation::error_model::ErrorRateModel;
use crate::simulation::geometry::Position;
use crate::simulation::mode::WifiMode;
use crate::simulation::propagation::PropagationLossModel;
use crate::simulation::signal_calculations::{db_to_ratio, dbm_to_w, noise_floor_w};
use crate::simulation::topology::{CarrierSenseTopology, LinkRanges, RangedTopology};
use crate::simulation::types::{HostId, MacAddress, MessageId};
use crate::time_driver::{Clock, Scheduler, SimTime};

const ACTIVE_SET_WARNING_THRESHOLD: f64 = 0.8; // 80%

/// Where and when a signal is put on the medium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transmission {
    pub start: SimTime,
    pub end: SimTime,
    pub position: Position,
    /// Transmit power before the antenna gain is applied.
    pub tx_power_dbm: f64,
}

pub struct InterferenceTracker<T: CarrierSenseTopology> {
    config: TrackerConfig,
    error_model: ErrorRateModel,
    loss_model: Box<dyn PropagationLossModel>,
    topology: T,
    noise_figure_ratio: f64,
    active: Vec<Rc<Interference>>,
    transfers: TransferCache,
    // tx power (bit pattern) -> SAT radius
    sat_radius_cache: RefCell<HashMap<u64, f64>>,
}

impl<T: CarrierSenseTopology> InterferenceTracker<T> {
    pub fn new(config: TrackerConfig, loss_model: Box<dyn PropagationLossModel>, topology: T) -> Self {
        let transfers = TransferCache::new(
            config.transfer_cache_capacity,
            std::time::Duration::from_micros(config.transfer_grace_us),
        );
        Self {
            error_model: ErrorRateModel::new(config.error_model),
            noise_figure_ratio: db_to_ratio(config.noise_figure_db),
            config,
            loss_model,
            topology,
            active: Vec::new(),
            transfers,
            sat_radius_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn error_model(&self) -> &ErrorRateModel {
        &self.error_model
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut T {
        &mut self.topology
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn cached_transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Number of peers linked to a cached transfer. Does not count as a use of
    /// the cache entry.
    pub fn linked_peer_count(&self, id: MessageId) -> Option<usize> {
        self.transfers.peek(id).map(|r| r.peer_count())
    }

    pub fn set_error_model(&mut self, error_model: ErrorRateModel) {
        self.config.error_model = error_model.kind();
        self.error_model = error_model;
        self.sat_radius_cache.borrow_mut().clear();
    }

    pub fn set_loss_model(&mut self, loss_model: Box<dyn PropagationLossModel>) {
        self.loss_model = loss_model;
        self.sat_radius_cache.borrow_mut().clear();
    }

    pub fn set_sat_dbm(&mut self, sat_dbm: f64) {
        self.config.sat_dbm = sat_dbm;
        self.sat_radius_cache.borrow_mut().clear();
    }

    pub fn set_rx_gain_dbm(&mut self, gain: f64) {
        self.config.rx_gain_dbm = gain;
        self.sat_radius_cache.borrow_mut().clear();
    }

    /// Applies to signals added after the call.
    pub fn set_tx_gain_dbm(&mut self, gain: f64) {
        self.config.tx_gain_dbm = gain;
        self.sat_radius_cache.borrow_mut().clear();
    }

    /// Put an anonymous signal on the medium. It only adds noise to the
    /// transfers it overlaps.
    pub fn add_interference(
        &mut self,
        scheduler: &mut dyn Scheduler,
        transmission: Transmission,
        source: Option<MacAddress>,
    ) -> Result<Rc<Interference>, PhyError> {
        self.insert(scheduler, transmission, InterferenceKind::Bare { source })
    }

    /// Put a frame on the medium and keep it available for PER evaluation.
    pub fn add_transfer(
        &mut self,
        scheduler: &mut dyn Scheduler,
        transmission: Transmission,
        info: TransferInfo,
    ) -> Result<Rc<Interference>, PhyError> {
        for mode in [info.mode, info.header_mode()] {
            if !self.error_model.supports(&mode) {
                return Err(PhyError::UnsupportedConfiguration {
                    mode: mode.name().to_string(),
                    model: self.error_model.kind().name(),
                });
            }
        }
        self.insert(scheduler, transmission, InterferenceKind::Transfer(info))
    }

    fn insert(
        &mut self,
        scheduler: &mut dyn Scheduler,
        transmission: Transmission,
        kind: InterferenceKind,
    ) -> Result<Rc<Interference>, PhyError> {
        let now = scheduler.now();
        let Transmission { start, end, position, tx_power_dbm } = transmission;
        if start < now {
            return Err(PhyError::StartInPast { start, now });
        }
        if start >= end {
            return Err(PhyError::EmptyInterval { start, end });
        }

        self.prune(now);

        let interference = Rc::new(Interference::new(
            start,
            end,
            position,
            tx_power_dbm + self.config.tx_gain_dbm,
            kind,
        ));
        self.link_with_active(&interference, now);

        if let Some(source) = interference.source_mac() {
            let event = ChannelEvent::CarrierSense {
                source,
                duration: interference.duration(),
                start,
            };
            if start == now {
                self.handle_event(event);
            } else {
                scheduler.schedule_after(start.duration_since(now), event);
            }
        }

        self.active.push(Rc::clone(&interference));
        self.check_active_capacity();
        Ok(interference)
    }

    /// Link `interference` and the active set in both directions, then cache
    /// it if it is a transfer.
    fn link_with_active(&mut self, interference: &Rc<Interference>, now: SimTime) {
        let new_radius = self.maximal_sat_radius(interference.tx_power_dbm());
        let mut own_peers = Vec::new();
        let mut linked_back = Vec::new();
        for peer in &self.active {
            let distance = interference.source_position().distance_to(&peer.source_position());
            if interference.transfer().is_some() && distance < self.maximal_sat_radius(peer.tx_power_dbm()) {
                own_peers.push(Rc::clone(peer));
            }
            if let Some(peer_info) = peer.transfer() {
                if distance < new_radius {
                    linked_back.push(peer_info.message_id);
                }
            }
        }

        for id in linked_back {
            if let Some(record) = self.transfers.peek_mut(id) {
                record.link_peer(interference);
            }
        }

        if let Some(info) = interference.transfer() {
            let mut record = TransferRecord::new(Rc::clone(interference));
            for peer in &own_peers {
                record.link_peer(peer);
            }
            log::trace!("{} from {} linked with {} peers", info.message_id, info.host, own_peers.len());
            self.transfers.insert(info.message_id, record, now);
        }
    }

    fn prune(&mut self, now: SimTime) {
        let slack = self.config.prune_slack_us;
        let before = self.active.len();
        self.active.retain(|i| i.end().saturating_add_micros(slack) >= now);
        let pruned = before - self.active.len();
        if pruned > 0 {
            log::trace!("Pruned {} expired interferences at {}", pruned, now);
        }
    }

    fn check_active_capacity(&self) {
        let capacity = self.config.active_set_warning_capacity;
        let len = self.active.len();
        if len > capacity {
            log::error!(
                "Active interference set over capacity: {}/{}, pruning is falling behind",
                len,
                capacity
            );
        } else if len as f64 >= capacity as f64 * ACTIVE_SET_WARNING_THRESHOLD {
            log::warn!("Active interference set approaching capacity: {}/{}", len, capacity);
        }
    }

    /// Dispatch an event previously handed to the scheduler.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::CarrierSense { source, duration, start } => {
                let neighbors = self.topology.carrier_sense_neighbors(source);
                log::debug!(
                    "Carrier sense from {} at {}: {} neighbors busy for {:?}",
                    source,
                    start,
                    neighbors.len(),
                    duration
                );
                for mac in neighbors {
                    match self.topology.resolve_mac(mac) {
                        Some(listener) => listener.notify_carrier_sense(duration),
                        None => log::warn!("Carrier-sense neighbor {} of {} has no listener", mac, source),
                    }
                }
            }
        }
    }

    /// Power of `interference` received at `at`, in watts, including both
    /// antenna gains.
    pub fn rx_power_w(&self, interference: &Interference, at: Position) -> f64 {
        let distance = interference.source_position().distance_to(&at);
        dbm_to_w(self.loss_model.rx_power_dbm(interference.tx_power_dbm(), distance) + self.config.rx_gain_dbm)
    }

    /// Interference power at `point` from every signal on the air right now.
    /// Signals sent by `exclude` are left out.
    pub fn calculate_noise_interference_w(&self, clock: &dyn Clock, point: Position, exclude: Option<HostId>) -> f64 {
        let now = clock.now();
        self.active
            .iter()
            .filter(|i| i.is_active_at(now))
            .filter(|i| exclude.is_none() || i.host() != exclude)
            .map(|i| self.rx_power_w(i, point))
            .sum()
    }

    /// Packet error rate of a cached transfer at `receiver`.
    ///
    /// # Returns
    /// * `Ok(1.0)` if the transfer is unknown (never added, evicted or expired)
    /// * `Ok(per)` with `per` in `[0, 1]` otherwise
    /// * `Err(UnsupportedConfiguration)` if the error model was swapped for one
    ///   that does not support the transfer's modes
    pub fn calculate_per(&mut self, id: MessageId, receiver: Position) -> Result<f64, PhyError> {
        let Some(record) = self.transfers.get(id) else {
            log::warn!("No transfer found for {}, assuming it is lost", id);
            return Ok(1.0);
        };
        let transfer = Rc::clone(record.interference());
        let changes: Vec<NiChange> = record.ordered_changes().to_vec();
        let Some(info) = transfer.transfer() else {
            return Ok(1.0);
        };

        let rx_w = self.rx_power_w(&transfer, receiver);
        let start = transfer.start().as_micros();
        let end = transfer.end().as_micros();
        let start_header = start + info.preamble_duration_us();
        let start_payload = start_header + info.header_duration_us();
        let header_mode = info.header_mode();
        let payload_mode = info.mode;

        let mut noise_w = 0.0;
        let mut last = 0u64;
        let mut psr = 1.0;
        for change in &changes {
            let t = change.time().as_micros();
            if start < t && last < t {
                let section_start = start.max(last);
                let section_end = end.min(t);
                if section_end >= start_header && section_start < start_payload {
                    let duration = start_payload.min(section_end) - start_header.max(section_start);
                    psr *= self.chunk_success_rate(rx_w, noise_w, &header_mode, duration)?;
                }
                if section_end >= start_payload {
                    let duration = section_end - start_payload.max(section_start);
                    psr *= self.chunk_success_rate(rx_w, noise_w, &payload_mode, duration)?;
                }
            }
            noise_w += change.signed(self.rx_power_w(change.interference(), receiver));
            last = t;
            if end <= t {
                break;
            }
        }
        if last < end {
            let duration = end - last.max(start);
            psr *= self.chunk_success_rate(rx_w, noise_w, &payload_mode, duration)?;
        }

        Ok(1.0 - psr)
    }

    fn chunk_success_rate(&self, rx_w: f64, noise_w: f64, mode: &WifiMode, duration_us: u64) -> Result<f64, PhyError> {
        if duration_us == 0 {
            return Ok(1.0);
        }
        let snr = self.calculate_snr(rx_w, noise_w, mode);
        let nbits = (mode.phy_rate_bps() as u128 * duration_us as u128 / 1_000_000) as u64;
        self.error_model.chunk_success_rate(mode, snr, nbits)
    }

    /// Signal to interference-plus-noise ratio (linear) for `mode`.
    pub fn calculate_snr(&self, signal_w: f64, interference_w: f64, mode: &WifiMode) -> f64 {
        signal_w / (self.noise_floor_w(mode) + interference_w)
    }

    pub fn noise_floor_w(&self, mode: &WifiMode) -> f64 {
        noise_floor_w(mode.bandwidth_hz(), self.noise_figure_ratio)
    }

    /// Noise floor of the 22 MHz DSSS channel.
    pub fn default_noise_floor_w(&self) -> f64 {
        self.noise_floor_w(&WifiMode::DSSS_1MBPS)
    }

    /// Largest distance at which a signal sent with `tx_power_dbm` arrives with
    /// at least `rx_power_dbm`, antenna gains included.
    pub fn calculate_maximal_radius(&self, tx_power_dbm: f64, rx_power_dbm: f64) -> f64 {
        self.loss_model
            .distance(tx_power_dbm + self.config.tx_gain_dbm, rx_power_dbm - self.config.rx_gain_dbm)
    }

    /// Distance at which a signal sent with `tx_power_dbm` (gain included)
    /// drops below the SAT threshold.
    pub fn maximal_sat_radius(&self, tx_power_dbm: f64) -> f64 {
        let key = tx_power_dbm.to_bits();
        if let Some(radius) = self.sat_radius_cache.borrow().get(&key) {
            return *radius;
        }
        let radius = self.loss_model.distance(tx_power_dbm, self.config.sat_dbm);
        self.sat_radius_cache.borrow_mut().insert(key, radius);
        radius
    }
}

impl InterferenceTracker<RangedTopology> {
    /// Size the topology's ranges for its strongest transmitter. Does nothing
    /// for an empty topology.
    pub fn update_topology_ranges(&mut self) {
        let Some(max_tx) = self.topology.max_tx_power_dbm() else {
            return;
        };
        let thresholds = self.topology.config().clone();
        let ranges = LinkRanges {
            carrier_sense: self.calculate_maximal_radius(max_tx, thresholds.cs_threshold_dbm),
            reception: self.calculate_maximal_radius(max_tx, thresholds.rx_sensitivity_dbm),
            attenuation: self.calculate_maximal_radius(max_tx, self.config.sat_dbm),
        };
        self.topology.set_ranges(ranges);
    }
}
