//! Carrier-sense topology.
//!
//! The interference tracker does not know who is listening. When a
//! transmission starts it asks a [`CarrierSenseTopology`] for the radios that
//! can sense the sender and tells each of them that the medium is busy.
//!
//! [`RangedTopology`] is the reference implementation: a flat list of radios
//! whose carrier-sense neighbors are every other radio strictly within the
//! carrier-sense range.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::control::config::TopologyConfig;
use crate::simulation::geometry::Position;
use crate::simulation::types::{HostId, MacAddress};

/// Receiver side of a carrier-sense notification (usually a MAC layer).
pub trait CarrierSenseListener {
    fn notify_carrier_sense(&mut self, duration: Duration);
}

pub trait CarrierSenseTopology {
    /// Radios that sense a transmission from `mac`. Never contains `mac`.
    fn carrier_sense_neighbors(&self, mac: MacAddress) -> Vec<MacAddress>;

    fn resolve_mac(&mut self, mac: MacAddress) -> Option<&mut dyn CarrierSenseListener>;
}

/// What a radio has learned about the medium from carrier sense.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediumState {
    /// Number of busy-medium notifications received.
    pub notifications: u32,
    /// Sum of all notified busy durations.
    pub busy_total: Duration,
    pub last_busy: Option<Duration>,
}

impl CarrierSenseListener for MediumState {
    fn notify_carrier_sense(&mut self, duration: Duration) {
        self.notifications += 1;
        self.busy_total += duration;
        self.last_busy = Some(duration);
    }
}

#[derive(Debug, Clone)]
pub struct TopologyNode {
    pub mac: MacAddress,
    pub host: HostId,
    pub position: Position,
    pub tx_power_dbm: f64,
    pub medium: MediumState,
}

/// Distances derived from the radio thresholds, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkRanges {
    /// Radius inside which a transmission is sensed.
    pub carrier_sense: f64,
    /// Radius inside which a transmission can be received.
    pub reception: f64,
    /// Radius inside which a transmission counts as interference.
    pub attenuation: f64,
}

pub struct RangedTopology {
    config: TopologyConfig,
    nodes: BTreeMap<MacAddress, TopologyNode>,
    ranges: LinkRanges,
}

impl RangedTopology {
    pub fn new(config: TopologyConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            ranges: LinkRanges::default(),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Register a radio. A radio already registered under `mac` is replaced.
    pub fn add_node(&mut self, mac: MacAddress, host: HostId, position: Position, tx_power_dbm: f64) {
        self.nodes.insert(
            mac,
            TopologyNode {
                mac,
                host,
                position,
                tx_power_dbm,
                medium: MediumState::default(),
            },
        );
    }

    pub fn node(&self, mac: MacAddress) -> Option<&TopologyNode> {
        self.nodes.get(&mac)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strongest transmit power among the registered radios. Ranges are sized
    /// for it so that no radio is ever out of range of a stronger peer.
    pub fn max_tx_power_dbm(&self) -> Option<f64> {
        self.nodes.values().map(|n| n.tx_power_dbm).reduce(f64::max)
    }

    pub fn ranges(&self) -> LinkRanges {
        self.ranges
    }

    pub fn set_ranges(&mut self, ranges: LinkRanges) {
        log::info!(
            "WiFi ranges: carrier sense {:.1} m, reception {:.1} m, attenuation {:.1} m",
            ranges.carrier_sense,
            ranges.reception,
            ranges.attenuation
        );
        self.ranges = ranges;
    }

    /// Radios within reception range of `mac`, excluding `mac` itself.
    pub fn reception_neighbors(&self, mac: MacAddress) -> Vec<MacAddress> {
        self.neighbors_within(mac, self.ranges.reception)
    }

    fn neighbors_within(&self, mac: MacAddress, range: f64) -> Vec<MacAddress> {
        let Some(origin) = self.nodes.get(&mac) else {
            return Vec::new();
        };
        self.nodes
            .values()
            .filter(|n| n.mac != mac && origin.position.distance_to(&n.position) < range)
            .map(|n| n.mac)
            .collect()
    }
}

impl CarrierSenseTopology for RangedTopology {
    fn carrier_sense_neighbors(&self, mac: MacAddress) -> Vec<MacAddress> {
        self.neighbors_within(mac, self.ranges.carrier_sense)
    }

    fn resolve_mac(&mut self, mac: MacAddress) -> Option<&mut dyn CarrierSenseListener> {
        self.nodes
            .get_mut(&mac)
            .map(|n| &mut n.medium as &mut dyn CarrierSenseListener)
    }
}
