//! Scene runner driving the interference tracker through a discrete-event loop.
//!
//! Flow:
//! 1) Every scene transmission is queued at its start time, plus a random
//!    delay of up to `tx_maximum_random_delay_us` drawn from the seeded RNG.
//! 2) When a transmission starts it is handed to the tracker as a transfer,
//!    and an evaluation is queued for the instant the frame ends.
//! 3) Carrier-sense events scheduled by the tracker are routed back to it.
//! 4) At the end of a frame the PER is computed for every radio within
//!    reception range, and delivery is sampled from it.
//!
//! A given seed always yields the same jitter and delivery draws.

use std::collections::BTreeMap;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::scene::Scene;
use crate::control::config::SimulatorConfig;
use crate::simulation::interference::{ChannelEvent, InterferenceTracker, TransferInfo, Transmission};
use crate::simulation::mode::WifiMode;
use crate::simulation::topology::{LinkRanges, MediumState, RangedTopology};
use crate::simulation::types::{MacAddress, MessageId};
use crate::time_driver::{Clock, EventQueue, SimTime};

/// Events of the scene timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// Index into the scene's transmissions.
    StartTransmission(usize),
    EvaluateReception {
        message: MessageId,
        sender: u32,
        receivers: Vec<MacAddress>,
    },
    Channel(ChannelEvent),
}

impl From<ChannelEvent> for SceneEvent {
    fn from(event: ChannelEvent) -> Self {
        SceneEvent::Channel(event)
    }
}

/// Reception statistics of one sender/receiver pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkStats {
    pub frames: u32,
    pub delivered: u32,
    pub per_sum: f64,
}

impl LinkStats {
    pub fn mean_per(&self) -> f64 {
        if self.frames == 0 { 0.0 } else { self.per_sum / self.frames as f64 }
    }

    pub fn delivery_ratio(&self) -> f64 {
        if self.frames == 0 { 0.0 } else { self.delivered as f64 / self.frames as f64 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node_id: u32,
    pub mac: MacAddress,
    pub medium: MediumState,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneReport {
    /// Keyed by (sender node id, receiver node id).
    pub links: BTreeMap<(u32, u32), LinkStats>,
    /// Frames accepted by the tracker.
    pub sent: usize,
    /// Frames the tracker refused because of their timing.
    pub rejected: usize,
    pub nodes: Vec<NodeReport>,
    pub ranges: LinkRanges,
}

pub struct SceneRunner<'a> {
    scene: &'a Scene,
    tracker: InterferenceTracker<RangedTopology>,
    queue: EventQueue<SceneEvent>,
    rng: StdRng,
    report: SceneReport,
}

impl<'a> SceneRunner<'a> {
    pub fn new(scene: &'a Scene, config: &SimulatorConfig) -> Self {
        let mut topology = RangedTopology::new(config.topology.clone());
        for node in &scene.nodes {
            topology.add_node(node.mac_address(), node.host(), node.position, node.tx_power_dbm);
        }
        let mut tracker = InterferenceTracker::new(config.tracker.clone(), Box::new(config.propagation.build()), topology);
        tracker.update_topology_ranges();

        Self {
            scene,
            tracker,
            queue: EventQueue::new(),
            rng: StdRng::seed_from_u64(scene.seed),
            report: SceneReport::default(),
        }
    }

    pub fn run(mut self) -> anyhow::Result<SceneReport> {
        let max_delay = self.scene.tx_maximum_random_delay_us;
        for (idx, tx) in self.scene.transmissions.iter().enumerate() {
            let jitter = if max_delay > 0 { self.rng.gen_range(0..=max_delay) } else { 0 };
            let start = SimTime::from_micros(tx.start_us.saturating_add(jitter));
            self.queue.schedule_at(start, SceneEvent::StartTransmission(idx));
        }
        log::info!(
            "Replaying {} transmissions between {} nodes",
            self.scene.transmissions.len(),
            self.scene.nodes.len()
        );

        while let Some((_, event)) = self.queue.pop_next() {
            match event {
                SceneEvent::StartTransmission(idx) => self.start_transmission(idx)?,
                SceneEvent::EvaluateReception { message, sender, receivers } => {
                    self.evaluate_reception(message, sender, &receivers)?
                }
                SceneEvent::Channel(event) => self.tracker.handle_event(event),
            }
        }

        self.report.ranges = self.tracker.topology().ranges();
        self.report.nodes = self
            .tracker
            .topology()
            .nodes()
            .map(|n| NodeReport {
                node_id: n.host.0,
                mac: n.mac,
                medium: n.medium.clone(),
            })
            .collect();
        log::info!(
            "Scene finished at {}: {} frames sent, {} rejected",
            self.queue.now(),
            self.report.sent,
            self.report.rejected
        );
        Ok(self.report)
    }

    fn start_transmission(&mut self, idx: usize) -> anyhow::Result<()> {
        let scene = self.scene;
        let tx = scene
            .transmissions
            .get(idx)
            .with_context(|| format!("Transmission {} is not part of the scene", idx))?;
        let node = scene
            .node(tx.sender)
            .with_context(|| format!("Transmission {} references unknown sender {}", idx, tx.sender))?;
        let mode = WifiMode::by_name(&tx.mode)?;

        let now = self.queue.now();
        let end = now.saturating_add_micros(mode.tx_duration_us(tx.payload_bytes, tx.preamble));
        let message = MessageId(idx as u64 + 1);
        let transmission = Transmission {
            start: now,
            end,
            position: node.position,
            tx_power_dbm: node.tx_power_dbm,
        };
        let info = TransferInfo {
            message_id: message,
            payload_bytes: tx.payload_bytes,
            mode,
            preamble: tx.preamble,
            host: node.host(),
            mac: node.mac_address(),
        };

        match self.tracker.add_transfer(&mut self.queue, transmission, info) {
            Ok(_) => {
                self.report.sent += 1;
                let receivers = self.tracker.topology().reception_neighbors(node.mac_address());
                log::debug!(
                    "Node {} sends {} ({}, {} bytes) until {}, {} receivers in range",
                    node.node_id,
                    message,
                    mode.name(),
                    tx.payload_bytes,
                    end,
                    receivers.len()
                );
                self.queue.schedule_at(
                    end,
                    SceneEvent::EvaluateReception {
                        message,
                        sender: node.node_id,
                        receivers,
                    },
                );
            }
            Err(e) if e.is_invalid_argument() => {
                log::warn!("Node {} transmission {} rejected: {}", node.node_id, idx, e);
                self.report.rejected += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Node {} cannot send transmission {}", node.node_id, idx)),
        }
        Ok(())
    }

    fn evaluate_reception(&mut self, message: MessageId, sender: u32, receivers: &[MacAddress]) -> anyhow::Result<()> {
        for mac in receivers {
            let Some(receiver) = self.tracker.topology().node(*mac) else {
                continue;
            };
            let (receiver_id, position) = (receiver.host.0, receiver.position);
            let per = self
                .tracker
                .calculate_per(message, position)
                .with_context(|| format!("PER of {} at node {}", message, receiver_id))?;
            let delivered = self.rng.gen_range(0.0..1.0) >= per;
            log::trace!(
                "{} from node {} at node {}: PER {:.6}, {}",
                message,
                sender,
                receiver_id,
                per,
                if delivered { "delivered" } else { "lost" }
            );

            let stats = self.report.links.entry((sender, receiver_id)).or_default();
            stats.frames += 1;
            stats.per_sum += per;
            if delivered {
                stats.delivered += 1;
            }
        }
        Ok(())
    }
}

/// Replay `scene` with `config` and collect per-link statistics.
pub fn run_scene(scene: &Scene, config: &SimulatorConfig) -> anyhow::Result<SceneReport> {
    SceneRunner::new(scene, config).run()
}
