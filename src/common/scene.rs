//! Scene loading, parsing, and validation logic.
//!
//! A scene is a JSON file listing radios and the frames they send:
//!
//! ```json
//! {
//!   "seed": 7,
//!   "tx_maximum_random_delay_us": 50,
//!   "nodes": [
//!     { "node_id": 1, "position": { "x": 0, "y": 0 }, "tx_power_dbm": 16 },
//!     { "node_id": 2, "position": { "x": 40, "y": 0 }, "tx_power_dbm": 16 }
//!   ],
//!   "transmissions": [
//!     { "sender": 1, "start_us": 0, "payload_bytes": 1000, "mode": "OfdmRate6Mbps" }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::simulation::geometry::Position;
use crate::simulation::mode::{Preamble, WifiMode};
use crate::simulation::types::{HostId, MacAddress};

/// Error type for scene loading failures.
#[derive(Error, Debug)]
pub enum SceneLoadError {
    #[error("Failed to read file: {0}")]
    FileReadError(String),
    #[error("Failed to parse JSON: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// A radio in the scene.
#[derive(Debug, Deserialize, Clone)]
pub struct SceneNode {
    pub node_id: u32,
    pub position: Position,
    /// Transmit power in dBm, before antenna gain.
    pub tx_power_dbm: f64,
    /// MAC address; defaults to the node id.
    #[serde(default)]
    pub mac: Option<u32>,
}

impl SceneNode {
    pub fn mac_address(&self) -> MacAddress {
        MacAddress(self.mac.unwrap_or(self.node_id))
    }

    pub fn host(&self) -> HostId {
        HostId(self.node_id)
    }
}

/// A frame sent by one of the scene's radios.
#[derive(Debug, Deserialize, Clone)]
pub struct SceneTransmission {
    pub sender: u32,
    pub start_us: u64,
    pub payload_bytes: u32,
    /// Mode name, e.g. `OfdmRate6Mbps` or `DsssRate11Mbps`.
    pub mode: String,
    #[serde(default)]
    pub preamble: Preamble,
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// Seed for start jitter and delivery sampling.
    #[serde(default)]
    pub seed: u64,
    /// Maximum random delay in microseconds added to each start time.
    #[serde(default)]
    pub tx_maximum_random_delay_us: u64,
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub transmissions: Vec<SceneTransmission>,
}

impl Scene {
    pub fn node(&self, node_id: u32) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;
    parse_scene(&data)
}

/// Parse and validate a scene from its JSON text.
pub fn parse_scene(data: &str) -> Result<Scene, SceneLoadError> {
    let scene: Scene = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    Ok(scene)
}

/// Validate scene configuration to reject malformed inputs.
///
/// Checks:
/// - Node count (at least one, at most 10000)
/// - Duplicate node IDs and MAC addresses
/// - Non-finite positions
/// - Unrealistic tx power (outside -50 to +50 dBm)
/// - Transmissions from unknown senders, with unknown modes or with payloads
///   outside 1 to 4095 bytes
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_NODES: usize = 10000;
    const MIN_TX_POWER: f64 = -50.0;
    const MAX_TX_POWER: f64 = 50.0;
    const MAX_PAYLOAD_BYTES: u32 = 4095;

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() > MAX_NODES {
        return Err(format!("Node count {} exceeds maximum of {}", scene.nodes.len(), MAX_NODES));
    }

    let mut node_ids = HashSet::new();
    let mut macs = HashSet::new();
    for node in &scene.nodes {
        if !node_ids.insert(node.node_id) {
            return Err(format!("Duplicate node_id found: {}", node.node_id));
        }
        if !macs.insert(node.mac_address()) {
            return Err(format!("Duplicate MAC address found: {}", node.mac_address()));
        }
        let p = node.position;
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(format!("Node {} has a non-finite position", node.node_id));
        }
        if !(MIN_TX_POWER..=MAX_TX_POWER).contains(&node.tx_power_dbm) {
            return Err(format!(
                "Node {} tx_power_dbm {} outside realistic range ({} to {} dBm)",
                node.node_id, node.tx_power_dbm, MIN_TX_POWER, MAX_TX_POWER
            ));
        }
    }

    for (idx, tx) in scene.transmissions.iter().enumerate() {
        if !node_ids.contains(&tx.sender) {
            return Err(format!("Transmission {} references unknown sender {}", idx, tx.sender));
        }
        if let Err(e) = WifiMode::by_name(&tx.mode) {
            return Err(format!("Transmission {}: {}", idx, e));
        }
        if tx.payload_bytes == 0 || tx.payload_bytes > MAX_PAYLOAD_BYTES {
            return Err(format!(
                "Transmission {} payload_bytes {} outside 1-{}",
                idx, tx.payload_bytes, MAX_PAYLOAD_BYTES
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = r#"{
        "seed": 3,
        "nodes": [
            { "node_id": 1, "position": { "x": 0, "y": 0 }, "tx_power_dbm": 16 },
            { "node_id": 2, "position": { "x": 40, "y": 0, "z": 2 }, "tx_power_dbm": 20, "mac": 200 }
        ],
        "transmissions": [
            { "sender": 1, "start_us": 0, "payload_bytes": 1000, "mode": "OfdmRate6Mbps" },
            { "sender": 2, "start_us": 100, "payload_bytes": 200, "mode": "DsssRate2Mbps", "preamble": "short" }
        ]
    }"#;

    #[test]
    fn parses_valid_scene() {
        let scene = parse_scene(TWO_NODES).unwrap();
        assert_eq!(scene.seed, 3);
        assert_eq!(scene.tx_maximum_random_delay_us, 0);
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.nodes[0].mac_address(), MacAddress(1));
        assert_eq!(scene.nodes[1].mac_address(), MacAddress(200));
        assert_eq!(scene.nodes[1].position.z, 2.0);
        assert_eq!(scene.transmissions[0].preamble, Preamble::Long);
        assert_eq!(scene.transmissions[1].preamble, Preamble::Short);
        assert_eq!(scene.node(2).map(|n| n.host()), Some(HostId(2)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_scene("{ nodes: "), Err(SceneLoadError::ParseError(_))));
    }

    #[test]
    fn rejects_invalid_scenes() {
        let cases = [
            (r#"{"nodes": []}"#, "at least one node"),
            (
                r#"{"nodes": [
                    {"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 10},
                    {"node_id": 1, "position": {"x": 5, "y": 0}, "tx_power_dbm": 10}]}"#,
                "Duplicate node_id",
            ),
            (
                r#"{"nodes": [
                    {"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 10},
                    {"node_id": 2, "position": {"x": 5, "y": 0}, "tx_power_dbm": 10, "mac": 1}]}"#,
                "Duplicate MAC",
            ),
            (
                r#"{"nodes": [{"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 90}]}"#,
                "outside realistic range",
            ),
            (
                r#"{"nodes": [{"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 10}],
                    "transmissions": [{"sender": 9, "start_us": 0, "payload_bytes": 10, "mode": "OfdmRate6Mbps"}]}"#,
                "unknown sender",
            ),
            (
                r#"{"nodes": [{"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 10}],
                    "transmissions": [{"sender": 1, "start_us": 0, "payload_bytes": 10, "mode": "Turbo"}]}"#,
                "Turbo",
            ),
            (
                r#"{"nodes": [{"node_id": 1, "position": {"x": 0, "y": 0}, "tx_power_dbm": 10}],
                    "transmissions": [{"sender": 1, "start_us": 0, "payload_bytes": 0, "mode": "OfdmRate6Mbps"}]}"#,
                "payload_bytes",
            ),
        ];
        for (json, expected) in cases {
            match parse_scene(json) {
                Err(SceneLoadError::ValidationError(msg)) => assert!(msg.contains(expected), "{msg}"),
                other => panic!("expected validation error containing {expected:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_scene(Path::new("/definitely/not/here/scene.json"));
        assert!(matches!(result, Err(SceneLoadError::FileReadError(_))));
    }
}
