//! Wi-Fi physical layer interference model.
//!
//! It integrates:
//! - Wi-Fi mode tables and PLCP timing
//! - Chunk success rates for DSSS and OFDM modulations
//! - Log-distance propagation with an inverse distance query
//! - Interference tracking and packet error rate evaluation
//! - Carrier-sense notification through a pluggable topology
//!
//! ## Module Organization
//!
//! - `types`: Identifiers (MAC addresses, hosts, messages)
//! - `geometry`: Positions and distances
//! - `signal_calculations`: Power unit conversions and noise floor
//! - `mode`: Wi-Fi modes and 802.11a/b/g mode sets
//! - `error_model`: NIST, YANS and DSSS error rate models
//! - `propagation`: Propagation loss models
//! - `interference`: Interference tracker and transfer cache
//! - `topology`: Carrier-sense topology and the range-based reference topology
//! - `network`: Scene runner replaying transmissions through the tracker

pub mod error_model;
pub mod geometry;
pub mod interference;
pub mod mode;
pub mod network;
pub mod propagation;
pub mod signal_calculations;
pub mod topology;
pub mod types;
