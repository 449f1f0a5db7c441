//! Interference and packet error model for simulated 802.11 networks.
//!
//! The [`simulation::interference::InterferenceTracker`] keeps every signal on
//! the shared medium, evaluates the packet error rate of a frame at any receiver
//! position and notifies carrier-sense neighbors when a transmission starts.

pub mod common;
pub mod control;
pub mod error;
pub mod simulation;
pub mod time_driver;
