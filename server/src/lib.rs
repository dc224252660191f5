//! Bulletcore: the tick-based arcade shooter simulation and the
//! matchmaking relay that pairs players for versus matches.

pub mod boss;
pub mod collision;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod matchmaking;
pub mod player;
pub mod progress;
pub mod relay;
pub mod session;
pub mod simulation;
pub mod waves;
pub mod wire_format;
