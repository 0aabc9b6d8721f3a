//! Hive smart-home state resolver.
//!
//! Pulls device and product snapshots from the Hive platform and answers, for any device,
//! what its effective mode, target and on/off state are right now, and which schedule
//! slots are current, next and after that.

pub mod models {
    pub mod hive;
}

pub mod cache;
pub mod client;
pub mod config;
pub mod devices;
pub mod envfile;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod telemetry;
pub mod utils;
