//! tuna - CPU governor switching daemon
//!
//! This library exposes the configuration model, the liveness oracles,
//! the sysfs governor actuator and the decision loop that ties them together.

pub mod constants;
pub mod daemon;
pub mod governor;
pub mod models;
pub mod monitor;
