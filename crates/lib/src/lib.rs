//! Relay core library: transport seam, message relay, relay state and dashboard
//! used by the `wa-relay` binary.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod relay;
pub mod state;
