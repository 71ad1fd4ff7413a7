//! Chat-session transport seam.
//!
//! The transport (pairing, session persistence, message delivery) runs outside this crate.
//! It reports lifecycle and message events to the relay and exposes send and media download.

mod bridge;
mod handle;
mod inbound;

pub use bridge::BridgeChannel;
pub use handle::{ChannelHandle, MediaPayload};
pub use inbound::{InboundEvent, MessageKind, TransportEvent, GROUP_SUFFIX};
