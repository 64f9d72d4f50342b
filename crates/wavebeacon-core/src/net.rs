//! Network interface abstraction
//!
//! The application consumes the device through this one narrow capability.
//! The handle is exclusively owned by the application instance for its
//! lifetime; no other component sends through it, and because the whole
//! crate runs as interleaved sequential callbacks there is no locking.
//!
//! Inbound delivery is push-style: the driver (hardware shim, or a channel
//! harness in tests and the CLI) invokes
//! [`BeaconApp::handle_sniff`](crate::app::BeaconApp::handle_sniff) for every
//! frame it observes on the channel, and
//! [`BeaconApp::handle_receive`](crate::app::BeaconApp::handle_receive) for
//! frames the MAC layer accepted for this node.
//!
//! Ordering contract: when a frame is both sniffed and received, the sniff
//! callback fires first. Drivers must preserve this; the dispatcher relies
//! on it only for log ordering, never for correctness.

use crate::frame::{MacAddress, OutboundFrame};

/// Send capability of the underlying network device.
pub trait NetworkInterface {
    /// Hand one frame to the device for transmission with the given
    /// destination and protocol id. Returns `false` if the device rejected
    /// the frame; the caller reports the failure but never retries.
    fn send(&mut self, frame: &OutboundFrame, destination: MacAddress, protocol: u16) -> bool;

    /// This device's own MAC address.
    fn mac_address(&self) -> MacAddress;
}
