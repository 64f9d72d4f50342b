//! Beacon frame assembly and transmission
//!
//! [`BeaconBuilder`] produces one outgoing frame per invocation: an opaque
//! payload of the configured fixed size, a freshly stamped tag (node id,
//! position snapshot, send time), and the fixed transmit parameters. Every
//! beacon targets the broadcast address; there is no unicast mode. A failed
//! send is reported and counted but never retried here — the next periodic
//! broadcast still fires on schedule.

use crate::clock::Timestamp;
use crate::config::BeaconConfig;
use crate::frame::{MacAddress, OutboundFrame, TxParams, WSMP_PROTOCOL_ID};
use crate::net::NetworkInterface;
use crate::tag::{BeaconTag, Position};
use tracing::{debug, warn};

/// Assembles and sends beacon frames.
#[derive(Debug)]
pub struct BeaconBuilder {
    node_id: u32,
    packet_size: usize,
    params: TxParams,
    beacons_sent: u64,
    beacons_failed: u64,
}

impl BeaconBuilder {
    pub fn new(node_id: u32, config: &BeaconConfig) -> Self {
        Self {
            node_id,
            packet_size: config.packet_size,
            params: config.tx,
            beacons_sent: 0,
            beacons_failed: 0,
        }
    }

    /// Assemble one outgoing frame. The tag is stamped exactly once, here,
    /// from the position and time of this instant.
    pub fn build(&self, position: Position, now: Timestamp) -> OutboundFrame {
        let tag = BeaconTag {
            node_id: self.node_id,
            position,
            send_time: now,
        };
        OutboundFrame {
            payload: vec![0u8; self.packet_size],
            tag: Some(tag.to_bytes().to_vec()),
            params: self.params,
        }
    }

    /// Build and broadcast one beacon: exactly one send call per invocation.
    /// Returns whether the device accepted the frame.
    pub fn broadcast<N: NetworkInterface>(
        &mut self,
        net: &mut N,
        position: Position,
        now: Timestamp,
    ) -> bool {
        let frame = self.build(position, now);
        let accepted = net.send(&frame, MacAddress::BROADCAST, WSMP_PROTOCOL_ID);
        if accepted {
            self.beacons_sent += 1;
            debug!(node_id = self.node_id, at = %now, size = frame.size(), "beacon broadcast");
        } else {
            self.beacons_failed += 1;
            warn!(node_id = self.node_id, at = %now, "device rejected beacon frame");
        }
        accepted
    }

    /// Beacons accepted by the device so far.
    pub fn beacons_sent(&self) -> u64 {
        self.beacons_sent
    }

    /// Beacons the device rejected so far.
    pub fn beacons_failed(&self) -> u64 {
        self.beacons_failed
    }
}
