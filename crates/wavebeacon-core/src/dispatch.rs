//! Inbound frame dispatch
//!
//! Two structurally different receive paths feed one observation model, and
//! they are deliberately never merged: the information available on each
//! differs.
//!
//! - **Filtered path** ([`ReceiveDispatcher::on_receive`]): the MAC layer
//!   already accepted the frame for this node, the header is gone. The tag
//!   envelope may be decoded here, yielding the peer's identity, position
//!   and a propagation delay.
//! - **Promiscuous path** ([`ReceiveDispatcher::on_sniff`]): every frame on
//!   the channel, header intact, tag decode not attempted. Classification is
//!   by destination address; frames addressed elsewhere are *Overheard* —
//!   they are data for passive neighbor discovery, not noise.

use crate::clock::Timestamp;
use crate::frame::{MacAddress, MacFrameHeader, ReceivedFrame};
use crate::observe::{ChannelInfo, Classification, NeighborObservation, SignalInfo};
use crate::tag::BeaconTag;
use serde::Serialize;
use tracing::{info, trace};

/// Per-path frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Frames delivered on the filtered path.
    pub frames_received: u64,
    /// Frames whose header parsed on the promiscuous path.
    pub frames_sniffed: u64,
    /// Sniffed frames classified as overheard.
    pub frames_overheard: u64,
    /// Promiscuous frames skipped because the header did not parse.
    pub frames_dropped: u64,
}

/// Reconciles both inbound paths into [`NeighborObservation`]s.
#[derive(Debug)]
pub struct ReceiveDispatcher {
    own_address: MacAddress,
    stats: DispatchStats,
}

impl ReceiveDispatcher {
    pub fn new(own_address: MacAddress) -> Self {
        Self {
            own_address,
            stats: DispatchStats::default(),
        }
    }

    /// Filtered path: frames the MAC layer deemed "for this node".
    ///
    /// Attempts a tag decode; with a tag present the observation carries the
    /// full tag fields and `delay = now - send_time`. Without one it carries
    /// only size and sender. This path is observation-only and always
    /// consumes the frame.
    pub fn on_receive(
        &mut self,
        frame: &ReceivedFrame,
        sender: MacAddress,
        now: Timestamp,
    ) -> (bool, NeighborObservation) {
        self.stats.frames_received += 1;

        let tag = frame.tag.as_deref().and_then(BeaconTag::from_bytes);
        let delay = tag.map(|t| now.saturating_duration_since(t.send_time));

        let observation = NeighborObservation {
            source: sender,
            size: frame.size(),
            delay,
            sequence: None,
            signal: None,
            tag,
            classification: Classification::AddressedToMe,
            observed_at: now,
        };

        match &observation.tag {
            Some(tag) => info!(
                %sender,
                size = observation.size,
                peer = tag.node_id,
                delay_us = delay.unwrap_or_default().as_micros() as u64,
                "beacon received"
            ),
            None => info!(%sender, size = observation.size, "untagged frame received"),
        }

        (true, observation)
    }

    /// Promiscuous path: every frame on the channel, header intact.
    ///
    /// A frame whose header does not parse is silently skipped — the channel
    /// may carry foreign protocols or corruption. For every parsed header
    /// the classification is total and exclusive: destination equal to this
    /// node's address or broadcast is `AddressedToMe`, anything else is
    /// `Overheard`, and both produce an observation.
    pub fn on_sniff(
        &mut self,
        bytes: &[u8],
        channel: &ChannelInfo,
        signal: &SignalInfo,
        now: Timestamp,
    ) -> Option<NeighborObservation> {
        let Some(header) = MacFrameHeader::from_bytes(bytes) else {
            self.stats.frames_dropped += 1;
            trace!(size = bytes.len(), "skipping undecodable frame");
            return None;
        };
        self.stats.frames_sniffed += 1;

        let classification = if header.destination.is_broadcast()
            || header.destination == self.own_address
        {
            Classification::AddressedToMe
        } else {
            self.stats.frames_overheard += 1;
            Classification::Overheard
        };

        info!(
            source = %header.source,
            sequence = header.sequence,
            size = bytes.len(),
            frequency_mhz = channel.frequency_mhz,
            signal_dbm = signal.signal_dbm,
            noise_dbm = signal.noise_dbm,
            ?classification,
            "frame sniffed"
        );

        Some(NeighborObservation {
            source: header.source,
            size: bytes.len(),
            delay: None,
            sequence: Some(header.sequence),
            signal: Some(*signal),
            tag: None,
            classification,
            observed_at: now,
        })
    }

    /// Counters for both paths.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}
