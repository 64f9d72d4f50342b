//! Neighbor observations
//!
//! Every inbound frame — whether the MAC layer accepted it for this node or
//! it was merely overheard on the channel — is reduced to a
//! [`NeighborObservation`]. Observations are derived per frame and handed to
//! the caller; nothing here retains them. Overheard observations are the
//! basis for passive neighbor discovery and are produced just like addressed
//! ones.

use crate::clock::Timestamp;
use crate::frame::{DataRate, MacAddress};
use crate::tag::BeaconTag;
use serde::Serialize;
use std::time::Duration;

/// How a received frame relates to this node. Exactly one of the two, for
/// every frame whose header parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Destination was this node's address or broadcast.
    AddressedToMe,
    /// Observed on the channel but addressed elsewhere.
    Overheard,
}

/// Channel metadata reported by the promiscuous path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelInfo {
    /// Center frequency in MHz.
    pub frequency_mhz: u32,
    /// Data rate the frame was received at.
    pub data_rate: DataRate,
}

/// Signal and noise power reported by the promiscuous path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalInfo {
    /// Received signal strength in dBm.
    pub signal_dbm: f64,
    /// Noise floor in dBm.
    pub noise_dbm: f64,
}

impl SignalInfo {
    /// Signal-to-noise ratio in dB.
    pub fn snr_db(&self) -> f64 {
        self.signal_dbm - self.noise_dbm
    }
}

/// One observation of a peer, derived from a single inbound frame.
///
/// Which fields are populated depends on the path that produced it: the
/// MAC-filtered path can decode the tag and compute a propagation delay but
/// never sees the header; the promiscuous path sees the header (sequence,
/// source) and signal metadata but performs no tag decode.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborObservation {
    /// Peer MAC address (sender on the filtered path, header source on the
    /// promiscuous path).
    pub source: MacAddress,
    /// Observed frame size in bytes.
    pub size: usize,
    /// `receive time - tag send time`; present only when a tag decoded.
    pub delay: Option<Duration>,
    /// Header sequence number; promiscuous path only.
    pub sequence: Option<u16>,
    /// Signal and noise metadata; promiscuous path only.
    pub signal: Option<SignalInfo>,
    /// Decoded beacon tag; filtered path only, and only when attached.
    pub tag: Option<BeaconTag>,
    /// Addressed-to-me or overheard.
    pub classification: Classification,
    /// Virtual time the observation was made.
    pub observed_at: Timestamp,
}

impl NeighborObservation {
    /// The peer's node id, when a tag identified it.
    pub fn node_id(&self) -> Option<u32> {
        self.tag.map(|t| t.node_id)
    }
}
