//! Frame types, MAC addressing and transmit parameters
//!
//! Two views of a frame exist in this crate, matching the two receive paths:
//!
//! - [`ReceivedFrame`]: the MAC-filtered view. The header has already been
//!   stripped by the device; only the payload and the optional tag envelope
//!   remain.
//! - The raw/promiscuous view: `header bytes ++ payload`, observed directly
//!   off the channel. [`MacFrameHeader::from_bytes`] parses the leading
//!   header; frames it cannot parse are silently skipped by the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol id beacons are broadcast as (WSMP).
pub const WSMP_PROTOCOL_ID: u16 = 0x88DC;

/// Control channel number used for every beacon.
pub const CONTROL_CHANNEL: u8 = 178;

/// Highest user priority.
pub const HIGHEST_PRIORITY: u8 = 7;

/// Maximum transmit power level.
pub const MAX_POWER_LEVEL: u8 = 7;

/// 48-bit MAC address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Broadcast address (all 0xFF).
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    /// Derive a locally administered address from a node id.
    pub fn from_node_id(node_id: u32) -> Self {
        let id = node_id.to_be_bytes();
        MacAddress([0x02, 0x00, id[0], id[1], id[2], id[3]])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check if this is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// MAC frame header, visible only on the raw/promiscuous path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacFrameHeader {
    /// Destination address (broadcast for beacons).
    pub destination: MacAddress,
    /// Source address.
    pub source: MacAddress,
    /// Sender-assigned sequence number.
    pub sequence: u16,
}

impl MacFrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 14;

    /// Serialize the header to bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..6].copy_from_slice(self.destination.as_bytes());
        bytes[6..12].copy_from_slice(self.source.as_bytes());
        bytes[12..14].copy_from_slice(&self.sequence.to_be_bytes());
        bytes
    }

    /// Parse the leading header of a raw frame. Returns `None` for frames
    /// too short to carry one; the channel may legitimately carry frames
    /// this layer cannot interpret.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            destination: MacAddress::from_bytes(bytes[0..6].try_into().expect("length checked")),
            source: MacAddress::from_bytes(bytes[6..12].try_into().expect("length checked")),
            sequence: u16::from_be_bytes([bytes[12], bytes[13]]),
        })
    }

    /// Compose the raw on-channel view of a frame: header followed by payload.
    pub fn frame_bytes(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE + payload.len());
        bytes.extend_from_slice(&self.to_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }
}

/// Fixed OFDM data rates (10 MHz channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataRate {
    Ofdm3MbpsBw10MHz,
    Ofdm6MbpsBw10MHz,
    Ofdm12MbpsBw10MHz,
}

impl DataRate {
    /// Nominal bit rate in bits per second.
    pub fn bits_per_second(&self) -> u64 {
        match self {
            DataRate::Ofdm3MbpsBw10MHz => 3_000_000,
            DataRate::Ofdm6MbpsBw10MHz => 6_000_000,
            DataRate::Ofdm12MbpsBw10MHz => 12_000_000,
        }
    }
}

/// Transmit parameters attached to every outgoing beacon.
///
/// These are configuration constants, never derived at runtime: control
/// channel, highest priority, maximum power and a fixed data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParams {
    /// Channel number.
    pub channel: u8,
    /// User priority (0-7).
    pub priority: u8,
    /// Transmit power level (0-7).
    pub power_level: u8,
    /// Fixed data rate.
    pub data_rate: DataRate,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            channel: CONTROL_CHANNEL,
            priority: HIGHEST_PRIORITY,
            power_level: MAX_POWER_LEVEL,
            data_rate: DataRate::Ofdm6MbpsBw10MHz,
        }
    }
}

/// An assembled outgoing frame: opaque payload, optional tag envelope
/// travelling alongside it, and the transmit parameters for the send.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Opaque payload bytes (content unspecified, size configured).
    pub payload: Vec<u8>,
    /// Encoded [`crate::tag::BeaconTag`] envelope, if one was attached.
    pub tag: Option<Vec<u8>>,
    /// Transmit parameters for this frame.
    pub params: TxParams,
}

impl OutboundFrame {
    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// The MAC-filtered view of an inbound frame: header stripped, payload and
/// tag envelope (when one survived the path) only.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    /// Payload bytes as delivered by the device.
    pub payload: Vec<u8>,
    /// Tag envelope, when the metadata side-channel reached this receiver.
    pub tag: Option<Vec<u8>>,
}

impl ReceivedFrame {
    /// Observed size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
