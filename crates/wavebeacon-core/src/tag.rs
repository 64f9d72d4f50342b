//! Beacon tag and its metadata envelope codec
//!
//! Every outgoing beacon carries a [`BeaconTag`]: the sender's node id, its
//! position at the send instant, and the send timestamp. The tag rides as
//! out-of-band metadata alongside the opaque payload bytes; it is never
//! spliced into the payload itself.
//!
//! The envelope codec is an exact inverse pair: `from_bytes(to_bytes(t))`
//! reproduces `t` field for field, with bit-identical coordinates. A frame
//! with no envelope is a normal, expected state; an envelope that does not
//! parse is treated the same way (absent), never as an error.
//!
//! ## Envelope layout (36 bytes, big-endian)
//!
//! ```text
//! ┌────────────┬────────────┬────────────┬────────────┬──────────────┐
//! │ node_id    │ pos.x      │ pos.y      │ pos.z      │ send_time    │
//! │ u32 (4B)   │ f64 (8B)   │ f64 (8B)   │ f64 (8B)   │ µs, u64 (8B) │
//! └────────────┴────────────┴────────────┴────────────┴──────────────┘
//! ```

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};

/// Position in 3D space (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance to another position in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Out-of-band metadata stamped onto each beacon at send time.
///
/// Immutable once attached: the position is a snapshot taken at the send
/// instant and is never recomputed, and `send_time` equals the instant the
/// frame was handed to the network interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeaconTag {
    /// Sending node's identifier.
    pub node_id: u32,
    /// Sender position at the send instant.
    pub position: Position,
    /// Virtual time at which the frame was sent.
    pub send_time: Timestamp,
}

impl BeaconTag {
    /// Encoded envelope size in bytes.
    pub const WIRE_SIZE: usize = 36;

    /// Encode the tag into its metadata envelope.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0..4].copy_from_slice(&self.node_id.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.position.x.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.position.y.to_be_bytes());
        bytes[20..28].copy_from_slice(&self.position.z.to_be_bytes());
        bytes[28..36].copy_from_slice(&self.send_time.as_micros().to_be_bytes());
        bytes
    }

    /// Decode an envelope. Returns `None` for anything that is not exactly
    /// a well-formed envelope; the caller treats that as "no tag attached".
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::WIRE_SIZE {
            return None;
        }
        let field = |range: std::ops::Range<usize>| -> [u8; 8] {
            bytes[range].try_into().expect("length checked above")
        };
        Some(Self {
            node_id: u32::from_be_bytes(bytes[0..4].try_into().expect("length checked above")),
            position: Position {
                x: f64::from_be_bytes(field(4..12)),
                y: f64::from_be_bytes(field(12..20)),
                z: f64::from_be_bytes(field(20..28)),
            },
            send_time: Timestamp::from_micros(u64::from_be_bytes(field(28..36))),
        })
    }
}
