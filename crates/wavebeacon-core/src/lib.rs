//! # wavebeacon-core
//!
//! Periodic beacon broadcast and neighbor observation core for a
//! vehicular/wireless network node. Each node announces its identity,
//! position and send time at a fixed interval, and observes both frames
//! addressed to it and frames merely overheard on the shared channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         BeaconApp                             │
//! │   Stopped → Starting → Running → Stopped                      │
//! │  ┌────────────────┐  ┌───────────────┐  ┌──────────────────┐  │
//! │  │ BeaconScheduler│─▶│ BeaconBuilder │─▶│ NetworkInterface │  │
//! │  │ (jitter once,  │  │ (payload+tag+ │  │     .send        │  │
//! │  │  then exact    │  │  tx params)   │  └──────────────────┘  │
//! │  │  interval)     │  └───────────────┘                        │
//! │  └────────────────┘                                           │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │                  ReceiveDispatcher                      │  │
//! │  │  filtered path (tag decode, delay)   ──┐                │  │
//! │  │  promiscuous path (header, classify) ──┼▶ observations  │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs single-threaded over a virtual clock: broadcasts and
//! receive callbacks execute sequentially in time order, and "waiting" is
//! posting a future event, never blocking.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wavebeacon_core::{BeaconApp, BeaconConfig, FixedPosition, Position, Timestamp};
//!
//! let mut app = BeaconApp::new(
//!     BeaconConfig::default(),
//!     node_id,
//!     Some(device),
//!     FixedPosition(Position::new(100.0, 200.0, 1.5)),
//! )?;
//! app.start()?;
//! app.run_until(Timestamp::from_millis(1_000));
//! ```

pub mod app;
pub mod builder;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod frame;
pub mod net;
pub mod observe;
pub mod scheduler;
pub mod tag;

// Re-export main types
pub use app::{AppState, AppStats, BeaconApp, BeaconError, FixedPosition, PositionProvider};
pub use builder::BeaconBuilder;
pub use clock::{EventQueue, TimerHandle, Timestamp};
pub use config::{BeaconConfig, ConfigError, JitterRange};
pub use dispatch::{DispatchStats, ReceiveDispatcher};
pub use frame::{
    DataRate, MacAddress, MacFrameHeader, OutboundFrame, ReceivedFrame, TxParams,
    WSMP_PROTOCOL_ID,
};
pub use net::NetworkInterface;
pub use observe::{ChannelInfo, Classification, NeighborObservation, SignalInfo};
pub use scheduler::BeaconScheduler;
pub use tag::{BeaconTag, Position};
