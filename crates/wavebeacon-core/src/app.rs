//! Beacon application
//!
//! Ties the pieces together into the `Stopped → Starting → Running →
//! Stopped` state machine:
//!
//! - [`BeaconApp::start`] checks the interface precondition, then arms the
//!   scheduler. No usable interface is fatal: the application never enters
//!   `Running` and no timer is armed.
//! - [`BeaconApp::run_until`] drains due events sequentially in time order.
//!   A due broadcast assembles one frame, sends it once, and rearms exactly
//!   one interval after the fire instant — the handler is its own
//!   continuation, and stopping invalidates any already-armed fire.
//! - [`BeaconApp::handle_receive`] / [`BeaconApp::handle_sniff`] are the two
//!   inbound entry points the driver pushes frames into.
//!
//! There is no `Paused` state and no concurrency: everything executes as
//! interleaved sequential callbacks over the virtual clock.

use crate::builder::BeaconBuilder;
use crate::clock::{EventQueue, Timestamp};
use crate::config::{BeaconConfig, ConfigError};
use crate::dispatch::{DispatchStats, ReceiveDispatcher};
use crate::frame::{MacAddress, ReceivedFrame};
use crate::net::NetworkInterface;
use crate::observe::{ChannelInfo, NeighborObservation, SignalInfo};
use crate::scheduler::BeaconScheduler;
use crate::tag::Position;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

/// Source of this node's current position.
pub trait PositionProvider {
    fn current_position(&self) -> Position;
}

/// A position that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

impl PositionProvider for FixedPosition {
    fn current_position(&self) -> Position {
        self.0
    }
}

/// Application lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Stopped,
    Starting,
    Running,
}

/// Events the application schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The periodic broadcast is due.
    BroadcastDue,
}

/// Errors surfaced by the application.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// Startup precondition violation: nothing was armed, the application
    /// stays stopped.
    #[error("no compatible network interface available")]
    NoInterface,
    #[error("application is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Aggregate counters across the send and receive sides.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AppStats {
    pub beacons_sent: u64,
    pub beacons_failed: u64,
    pub dispatch: DispatchStats,
}

/// The beacon application for one node.
///
/// Owns the network interface handle exclusively for its lifetime, the
/// event queue that is its clock, and the seeded random source used for the
/// one-time startup jitter.
pub struct BeaconApp<N: NetworkInterface, P: PositionProvider> {
    node_id: u32,
    state: AppState,
    net: Option<N>,
    position: P,
    events: EventQueue<AppEvent>,
    rng: StdRng,
    scheduler: BeaconScheduler,
    builder: BeaconBuilder,
    dispatcher: Option<ReceiveDispatcher>,
    observation_hook: Option<Box<dyn FnMut(&NeighborObservation)>>,
}

impl<N: NetworkInterface, P: PositionProvider> BeaconApp<N, P> {
    /// Construct a stopped application. `net` is the interface capability
    /// the caller discovered; `None` means discovery found nothing, which
    /// [`start`](Self::start) will report as fatal.
    pub fn new(
        config: BeaconConfig,
        node_id: u32,
        net: Option<N>,
        position: P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            node_id,
            state: AppState::Stopped,
            net,
            position,
            events: EventQueue::new(),
            rng: StdRng::seed_from_u64(config.seed),
            scheduler: BeaconScheduler::new(config.interval, config.jitter),
            builder: BeaconBuilder::new(node_id, &config),
            dispatcher: None,
            observation_hook: None,
        })
    }

    /// Register a callback invoked for every surfaced observation, from
    /// either receive path.
    pub fn on_observation(&mut self, hook: impl FnMut(&NeighborObservation) + 'static) {
        self.observation_hook = Some(Box::new(hook));
    }

    /// `Stopped → Starting → Running`. Fails without arming anything if no
    /// interface handle exists.
    pub fn start(&mut self) -> Result<(), BeaconError> {
        if self.state != AppState::Stopped {
            return Err(BeaconError::AlreadyRunning);
        }
        self.state = AppState::Starting;

        let Some(net) = self.net.as_ref() else {
            self.state = AppState::Stopped;
            return Err(BeaconError::NoInterface);
        };

        self.dispatcher = Some(ReceiveDispatcher::new(net.mac_address()));
        self.scheduler
            .arm(&mut self.events, &mut self.rng, AppEvent::BroadcastDue);
        self.state = AppState::Running;
        info!(node_id = self.node_id, mac = %net.mac_address(), "beacon application running");
        Ok(())
    }

    /// `Running → Stopped`. Cancels the pending broadcast; once this
    /// returns, no further send occurs, even past the originally scheduled
    /// firing time.
    pub fn stop(&mut self) {
        if self.state != AppState::Running {
            return;
        }
        let cancelled = self.scheduler.cancel(&mut self.events);
        self.state = AppState::Stopped;
        info!(node_id = self.node_id, cancelled, "beacon application stopped");
    }

    /// Process every event due at or before `deadline`, in time order, then
    /// advance the clock to `deadline`.
    pub fn run_until(&mut self, deadline: Timestamp) {
        while let Some((at, event)) = self.events.pop_due(deadline) {
            match event {
                AppEvent::BroadcastDue => self.broadcast_due(at),
            }
        }
        self.events.advance_to(deadline);
    }

    /// One fired broadcast: assemble, send once, rearm at `now + interval`.
    fn broadcast_due(&mut self, now: Timestamp) {
        if self.state != AppState::Running {
            // A cancelled handle never surfaces; this guards the state
            // machine invariant anyway.
            return;
        }
        let position = self.position.current_position();
        let net = self.net.as_mut().expect("running implies interface");
        // Send failure is reported by the builder and deliberately not
        // retried; the rearm below keeps the period intact either way.
        let _ = self.builder.broadcast(net, position, now);
        self.scheduler.rearm(&mut self.events, AppEvent::BroadcastDue);
    }

    /// Filtered inbound path. Returns whether the frame was consumed
    /// (always, while running).
    pub fn handle_receive(&mut self, frame: &ReceivedFrame, sender: MacAddress) -> bool {
        if self.state != AppState::Running {
            return false;
        }
        let now = self.events.now();
        let dispatcher = self.dispatcher.as_mut().expect("running implies dispatcher");
        let (consumed, observation) = dispatcher.on_receive(frame, sender, now);
        if let Some(hook) = self.observation_hook.as_mut() {
            hook(&observation);
        }
        consumed
    }

    /// Promiscuous inbound path. Returns the observation, or `None` for a
    /// frame this layer cannot interpret.
    pub fn handle_sniff(
        &mut self,
        bytes: &[u8],
        channel: &ChannelInfo,
        signal: &SignalInfo,
    ) -> Option<NeighborObservation> {
        if self.state != AppState::Running {
            return None;
        }
        let now = self.events.now();
        let dispatcher = self.dispatcher.as_mut().expect("running implies dispatcher");
        let observation = dispatcher.on_sniff(bytes, channel, signal, now)?;
        if let Some(hook) = self.observation_hook.as_mut() {
            hook(&observation);
        }
        Some(observation)
    }

    /// This node's identifier.
    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// Current virtual time.
    pub fn now(&self) -> Timestamp {
        self.events.now()
    }

    /// Instant of the next armed broadcast, if any.
    pub fn next_broadcast_at(&mut self) -> Option<Timestamp> {
        self.events.next_deadline()
    }

    /// Number of armed timers (zero after a failed start or a stop).
    pub fn pending_timers(&self) -> usize {
        self.events.pending()
    }

    /// The interface handle, when one exists.
    pub fn network(&self) -> Option<&N> {
        self.net.as_ref()
    }

    /// Aggregate send/receive counters.
    pub fn stats(&self) -> AppStats {
        AppStats {
            beacons_sent: self.builder.beacons_sent(),
            beacons_failed: self.builder.beacons_failed(),
            dispatch: self
                .dispatcher
                .as_ref()
                .map(ReceiveDispatcher::stats)
                .unwrap_or_default(),
        }
    }
}
