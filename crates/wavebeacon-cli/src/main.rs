//! wavebeacon scenario runner
//!
//! Drives a handful of beacon nodes over a simulated shared broadcast
//! channel in virtual time: every node periodically broadcasts a tagged
//! beacon, every other node sniffs it off the channel (header intact) and
//! then receives it through the MAC-filtered path. Prints a per-node
//! summary, or raw observation records with `--json`.
//!
//! The channel here is a harness, not a PHY model: zero propagation delay,
//! no loss, log-distance signal estimate only.

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wavebeacon_core::{
    BeaconApp, BeaconConfig, ChannelInfo, DataRate, FixedPosition, MacAddress, MacFrameHeader,
    NeighborObservation, NetworkInterface, OutboundFrame, Position, ReceivedFrame, SignalInfo,
    Timestamp,
};

#[derive(Parser)]
#[command(name = "wavebeacon")]
#[command(author, version, about = "Beacon broadcast scenario runner", long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multi-node beacon scenario over a simulated channel
    Run {
        /// Number of nodes
        #[arg(long, default_value = "3")]
        nodes: usize,

        /// Broadcast interval in milliseconds
        #[arg(long, default_value = "100")]
        interval_ms: u64,

        /// Virtual run duration in milliseconds
        #[arg(long, default_value = "1000")]
        duration_ms: u64,

        /// Beacon payload size in bytes
        #[arg(long, default_value = "1000")]
        packet_size: usize,

        /// Base random seed (per-node seeds derive from it)
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Spacing between adjacent nodes in meters
        #[arg(long, default_value = "50.0")]
        spacing: f64,

        /// Emit every observation as a JSON record instead of the summary
        #[arg(long)]
        json: bool,
    },
}

/// Beacon channel center frequency (5.89 GHz control channel).
const CHANNEL_FREQUENCY_MHZ: u32 = 5_890;

/// Noise floor used for the signal estimate.
const NOISE_FLOOR_DBM: f64 = -96.0;

/// A frame captured on the shared channel, pending delivery.
struct Transmission {
    header: MacFrameHeader,
    payload: Vec<u8>,
    tag: Option<Vec<u8>>,
    data_rate: DataRate,
}

/// One node's attachment to the shared channel. Sends land in the shared
/// outbox; the scenario loop delivers them to every other node, sniff path
/// first, then the filtered receive path.
struct ChannelPort {
    mac: MacAddress,
    next_sequence: u16,
    outbox: Rc<RefCell<Vec<Transmission>>>,
}

impl NetworkInterface for ChannelPort {
    fn send(&mut self, frame: &OutboundFrame, destination: MacAddress, _protocol: u16) -> bool {
        let header = MacFrameHeader {
            destination,
            source: self.mac,
            sequence: self.next_sequence,
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.outbox.borrow_mut().push(Transmission {
            header,
            payload: frame.payload.clone(),
            tag: frame.tag.clone(),
            data_rate: frame.params.data_rate,
        });
        true
    }

    fn mac_address(&self) -> MacAddress {
        self.mac
    }
}

#[derive(Serialize)]
struct ObservationRecord {
    node: u32,
    observation: NeighborObservation,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Run {
            nodes,
            interval_ms,
            duration_ms,
            packet_size,
            seed,
            spacing,
            json,
        } => cmd_run(nodes, interval_ms, duration_ms, packet_size, seed, spacing, json),
    }
}

/// Log-distance estimate of received power at `receiver` for a sender at
/// `sender`, in dBm.
fn estimate_signal_dbm(sender: Position, receiver: Position) -> f64 {
    let distance = sender.distance_to(&receiver).max(1.0);
    -45.0 - 20.0 * distance.log10()
}

fn cmd_run(
    nodes: usize,
    interval_ms: u64,
    duration_ms: u64,
    packet_size: usize,
    seed: u64,
    spacing: f64,
    json: bool,
) -> Result<()> {
    ensure!(nodes >= 2, "a scenario needs at least 2 nodes");

    let outbox: Rc<RefCell<Vec<Transmission>>> = Rc::new(RefCell::new(Vec::new()));
    let observations: Rc<RefCell<Vec<ObservationRecord>>> = Rc::new(RefCell::new(Vec::new()));

    let mut apps = Vec::with_capacity(nodes);
    let mut stations = Vec::with_capacity(nodes);

    for i in 0..nodes {
        let node_id = (i + 1) as u32;
        let mac = MacAddress::from_node_id(node_id);
        let position = Position::new(i as f64 * spacing, 0.0, 1.5);
        let config = BeaconConfig::default()
            .with_interval(Duration::from_millis(interval_ms))
            .with_packet_size(packet_size)
            .with_seed(seed.wrapping_add(i as u64));

        let port = ChannelPort {
            mac,
            next_sequence: 0,
            outbox: Rc::clone(&outbox),
        };
        let mut app = BeaconApp::new(config, node_id, Some(port), FixedPosition(position))?;
        if json {
            let sink = Rc::clone(&observations);
            app.on_observation(move |obs| {
                sink.borrow_mut().push(ObservationRecord {
                    node: node_id,
                    observation: obs.clone(),
                });
            });
        }
        app.start()?;
        apps.push(app);
        stations.push((mac, position));
    }

    // Lockstep virtual-time loop: advance every node to the earliest armed
    // broadcast, then flush the channel so all clocks agree at delivery.
    let end = Timestamp::from_millis(duration_ms);
    loop {
        let next = apps.iter_mut().filter_map(|a| a.next_broadcast_at()).min();
        let Some(next) = next else { break };
        if next > end {
            break;
        }
        for app in &mut apps {
            app.run_until(next);
        }
        deliver_pending(&mut apps, &stations, &outbox);
    }
    for app in &mut apps {
        app.run_until(end);
    }
    deliver_pending(&mut apps, &stations, &outbox);

    if json {
        for record in observations.borrow().iter() {
            println!("{}", serde_json::to_string(record)?);
        }
    } else {
        print_summary(&apps, end);
    }
    Ok(())
}

/// Flush the channel outbox to every node except the sender: promiscuous
/// sniff first (header intact), then the MAC-filtered receive for frames
/// addressed to the node or broadcast.
fn deliver_pending(
    apps: &mut [BeaconApp<ChannelPort, FixedPosition>],
    stations: &[(MacAddress, Position)],
    outbox: &Rc<RefCell<Vec<Transmission>>>,
) {
    let pending: Vec<Transmission> = outbox.borrow_mut().drain(..).collect();
    for tx in &pending {
        let raw = tx.header.frame_bytes(&tx.payload);
        let sender_position = stations
            .iter()
            .find(|(mac, _)| *mac == tx.header.source)
            .map(|(_, p)| *p)
            .unwrap_or(Position::new(0.0, 0.0, 0.0));
        let channel = ChannelInfo {
            frequency_mhz: CHANNEL_FREQUENCY_MHZ,
            data_rate: tx.data_rate,
        };

        for (app, (mac, position)) in apps.iter_mut().zip(stations) {
            if *mac == tx.header.source {
                continue;
            }
            let signal = SignalInfo {
                signal_dbm: estimate_signal_dbm(sender_position, *position),
                noise_dbm: NOISE_FLOOR_DBM,
            };
            app.handle_sniff(&raw, &channel, &signal);
            if tx.header.destination.is_broadcast() || tx.header.destination == *mac {
                let frame = ReceivedFrame {
                    payload: tx.payload.clone(),
                    tag: tx.tag.clone(),
                };
                app.handle_receive(&frame, tx.header.source);
            }
        }
        debug!(source = %tx.header.source, sequence = tx.header.sequence, "delivered frame");
    }
}

fn print_summary(apps: &[BeaconApp<ChannelPort, FixedPosition>], end: Timestamp) {
    println!("\n=== wavebeacon scenario summary ===");
    println!("Virtual time: {end}");
    println!("Nodes: {}", apps.len());
    println!();
    for app in apps {
        let stats = app.stats();
        println!(
            "  Node {:2}: sent={} failed={} received={} sniffed={} overheard={} dropped={}",
            app.node_id(),
            stats.beacons_sent,
            stats.beacons_failed,
            stats.dispatch.frames_received,
            stats.dispatch.frames_sniffed,
            stats.dispatch.frames_overheard,
            stats.dispatch.frames_dropped,
        );
    }
}
