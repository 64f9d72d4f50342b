//! Integration test: two beacon nodes on a shared broadcast channel.
//!
//! Exercises the full loop in virtual time: periodic tagged broadcasts,
//! promiscuous sniffing (header intact, sniff delivered first), MAC-filtered
//! receive with tag decode and delay computation.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wavebeacon_core::{
    BeaconApp, BeaconConfig, ChannelInfo, Classification, DataRate, FixedPosition, MacAddress,
    MacFrameHeader, NetworkInterface, OutboundFrame, Position, ReceivedFrame, SignalInfo,
    Timestamp,
};

struct Transmission {
    header: MacFrameHeader,
    payload: Vec<u8>,
    tag: Option<Vec<u8>>,
}

/// Attachment to a shared zero-delay channel.
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
        });
        true
    }

    fn mac_address(&self) -> MacAddress {
        self.mac
    }
}

fn channel_info() -> ChannelInfo {
    ChannelInfo {
        frequency_mhz: 5_890,
        data_rate: DataRate::Ofdm6MbpsBw10MHz,
    }
}

fn signal_info() -> SignalInfo {
    SignalInfo {
        signal_dbm: -70.0,
        noise_dbm: -96.0,
    }
}

fn make_app(
    node_id: u32,
    seed: u64,
    outbox: &Rc<RefCell<Vec<Transmission>>>,
) -> BeaconApp<ChannelPort, FixedPosition> {
    let port = ChannelPort {
        mac: MacAddress::from_node_id(node_id),
        next_sequence: 0,
        outbox: Rc::clone(outbox),
    };
    let config = BeaconConfig::default()
        .with_interval(Duration::from_millis(100))
        .with_seed(seed);
    let mut app = BeaconApp::new(
        config,
        node_id,
        Some(port),
        FixedPosition(Position::new(node_id as f64 * 40.0, 0.0, 1.5)),
    )
    .expect("valid config");
    app.start().expect("interface present");
    app
}

/// Advance both apps in lockstep and flush the channel after each step,
/// sniff first, then the filtered receive. Returns the observations each
/// node surfaced on each path.
fn run_scenario(
    apps: &mut [BeaconApp<ChannelPort, FixedPosition>],
    outbox: &Rc<RefCell<Vec<Transmission>>>,
    end: Timestamp,
) -> Vec<Vec<(Classification, Option<Duration>)>> {
    let mut surfaced: Vec<Vec<(Classification, Option<Duration>)>> =
        vec![Vec::new(); apps.len()];

    loop {
        let next = apps.iter_mut().filter_map(|a| a.next_broadcast_at()).min();
        let Some(next) = next else { break };
        if next > end {
            break;
        }
        for app in apps.iter_mut() {
            app.run_until(next);
        }
        let pending: Vec<Transmission> = outbox.borrow_mut().drain(..).collect();
        for tx in &pending {
            let raw = tx.header.frame_bytes(&tx.payload);
            for (i, app) in apps.iter_mut().enumerate() {
                let mac = MacAddress::from_node_id(app.node_id());
                if mac == tx.header.source {
                    continue;
                }
                // A stopped node surfaces nothing on either path
                if let Some(sniffed) = app.handle_sniff(&raw, &channel_info(), &signal_info()) {
                    surfaced[i].push((sniffed.classification, sniffed.delay));
                }
                if tx.header.destination.is_broadcast() || tx.header.destination == mac {
                    let frame = ReceivedFrame {
                        payload: tx.payload.clone(),
                        tag: tx.tag.clone(),
                    };
                    app.handle_receive(&frame, tx.header.source);
                }
            }
        }
    }
    for app in apps.iter_mut() {
        app.run_until(end);
    }
    surfaced
}

#[test]
fn test_two_nodes_observe_each_other() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let mut apps = vec![make_app(1, 42, &outbox), make_app(2, 43, &outbox)];

    let surfaced = run_scenario(&mut apps, &outbox, Timestamp::from_millis(1_000));

    for app in &apps {
        let stats = app.stats();
        // ~10 periods in 1s of virtual time
        assert!(stats.beacons_sent >= 9, "sent {}", stats.beacons_sent);
        assert_eq!(stats.beacons_failed, 0);
        // Every peer beacon shows up on both paths
        assert_eq!(stats.dispatch.frames_received, stats.dispatch.frames_sniffed);
        assert!(stats.dispatch.frames_received >= 9);
        // All beacons are broadcast: nothing is merely overheard
        assert_eq!(stats.dispatch.frames_overheard, 0);
        assert_eq!(stats.dispatch.frames_dropped, 0);
    }

    for per_node in &surfaced {
        assert!(!per_node.is_empty());
        for (classification, _) in per_node {
            assert_eq!(*classification, Classification::AddressedToMe);
        }
    }
}

#[test]
fn test_observed_delays_are_non_negative() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let mut apps = vec![make_app(1, 7, &outbox), make_app(2, 8, &outbox)];

    let delays = Rc::new(RefCell::new(Vec::new()));
    for app in &mut apps {
        let sink = Rc::clone(&delays);
        app.on_observation(move |obs| {
            if let Some(delay) = obs.delay {
                sink.borrow_mut().push(delay);
            }
        });
    }

    run_scenario(&mut apps, &outbox, Timestamp::from_millis(500));

    let delays = delays.borrow();
    assert!(!delays.is_empty());
    for delay in delays.iter() {
        assert!(*delay >= Duration::ZERO);
    }
}

#[test]
fn test_stopping_one_node_silences_it_for_the_other() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let mut apps = vec![make_app(1, 42, &outbox), make_app(2, 43, &outbox)];

    run_scenario(&mut apps, &outbox, Timestamp::from_millis(250));
    let received_before = apps[0].stats().dispatch.frames_received;
    assert!(received_before >= 2);

    apps[1].stop();
    run_scenario(&mut apps, &outbox, Timestamp::from_millis(1_000));

    // Node 1 kept broadcasting; node 2 went silent after its stop
    assert!(apps[0].stats().beacons_sent >= 9);
    assert_eq!(apps[0].stats().dispatch.frames_received, received_before);
}

#[test]
fn test_foreign_traffic_is_overheard_not_discarded() {
    let outbox = Rc::new(RefCell::new(Vec::new()));
    let mut apps = vec![make_app(1, 1, &outbox)];

    // A unicast frame between two foreign stations
    let header = MacFrameHeader {
        destination: MacAddress::from_node_id(200),
        source: MacAddress::from_node_id(201),
        sequence: 9,
    };
    let obs = apps[0]
        .handle_sniff(
            &header.frame_bytes(&[0u8; 64]),
            &channel_info(),
            &signal_info(),
        )
        .expect("well-formed header");

    assert_eq!(obs.classification, Classification::Overheard);
    assert_eq!(obs.sequence, Some(9));
    assert_eq!(apps[0].stats().dispatch.frames_overheard, 1);

    // Garbage on the channel is skipped without an observation
    assert!(apps[0]
        .handle_sniff(&[0x12, 0x34], &channel_info(), &signal_info())
        .is_none());
    assert_eq!(apps[0].stats().dispatch.frames_dropped, 1);
}
