/// End-to-end tests for a point-to-point link
/// Two participant threads talk to a real server over loopback sockets.
use std::thread;

use simbus_client::{
    shared::{BitValue, BusAddress, DeviceOptions, SignalMap, SignalVector, SimTime},
    Participant,
};
use simbus_server::{BusConfig, ClockTiming, ProtocolKind, ServerConfig};
use simbus_test::TestServer;

fn link(address: BusAddress) -> BusConfig {
    BusConfig::new("link", address, ProtocolKind::PointToPoint)
        .with_option("WIDTH_I", "16")
        .with_option("WIDTH_O", "16")
        .with_device("master", 0, true)
        .with_device("slave", 1, false)
}

fn drive(name: &str, value: SignalVector) -> SignalMap {
    let mut signals = SignalMap::new();
    signals.insert(name.to_string(), value);
    signals
}

/// Connects `name`, offers `signals` for `steps` steps and returns what
/// arrived on DATA_I and CLOCK at each step
fn run_side(
    address: BusAddress,
    name: &'static str,
    signals: SignalMap,
    steps: usize,
) -> thread::JoinHandle<Vec<(String, BitValue)>> {
    thread::spawn(move || {
        let mut participant = Participant::connect(&address, name, DeviceOptions::new()).unwrap();
        let mut seen = Vec::new();
        for _ in 0..steps {
            participant.ready(&signals).unwrap();
            let data = participant.signal("DATA_I").unwrap().to_string();
            seen.push((data, participant.bit("CLOCK")));
        }
        participant.finish().unwrap();
        seen
    })
}

// ========== Handshake Tests ==========

#[test]
fn test_two_device_handshake_width_16() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = TestServer::start(ServerConfig::default().with_bus(link(BusAddress::tcp("127.0.0.1", 0))));
    let address = server.address("link").unwrap();

    let master = run_side(
        address.clone(),
        "master",
        drive("DATA_O", SignalVector::from_u64(0x1234, 16)),
        4,
    );
    let slave = run_side(
        address,
        "slave",
        drive("DATA_O", SignalVector::from_u64(0xabcd, 16)),
        4,
    );
    let master = master.join().unwrap();
    let slave = slave.join().unwrap();

    for (data, _) in &master {
        assert_eq!(data, "1010101111001101");
    }
    for (data, _) in &slave {
        assert_eq!(data, "0001001000110100");
    }
    let clock: Vec<BitValue> = master.iter().map(|(_, clock)| *clock).collect();
    assert_eq!(
        clock,
        vec![BitValue::One, BitValue::One, BitValue::Zero, BitValue::Zero]
    );

    let summaries = server.join().unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].assembled);
    assert_eq!(summaries[0].steps, 4);
    assert_eq!(
        summaries[0].time,
        SimTime::from_picos(ClockTiming::default().period())
    );
}

// ========== Clock Mode Tests ==========

#[test]
fn test_clock_stop_modes_reach_device() {
    let server = TestServer::start(ServerConfig::default().with_bus(link(BusAddress::tcp("127.0.0.1", 0))));
    let address = server.address("link").unwrap();

    let stopped_high = drive("CLOCK_MODE", "11".parse().unwrap());
    let master = run_side(address.clone(), "master", stopped_high, 8);
    let slave = run_side(address, "slave", SignalMap::new(), 8);

    let master = master.join().unwrap();
    let slave = slave.join().unwrap();
    assert!(slave.iter().all(|(_, clock)| *clock == BitValue::One));
    assert!(master.iter().any(|(_, clock)| *clock == BitValue::Zero));
    server.join().unwrap();
}

#[test]
fn test_clock_stop_at_z() {
    let server = TestServer::start(ServerConfig::default().with_bus(link(BusAddress::tcp("127.0.0.1", 0))));
    let address = server.address("link").unwrap();

    let master = run_side(address.clone(), "master", drive("CLOCK_MODE", "01".parse().unwrap()), 4);
    let slave = run_side(address, "slave", SignalMap::new(), 4);

    master.join().unwrap();
    let slave = slave.join().unwrap();
    assert!(slave.iter().all(|(_, clock)| *clock == BitValue::HiZ));
    server.join().unwrap();
}

// ========== Address Tests ==========

#[cfg(unix)]
#[test]
fn test_pipe_address() {
    let path = simbus_test::pipe_path("p2p-link");
    let server = TestServer::start(ServerConfig::default().with_bus(link(BusAddress::pipe(path.clone()))));
    let address = server.address("link").unwrap();
    assert_eq!(address, BusAddress::pipe(path.clone()));

    let master = run_side(address.clone(), "master", SignalMap::new(), 2);
    let slave = run_side(address, "slave", SignalMap::new(), 2);
    let master = master.join().unwrap();
    slave.join().unwrap();
    // nobody drives the slave's DATA_O
    assert_eq!(master[0].0, "zzzzzzzzzzzzzzzz");

    server.join().unwrap();
    assert!(!path.exists());
}
