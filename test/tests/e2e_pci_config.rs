/// End-to-end tests for a shared PCI bus: arbitration, configuration
/// cycles and interrupt fan-out between real participant processes.
use std::{
    sync::{atomic::AtomicBool, atomic::Ordering, Arc},
    thread,
};

use simbus_client::{
    shared::{BitValue, BusAddress, DeviceOptions, SignalMap, SignalVector},
    Participant,
};
use simbus_server::{BusConfig, ProtocolKind, ServerConfig};
use simbus_test::{PciConfigTarget, PciMaster, TestServer, MASTER_ABORT};

const DEVICE_ID: u32 = 0x1234_5678;

fn pci_bus() -> BusConfig {
    BusConfig::new("pci0", BusAddress::tcp("127.0.0.1", 0), ProtocolKind::Pci)
        .with_option("seed", "7")
        .with_device("host", 0, true)
        .with_device("dev1", 1, false)
}

fn start_target(address: BusAddress, stop: Arc<AtomicBool>) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let participant = Participant::connect(&address, "dev1", DeviceOptions::new()).unwrap();
        PciConfigTarget::new(participant, DEVICE_ID).serve(&stop).unwrap()
    })
}

// ========== Configuration Cycle Tests ==========

#[test]
fn test_config_read_of_missing_device_aborts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = TestServer::start(ServerConfig::default().with_bus(pci_bus()));
    let address = server.address("pci0").unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let target = start_target(address.clone(), stop.clone());

    let participant = Participant::connect(&address, "host", DeviceOptions::new()).unwrap();
    let mut master = PciMaster::new(participant);
    assert_eq!(master.config_read(3, 0).unwrap(), MASTER_ABORT);

    stop.store(true, Ordering::SeqCst);
    master.finish().unwrap();
    assert_eq!(target.join().unwrap(), 0);
    server.join().unwrap();
}

#[test]
fn test_config_read_returns_device_id() {
    let server = TestServer::start(ServerConfig::default().with_bus(pci_bus()));
    let address = server.address("pci0").unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let target = start_target(address.clone(), stop.clone());

    let participant = Participant::connect(&address, "host", DeviceOptions::new()).unwrap();
    let mut master = PciMaster::new(participant);
    assert_eq!(master.config_read(1, 0).unwrap(), DEVICE_ID);
    assert_eq!(master.config_read(1, 4).unwrap(), 0);

    stop.store(true, Ordering::SeqCst);
    master.finish().unwrap();
    assert_eq!(target.join().unwrap(), 2);

    let summaries = server.join().unwrap();
    assert!(summaries[0].steps > 0);
}

// ========== Interrupt Tests ==========

#[test]
fn test_interrupts_fan_out_to_hosts() {
    let config = BusConfig::new("pci0", BusAddress::tcp("127.0.0.1", 0), ProtocolKind::Pci)
        .with_device("host", 0, true)
        .with_device("dev2", 2, false)
        .with_device("dev5", 5, false);
    let server = TestServer::start(ServerConfig::default().with_bus(config));
    let address = server.address("pci0").unwrap();

    let devices: Vec<_> = [("dev2", "INTB#"), ("dev5", "INTD#")]
        .into_iter()
        .map(|(name, line)| {
            let address = address.clone();
            thread::spawn(move || {
                let mut participant =
                    Participant::connect(&address, name, DeviceOptions::new()).unwrap();
                let mut drive = SignalMap::new();
                drive.insert(line.to_string(), SignalVector::bit(BitValue::Zero));
                participant.ready(&drive).unwrap();
                // interrupt lines are only delivered to hosts
                assert!(participant.signal("INTB#").is_err());
                participant.finish().unwrap();
            })
        })
        .collect();

    let mut host = Participant::connect(&address, "host", DeviceOptions::new()).unwrap();
    let signals = host.ready(&SignalMap::new()).unwrap().clone();
    for device in devices {
        device.join().unwrap();
    }
    host.finish().unwrap();
    server.join().unwrap();

    let line = |name: &str| signals[name].clone();
    assert_eq!(line("INTA#"), SignalVector::new(16, BitValue::One));
    assert_eq!(line("INTB#").get(2), Some(BitValue::Zero));
    assert_eq!(line("INTB#").get(5), Some(BitValue::One));
    assert_eq!(line("INTD#").get(5), Some(BitValue::Zero));
    assert_eq!(line("INTD#").get(2), Some(BitValue::One));
    assert_eq!(line("INTC#").width(), 16);
}

#[test]
fn test_reset_defaults_high() {
    let server = TestServer::start(ServerConfig::default().with_bus(pci_bus()));
    let address = server.address("pci0").unwrap();
    let device = thread::spawn({
        let address = address.clone();
        move || {
            let mut participant = Participant::connect(&address, "dev1", DeviceOptions::new()).unwrap();
            participant.ready(&SignalMap::new()).unwrap();
            let reset = participant.bit("RESET#");
            participant.finish().unwrap();
            reset
        }
    });

    let mut host = Participant::connect(&address, "host", DeviceOptions::new()).unwrap();
    host.ready(&SignalMap::new()).unwrap();
    assert_eq!(host.bit("RESET#"), BitValue::One);
    assert_eq!(host.bit("GNT#"), BitValue::One);
    host.finish().unwrap();

    assert_eq!(device.join().unwrap(), BitValue::One);
    server.join().unwrap();
}
