/// End-to-end tests for an AXI4 link between a master and a memory slave
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use simbus_client::{
    shared::{BusAddress, DeviceOptions},
    Participant,
};
use simbus_server::{BusConfig, ProtocolKind, ServerConfig};
use simbus_test::{Axi4Master, Axi4MemorySlave, TestServer};

fn axi_bus() -> BusConfig {
    BusConfig::new("axi0", BusAddress::tcp("127.0.0.1", 0), ProtocolKind::Axi4)
        .with_device("cpu", 0, true)
        .with_device("ram", 1, false)
}

// ========== Transfer Tests ==========

#[test]
fn test_write_then_read_back() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = TestServer::start(ServerConfig::default().with_bus(axi_bus()));
    let address = server.address("axi0").unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let slave = thread::spawn({
        let address = address.clone();
        let stop = stop.clone();
        move || {
            let participant = Participant::connect(&address, "ram", DeviceOptions::new()).unwrap();
            Axi4MemorySlave::new(participant).serve(&stop).unwrap()
        }
    });

    let participant = Participant::connect(&address, "cpu", DeviceOptions::new()).unwrap();
    let mut master = Axi4Master::new(participant);
    assert_eq!(master.write(0x1000, 0x1111_1111).unwrap(), 0);
    assert_eq!(master.read(0x1000).unwrap(), 0x1111_1111);
    // unwritten memory reads as zero
    assert_eq!(master.read(0x2000).unwrap(), 0);

    stop.store(true, Ordering::SeqCst);
    master.finish().unwrap();
    let memory = slave.join().unwrap();
    assert_eq!(memory.get(&0x1000), Some(&0x1111_1111));
    assert_eq!(memory.len(), 1);

    let summaries = server.join().unwrap();
    assert!(summaries[0].assembled);
}

#[test]
fn test_back_to_back_writes() {
    let server = TestServer::start(ServerConfig::default().with_bus(axi_bus()));
    let address = server.address("axi0").unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let slave = thread::spawn({
        let address = address.clone();
        let stop = stop.clone();
        move || {
            let participant = Participant::connect(&address, "ram", DeviceOptions::new()).unwrap();
            Axi4MemorySlave::new(participant).serve(&stop).unwrap()
        }
    });

    let participant = Participant::connect(&address, "cpu", DeviceOptions::new()).unwrap();
    let mut master = Axi4Master::new(participant);
    for (index, word) in [0xdead_beef_u32, 0x0bad_f00d, 0x1234_5678].into_iter().enumerate() {
        master.write(0x100 + 4 * index as u64, word).unwrap();
    }
    assert_eq!(master.read(0x104).unwrap(), 0x0bad_f00d);

    stop.store(true, Ordering::SeqCst);
    master.finish().unwrap();
    assert_eq!(slave.join().unwrap().len(), 3);
    server.join().unwrap();
}
