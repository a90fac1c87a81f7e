/// Property tests: whatever one side of a link drives arrives unchanged on
/// the other side, at every width.
use std::thread;

use proptest::prelude::*;

use simbus_client::{
    shared::{BusAddress, DeviceOptions, SignalMap, SignalVector},
    Participant,
};
use simbus_server::{BusConfig, ProtocolKind, ServerConfig};
use simbus_test::TestServer;

fn exchange(width: usize, out: u64, back: u64) -> (SignalVector, SignalVector) {
    let width_text = width.to_string();
    let config = BusConfig::new("link", BusAddress::tcp("127.0.0.1", 0), ProtocolKind::PointToPoint)
        .with_option("WIDTH_I", &width_text)
        .with_option("WIDTH_O", &width_text)
        .with_device("master", 0, true)
        .with_device("slave", 1, false);
    let server = TestServer::start(ServerConfig::default().with_bus(config));
    let address = server.address("link").unwrap();

    let side = |name: &'static str, value: u64| {
        let address = address.clone();
        thread::spawn(move || {
            let mut participant = Participant::connect(&address, name, DeviceOptions::new()).unwrap();
            let mut drive = SignalMap::new();
            drive.insert("DATA_O".to_string(), SignalVector::from_u64(value, width));
            participant.ready(&drive).unwrap();
            let seen = participant.signal("DATA_I").unwrap().clone();
            participant.finish().unwrap();
            seen
        })
    };
    let master = side("master", out);
    let slave = side("slave", back);
    let seen = (master.join().unwrap(), slave.join().unwrap());
    server.join().unwrap();
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn data_crosses_the_link(width in 1usize..=64, out in any::<u64>(), back in any::<u64>()) {
        let (at_master, at_slave) = exchange(width, out, back);
        prop_assert_eq!(at_master, SignalVector::from_u64(back, width));
        prop_assert_eq!(at_slave, SignalVector::from_u64(out, width));
    }
}
