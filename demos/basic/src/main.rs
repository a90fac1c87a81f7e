use std::thread;

use log::{error, info};

use simbus_client::shared::BusAddress;
use simbus_server::{BusConfig, ProtocolKind, Server, ServerConfig};

mod app;

use app::App;

const WIDTH: usize = 8;
const CYCLES: usize = 8;

fn participant(address: BusAddress, name: &'static str) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let result = App::connect(&address, name, WIDTH).and_then(|mut app| {
            for _ in 0..CYCLES {
                app.update()?;
            }
            app.finish()
        });
        if let Err(error) = result {
            error!("{}: {}", name, error);
        }
    })
}

fn main() {
    env_logger::init();
    info!("Simbus Basic Demo started");

    let address = BusAddress::tcp("127.0.0.1", 14191);
    let bus = BusConfig::new("demo", address.clone(), ProtocolKind::PointToPoint)
        .with_option("WIDTH_I", &WIDTH.to_string())
        .with_option("WIDTH_O", &WIDTH.to_string())
        .with_device("host", 0, true)
        .with_device("device", 1, false);
    let config = ServerConfig {
        trace: true,
        ..ServerConfig::default()
    }
    .with_bus(bus);

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(error) => {
            error!("{}", error);
            return;
        }
    };
    let server = thread::spawn(move || server.run_blocking());

    let participants = [
        participant(address.clone(), "host"),
        participant(address, "device"),
    ];
    for handle in participants {
        let _ = handle.join();
    }

    match server.join() {
        Ok(Ok(summaries)) => {
            for summary in summaries {
                info!(
                    "bus '{}': {} steps, ended at {}",
                    summary.name, summary.steps, summary.time
                );
            }
        }
        Ok(Err(error)) => error!("server failed: {}", error),
        Err(_) => error!("server thread panicked"),
    }
}
