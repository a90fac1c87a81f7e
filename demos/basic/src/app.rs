use std::{thread, time::Duration};

use log::info;

use simbus_client::{
    shared::{BusAddress, DeviceOptions, SignalMap, SignalVector},
    Participant, SimbusClientError,
};

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// One side of the demo link: counts up on DATA_O every rising edge and
/// logs what the other side sends back
pub struct App {
    participant: Participant,
    drive: SignalMap,
    width: usize,
    counter: u64,
}

impl App {
    pub fn connect(address: &BusAddress, name: &str, width: usize) -> Result<Self, SimbusClientError> {
        let mut attempt = 0;
        let participant = loop {
            attempt += 1;
            match Participant::connect(address, name, DeviceOptions::new()) {
                Ok(participant) => break participant,
                // the server may not be listening yet
                Err(SimbusClientError::Io(error)) if attempt < CONNECT_ATTEMPTS => {
                    info!("{}: {}, retrying", name, error);
                    thread::sleep(CONNECT_RETRY_DELAY);
                }
                Err(error) => return Err(error),
            }
        };
        info!("Participant '{}' connected as {}", name, participant.ident());

        Ok(App {
            participant,
            drive: SignalMap::new(),
            width,
            counter: 0,
        })
    }

    /// Runs one clock cycle
    pub fn update(&mut self) -> Result<(), SimbusClientError> {
        let value = SignalVector::from_u64(self.counter, self.width);
        self.drive.insert("DATA_O".to_string(), value);
        self.participant.wait_posedge("CLOCK", &self.drive)?;

        let received = self.participant.signal("DATA_I")?;
        info!(
            "{} @ {}: sent {}, received {}",
            self.participant.name(),
            self.participant.time(),
            self.counter,
            received
        );
        self.counter += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<(), SimbusClientError> {
        info!("{} leaving the bus", self.participant.name());
        self.participant.finish()
    }
}
