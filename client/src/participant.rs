use std::io::{Read, Write};

use log::{debug, info};

use simbus_shared::{
    BitValue, BusAddress, DeviceIdent, DeviceOptions, LineFramer, Message, SignalMap,
    SignalVector, SimTime,
};

use crate::{stream::ClientStream, ClientConfig, SimbusClientError};

const READ_BUFFER_SIZE: usize = 4096;

/// A clock transition to wait for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    fn matches(self, before: BitValue, after: BitValue) -> bool {
        match self {
            Edge::Rising => before != BitValue::One && after == BitValue::One,
            Edge::Falling => before != BitValue::Zero && after == BitValue::Zero,
        }
    }
}

/// One simulator process attached to a bus.
///
/// Every call to `ready` is one rendezvous: the participant offers the
/// values it drives and blocks until the bus has stepped, after which
/// `signals` holds what it sees and `time` the new simulation time.
pub struct Participant {
    name: String,
    ident: DeviceIdent,
    stream: ClientStream,
    framer: LineFramer,
    buffer: Vec<u8>,
    time: SimTime,
    signals: SignalMap,
    steps: u64,
}

impl Participant {
    /// Connects and introduces itself as device `name`
    pub fn connect(
        address: &BusAddress,
        name: &str,
        options: DeviceOptions,
    ) -> Result<Self, SimbusClientError> {
        Self::connect_with_config(address, name, options, ClientConfig::default())
    }

    pub fn connect_with_config(
        address: &BusAddress,
        name: &str,
        options: DeviceOptions,
        config: ClientConfig,
    ) -> Result<Self, SimbusClientError> {
        let stream = ClientStream::connect(address)?;
        let mut participant = Self {
            name: name.to_string(),
            ident: 0,
            stream,
            framer: LineFramer::new(config.max_line_length),
            buffer: vec![0; READ_BUFFER_SIZE],
            time: SimTime::ZERO,
            signals: SignalMap::new(),
            steps: 0,
        };

        participant.send(&Message::Hello {
            name: name.to_string(),
            options,
        })?;
        match participant.receive() {
            Ok(Message::YouAre { ident }) => {
                participant.ident = ident;
                info!("connected to {} as '{}' (ident {})", address, name, ident);
                Ok(participant)
            }
            Ok(Message::Nak) | Err(SimbusClientError::Disconnected) => {
                Err(SimbusClientError::Rejected {
                    name: name.to_string(),
                })
            }
            Ok(other) => Err(SimbusClientError::UnexpectedMessage {
                expected: "YOU-ARE",
                found: other.command(),
            }),
            Err(error) => Err(error),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ident(&self) -> DeviceIdent {
        self.ident
    }

    /// Simulation time of the last UNTIL
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Number of completed rendezvous
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Everything the last UNTIL delivered
    pub fn signals(&self) -> &SignalMap {
        &self.signals
    }

    pub fn signal(&self, name: &str) -> Result<&SignalVector, SimbusClientError> {
        self.signals
            .get(name)
            .ok_or_else(|| SimbusClientError::MissingSignal {
                name: name.to_string(),
            })
    }

    /// Bit 0 of a delivered signal, `HiZ` before it has been delivered
    pub fn bit(&self, name: &str) -> BitValue {
        self.signals
            .get(name)
            .and_then(|value| value.get(0))
            .unwrap_or(BitValue::HiZ)
    }

    /// Offers `drive` and blocks until the bus steps
    pub fn ready(&mut self, drive: &SignalMap) -> Result<&SignalMap, SimbusClientError> {
        self.send(&Message::Ready {
            time: self.time,
            signals: drive.clone(),
        })?;
        match self.receive()? {
            Message::Until { time, signals } => {
                self.time = time;
                self.signals = signals;
                self.steps += 1;
                Ok(&self.signals)
            }
            Message::Finish => Err(SimbusClientError::Finished),
            other => Err(SimbusClientError::UnexpectedMessage {
                expected: "UNTIL",
                found: other.command(),
            }),
        }
    }

    /// Keeps offering `drive` until `clock` makes the given transition
    pub fn wait_edge(
        &mut self,
        clock: &str,
        drive: &SignalMap,
        edge: Edge,
    ) -> Result<(), SimbusClientError> {
        loop {
            let before = self.bit(clock);
            self.ready(drive)?;
            if edge.matches(before, self.bit(clock)) {
                return Ok(());
            }
        }
    }

    pub fn wait_posedge(&mut self, clock: &str, drive: &SignalMap) -> Result<(), SimbusClientError> {
        self.wait_edge(clock, drive, Edge::Rising)
    }

    /// Leaves the bus. The server acknowledges with FINISH and closes.
    pub fn finish(mut self) -> Result<(), SimbusClientError> {
        self.send(&Message::Finish)?;
        match self.receive() {
            Ok(Message::Finish) | Err(SimbusClientError::Disconnected) => {
                info!("'{}' finished after {} steps at {}", self.name, self.steps, self.time);
                Ok(())
            }
            Ok(other) => Err(SimbusClientError::UnexpectedMessage {
                expected: "FINISH",
                found: other.command(),
            }),
            Err(error) => Err(error),
        }
    }

    fn send(&mut self, message: &Message) -> Result<(), SimbusClientError> {
        debug!("{} -> {}", self.name, message);
        self.stream.write_all(message.encode().as_bytes())?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Message, SimbusClientError> {
        loop {
            if let Some(line) = self.framer.next_line()? {
                let message = Message::decode(&line)?;
                debug!("{} <- {}", self.name, message);
                return Ok(message);
            }
            let count = self.stream.read(&mut self.buffer)?;
            if count == 0 {
                return Err(SimbusClientError::Disconnected);
            }
            self.framer.push(&self.buffer[..count]);
        }
    }
}
