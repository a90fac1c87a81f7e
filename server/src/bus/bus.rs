use log::{debug, info, warn};

use simbus_shared::{
    BusAddress, CodecError, ConnectionKey, DeviceIdent, DeviceOptions, Message, SimTime,
};

use super::{BusConfig, Participants};
use crate::{
    error::{ConfigError, SimbusServerError},
    protocol::{self, ClockSequencer, Protocol, StepContext},
    trace::Tracer,
};

/// What a message from an attached participant amounted to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    /// The participant offered its signals for the next step
    Ready,
    /// The participant retired; acknowledge and close its connection
    Finished,
}

/// One simulated bus: its participants, the engine resolving their
/// signals and the clock driving time forward.
pub struct Bus {
    config: BusConfig,
    participants: Participants,
    protocol: Box<dyn Protocol>,
    clock: ClockSequencer,
    current_time: SimTime,
    assembled: bool,
    finished: bool,
    steps: u64,
    tracer: Box<dyn Tracer>,
}

impl Bus {
    pub fn new(config: BusConfig, tracer: Box<dyn Tracer>) -> Result<Self, ConfigError> {
        config.validate()?;
        let protocol = protocol::create(&config)?;
        Ok(Self {
            participants: Participants::new(&config.devices),
            clock: ClockSequencer::new(config.clock),
            config,
            protocol,
            current_time: SimTime::ZERO,
            assembled: false,
            finished: false,
            steps: 0,
            tracer,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn address(&self) -> &BusAddress {
        &self.config.address
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether every participant has connected and the engine is running
    pub fn is_assembled(&self) -> bool {
        self.assembled
    }

    /// Whether the bus has been torn down
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_all_ready(&self) -> bool {
        self.participants.is_all_ready()
    }

    pub fn is_all_finished(&self) -> bool {
        self.participants.is_all_finished()
    }

    fn name_owned(&self) -> String {
        self.config.name.clone()
    }

    /// Matches a HELLO to a free device slot and binds it to `connection`.
    ///
    /// # Errors
    /// `SimbusServerError::ConnectionRejected` when the name is unknown, the
    /// slot was claimed before or the engine refuses the announced options.
    pub fn handshake(
        &mut self,
        connection: ConnectionKey,
        name: &str,
        options: DeviceOptions,
    ) -> Result<DeviceIdent, SimbusServerError> {
        let reject = |reason: String| SimbusServerError::ConnectionRejected {
            bus: self.config.name.clone(),
            name: name.to_string(),
            reason,
        };
        if self.finished {
            return Err(reject("the bus has shut down".to_string()));
        }
        let Some(slot) = self.participants.by_name_mut(name) else {
            return Err(reject("no such device".to_string()));
        };
        if slot.is_claimed() {
            return Err(reject("the device has already connected".to_string()));
        }
        let widths = self
            .protocol
            .client_signals(slot.device(), &options)
            .map_err(|error| reject(error.to_string()))?;

        slot.claim(connection, options, widths);
        info!(
            "{}: device '{}' connected as ident {}",
            self.config.name,
            name,
            slot.ident()
        );
        Ok(slot.ident())
    }

    /// Decodes a line from participant `ident`, checking READY signals
    /// against what it may drive.
    pub fn decode(&self, ident: DeviceIdent, line: &str) -> Result<Message, CodecError> {
        let message = Message::decode(line)?;
        if let (Message::Ready { signals, .. }, Some(slot)) =
            (&message, self.participants.get(ident))
        {
            slot.client_widths().validate(signals)?;
        }
        Ok(message)
    }

    /// Applies a decoded message from participant `ident`.
    ///
    /// # Errors
    /// `SimbusServerError::ProtocolViolation` for a message that is out of
    /// place; the participant has been retired by the time this returns.
    pub fn receive(
        &mut self,
        ident: DeviceIdent,
        message: Message,
    ) -> Result<Received, SimbusServerError> {
        let bus = self.name_owned();
        let current_time = self.current_time;
        let Some(slot) = self.participants.get_mut(ident) else {
            return Err(SimbusServerError::ProtocolViolation {
                bus,
                device: ident.to_string(),
                reason: "no such participant".to_string(),
            });
        };
        let violation = |reason: String| SimbusServerError::ProtocolViolation {
            bus: bus.clone(),
            device: slot.name().to_string(),
            reason,
        };

        let outcome = match message {
            Message::Ready { .. } if slot.is_finished() => {
                Err(violation("READY after FINISH".to_string()))
            }
            Message::Ready { .. } if slot.is_ready() => Err(violation(
                "READY sent twice without waiting for UNTIL".to_string(),
            )),
            Message::Ready { time, signals } => {
                if time > current_time {
                    debug!(
                        "{}: '{}' offered {} ahead of bus time {}",
                        bus,
                        slot.name(),
                        time,
                        current_time
                    );
                }
                slot.offer(time, signals);
                Ok(Received::Ready)
            }
            Message::Finish => Ok(Received::Finished),
            other => Err(violation(format!(
                "unexpected {} after the handshake",
                other.command()
            ))),
        };

        match outcome {
            Ok(Received::Finished) | Err(_) => {
                slot.park();
                slot.take_connection();
                if outcome.is_ok() {
                    info!("{}: device '{}' finished", bus, slot.name());
                }
            }
            Ok(Received::Ready) => {}
        }
        outcome
    }

    /// Participant `ident` lost its connection. Unless it had already
    /// finished this counts as an implicit FINISH, reported as
    /// `PeerDisconnected`.
    pub fn disconnect(&mut self, ident: DeviceIdent) -> Option<SimbusServerError> {
        let bus = self.name_owned();
        let slot = self.participants.get_mut(ident)?;
        slot.take_connection();
        if slot.is_finished() {
            return None;
        }
        slot.park();
        Some(SimbusServerError::PeerDisconnected {
            bus,
            device: slot.name().to_string(),
        })
    }

    /// Runs one step if every participant is ready.
    ///
    /// Returns `Ok(None)` while the barrier is still open, otherwise the
    /// UNTIL for every connected participant still on the bus. The first
    /// step assembles the bus.
    ///
    /// # Errors
    /// A `Protocol` error when the announced options are incompatible, a
    /// `Time` error when the bus clock overflows. Either is fatal for the
    /// bus.
    pub fn advance(&mut self) -> Result<Option<Vec<(ConnectionKey, Message)>>, SimbusServerError> {
        if self.finished || !self.is_all_ready() {
            return Ok(None);
        }

        if !self.assembled {
            self.protocol.wrap_up_configuration(&self.participants)?;
            let mut context = StepContext {
                participants: &mut self.participants,
                phase: self.clock.phase(),
                time: self.current_time,
                tracer: self.tracer.as_mut(),
            };
            self.protocol.init(&mut context);
            self.assembled = true;
            info!(
                "{}: assembled {} participants, running {}",
                self.config.name,
                self.participants.len(),
                self.protocol.kind()
            );
        }

        let (phase, duration) = self.clock.advance();
        self.current_time = self.current_time.checked_add(&duration)?;
        self.tracer.set_time(self.current_time);
        let mut context = StepContext {
            participants: &mut self.participants,
            phase,
            time: self.current_time,
            tracer: self.tracer.as_mut(),
        };
        self.protocol.step(&mut context);
        self.steps += 1;

        let mut outgoing = Vec::new();
        for slot in self.participants.iter_mut() {
            if slot.is_finished() {
                continue;
            }
            slot.clear_ready();
            if let Some(connection) = slot.connection() {
                outgoing.push((
                    connection,
                    Message::Until {
                        time: self.current_time,
                        signals: slot.send_signals().clone(),
                    },
                ));
            }
        }
        Ok(Some(outgoing))
    }

    /// Marks the bus finished and releases every connection still bound
    /// to it.
    pub fn tear_down(&mut self) -> Vec<ConnectionKey> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let connections: Vec<ConnectionKey> = self
            .participants
            .iter_mut()
            .filter_map(|slot| slot.take_connection())
            .collect();
        if !self.is_all_finished() {
            warn!(
                "{}: torn down with participants still attached",
                self.config.name
            );
        }
        info!(
            "{}: finished after {} steps at {}",
            self.config.name, self.steps, self.current_time
        );
        connections
    }
}
