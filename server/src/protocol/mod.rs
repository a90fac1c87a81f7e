//! Protocol engines: each one decides which signals a participant may
//! drive and how driven values turn into the values every participant
//! sees at the next rendezvous.

mod axi4;
mod clock;
mod options;
mod p2p;
mod pci;
mod pcie_tlp;
mod relay;

pub use axi4::Axi4;
pub use clock::{ClockPhase, ClockSequencer};
pub use p2p::{ClockMode, PointToPoint};
pub use pci::{Arbiter, Parking, Pci};
pub use pcie_tlp::PcieTlp;
pub use relay::{Direction, Link, RelaySignal, RelayTable};

use simbus_shared::{BitValue, DeviceOptions, SignalVector, SignalWidths, SimTime};

use crate::{
    bus::{BusConfig, DeviceConfig, Participants, ProtocolKind},
    error::{ConfigError, ProtocolError},
    trace::Tracer,
};

/// Bus state handed to an engine for one step
pub struct StepContext<'a> {
    pub participants: &'a mut Participants,
    pub phase: ClockPhase,
    pub time: SimTime,
    pub tracer: &'a mut dyn Tracer,
}

impl<'a> StepContext<'a> {
    /// Level of the bus clock in the current phase
    pub fn clock(&self) -> BitValue {
        self.phase.level()
    }

    pub fn is_rising_edge(&self) -> bool {
        self.phase == ClockPhase::Rising
    }

    /// Sends `value` on `name` to every participant and traces it
    pub fn broadcast(&mut self, name: &str, value: SignalVector) {
        self.tracer.set_signal(name, &value);
        for slot in self.participants.iter_mut() {
            slot.send(name, value.clone());
        }
    }
}

/// A protocol engine, one per bus
pub trait Protocol: Send {
    fn kind(&self) -> ProtocolKind;

    /// Signals `device` may drive given the options it announced in HELLO.
    /// An error rejects the handshake.
    fn client_signals(
        &self,
        device: &DeviceConfig,
        options: &DeviceOptions,
    ) -> Result<SignalWidths, ProtocolError>;

    /// Cross-checks the options of every participant once all have
    /// connected. An error tears the bus down.
    fn wrap_up_configuration(&mut self, participants: &Participants) -> Result<(), ProtocolError>;

    /// Publishes the values participants see before the first step
    fn init(&mut self, context: &mut StepContext);

    /// Resolves driven signals into the values sent with the next UNTIL
    fn step(&mut self, context: &mut StepContext);
}

/// Builds the engine a bus is configured for
pub fn create(config: &BusConfig) -> Result<Box<dyn Protocol>, ConfigError> {
    let wrap = |source: ProtocolError| ConfigError::Protocol {
        bus: config.name.clone(),
        source,
    };
    let protocol: Box<dyn Protocol> = match config.protocol {
        ProtocolKind::PointToPoint => Box::new(PointToPoint::new(config).map_err(wrap)?),
        ProtocolKind::Pci => Box::new(Pci::new(config).map_err(wrap)?),
        ProtocolKind::Axi4 => Box::new(Axi4::new(config).map_err(wrap)?),
        ProtocolKind::PcieTlp => Box::new(PcieTlp::new(config).map_err(wrap)?),
    };
    Ok(protocol)
}
