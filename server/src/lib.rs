//! # Simbus Server
//! A lockstep co-simulation arbiter. Independent simulator processes attach
//! to a bus over TCP or Unix sockets, offer the signals they drive, and
//! wait; once every participant on a bus is ready the bus's protocol engine
//! resolves the signals, advances simulated time by one clock phase and
//! releases everyone with the values they now see.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod shared {
    pub use simbus_shared::{
        BitValue, BusAddress, DeviceIdent, DeviceOptions, Message, SignalMap, SignalVector,
        SignalWidths, SimTime,
    };
}

mod bus;
mod connection;
mod error;
mod events;
mod protocol;
mod server;
mod trace;
mod transport;

pub use bus::{
    Bus, BusConfig, ClockTiming, DeviceConfig, ParticipantSlot, Participants, ProtocolKind,
    Received, PCI_MAX_IDENT,
};
pub use error::{ConfigError, ProtocolError, SimbusServerError};
pub use protocol::{
    create as create_protocol, Arbiter, Axi4, ClockMode, ClockPhase, ClockSequencer, Direction,
    Link, Parking, Pci, PcieTlp, PointToPoint, Protocol, RelaySignal, RelayTable, StepContext,
};
pub use server::{BusSummary, Server, ServerConfig};
pub use trace::{tracer_for, LogTracer, NullTracer, Tracer};
