mod bus;
pub use bus::{Bus, Received};

mod bus_config;
pub use bus_config::{BusConfig, ClockTiming, DeviceConfig, ProtocolKind, PCI_MAX_IDENT};

mod participant;
pub use participant::{ParticipantSlot, Participants};
