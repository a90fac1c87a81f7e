//! # Simbus Shared
//! The synchronization protocol spoken between simbus-server & its
//! participants: exact simulation time, four-state signal vectors and the
//! line-oriented wire codec.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod address;
mod messages;
mod signal;
mod sim_time;
mod types;

pub use address::{AddressError, BusAddress, DEFAULT_HOST};
pub use messages::{constants, error::CodecError, LineFramer, Message};
pub use signal::{BitValue, SignalError, SignalMap, SignalVector, SignalWidths};
pub use sim_time::{SimTime, TimeError};
pub use types::{ConnectionKey, DeviceIdent, DeviceOptions};
