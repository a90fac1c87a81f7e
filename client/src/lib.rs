//! # Simbus Client
//! The participant side of a simbus bus: a blocking connection that
//! introduces itself with HELLO and then steps in lockstep with every other
//! participant through READY/UNTIL rendezvous.

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
        BitValue, BusAddress, DeviceIdent, DeviceOptions, SignalMap, SignalVector, SimTime,
    };
}

mod client_config;
mod error;
mod participant;
mod stream;

pub use client_config::ClientConfig;
pub use error::SimbusClientError;
pub use participant::{Edge, Participant};
