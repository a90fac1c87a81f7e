use std::io;

use thiserror::Error;

use simbus_shared::{CodecError, DeviceIdent, TimeError};

use crate::bus::ProtocolKind;

/// Errors found while validating a bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A bus was configured without a name
    #[error("Bus name must not be empty")]
    EmptyBusName,

    /// Two buses share a name
    #[error("Bus name '{name}' is configured more than once")]
    DuplicateBusName { name: String },

    /// Two buses listen on the same address
    #[error("Bus '{bus}' listens on {address}, which is already used by another bus")]
    DuplicateAddress { bus: String, address: String },

    /// A bus has no participants
    #[error("Bus '{bus}' has no devices")]
    NoDevices { bus: String },

    /// A device name is empty or contains whitespace or '='
    #[error("Bus '{bus}' has an invalid device name '{name}'")]
    InvalidDeviceName { bus: String, name: String },

    /// Two devices on one bus share a name
    #[error("Bus '{bus}' has more than one device named '{name}'")]
    DuplicateDeviceName { bus: String, name: String },

    /// Two devices on one bus share an identity
    #[error("Bus '{bus}' has more than one device with ident {ident}")]
    DuplicateIdent { bus: String, ident: DeviceIdent },

    /// A device identity is beyond what the protocol can address
    #[error("Bus '{bus}': ident {ident} is out of range, {protocol} allows at most {max}")]
    IdentOutOfRange {
        bus: String,
        protocol: ProtocolKind,
        ident: DeviceIdent,
        max: DeviceIdent,
    },

    /// A point-to-point protocol was configured with the wrong number of devices
    #[error("Bus '{bus}': {protocol} requires exactly {expected} devices, found {found}")]
    WrongDeviceCount {
        bus: String,
        protocol: ProtocolKind,
        expected: usize,
        found: usize,
    },

    /// A point-to-point protocol was configured with the wrong number of hosts
    #[error("Bus '{bus}': {protocol} requires exactly one host, found {found}")]
    WrongHostCount {
        bus: String,
        protocol: ProtocolKind,
        found: usize,
    },

    /// Clock timing violates `0 < hold < high` or `0 < setup < low`
    #[error("Bus '{bus}': clock timing is invalid, {reason}")]
    InvalidClockTiming { bus: String, reason: &'static str },

    /// The protocol engine rejected the bus options
    #[error("Bus '{bus}': {source}")]
    Protocol {
        bus: String,
        #[source]
        source: ProtocolError,
    },
}

/// Errors raised by a protocol engine while resolving participant options
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// An option value could not be parsed or is out of range
    #[error("Option {key}={value} is invalid: {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: &'static str,
    },

    /// A required option was neither announced nor configured on the bus
    #[error("Device '{device}' did not announce {key} and the bus configures no default")]
    MissingOption { device: String, key: &'static str },

    /// The two ends of a link announced incompatible options
    #[error("{key} disagrees: '{left}' uses {left_value}, '{right}' expects {right_value}")]
    OptionMismatch {
        key: &'static str,
        left: String,
        left_value: usize,
        right: String,
        right_value: usize,
    },

    /// A link end is missing at assembly
    #[error("No device is acting as {role}")]
    MissingRole { role: &'static str },
}

/// Top level errors of the simbus server
#[derive(Debug, Error)]
pub enum SimbusServerError {
    /// A HELLO could not be matched to a free device slot
    #[error("Bus '{bus}' rejected device '{name}': {reason}")]
    ConnectionRejected {
        bus: String,
        name: String,
        reason: String,
    },

    /// A line from a participant failed to decode or validate
    #[error("Bus '{bus}': malformed message from {peer}: {source}")]
    MalformedMessage {
        bus: String,
        peer: String,
        #[source]
        source: CodecError,
    },

    /// A participant sent a well formed message at the wrong time
    #[error("Bus '{bus}': device '{device}' violated the protocol: {reason}")]
    ProtocolViolation {
        bus: String,
        device: String,
        reason: String,
    },

    /// A participant connection ended without FINISH
    #[error("Bus '{bus}': device '{device}' disconnected")]
    PeerDisconnected { bus: String, device: String },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Simulation time can no longer be represented
    #[error(transparent)]
    Time(#[from] TimeError),

    /// `pipe:` addresses need Unix-domain sockets
    #[error("Address {address} is not supported on this platform")]
    UnsupportedAddress { address: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every configured bus was rejected
    #[error("No valid bus is configured")]
    NoBuses,
}
