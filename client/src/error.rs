use std::io;

use thiserror::Error;

use simbus_shared::CodecError;

/// Errors a participant can run into while talking to its bus
#[derive(Debug, Error)]
pub enum SimbusClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server sent a line that does not decode
    #[error("Malformed line from server: {0}")]
    Codec(#[from] CodecError),

    /// The server answered HELLO with NAK
    #[error("Bus rejected device '{name}'")]
    Rejected { name: String },

    /// The server answered with a message that makes no sense here
    #[error("Expected {expected} from server, got {found}")]
    UnexpectedMessage {
        expected: &'static str,
        found: &'static str,
    },

    /// The server ended the simulation for this participant
    #[error("Server finished the simulation")]
    Finished,

    /// The connection closed while waiting for the server
    #[error("Server closed the connection")]
    Disconnected,

    /// The last UNTIL did not carry the requested signal
    #[error("Signal '{name}' was not delivered by the bus")]
    MissingSignal { name: String },

    /// `pipe:` addresses need Unix-domain sockets
    #[error("Address {address} is not supported on this platform")]
    UnsupportedAddress { address: String },
}
