use simbus_shared::{CodecError, ConnectionKey};

use crate::transport::Accepted;

/// Everything the connection tasks report to the control loop
pub(crate) enum ServerEvent {
    /// A participant connected to bus number `bus`
    Accepted { bus: usize, stream: Accepted },
    /// A complete line arrived
    Line {
        connection: ConnectionKey,
        line: String,
    },
    /// The byte stream could not be split into lines; the reader has stopped
    Malformed {
        connection: ConnectionKey,
        error: CodecError,
    },
    /// End of stream or a read error
    Closed { connection: ConnectionKey },
}
