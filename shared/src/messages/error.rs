use thiserror::Error;

use crate::{signal::SignalError, sim_time::TimeError};

/// Errors that can occur while framing or decoding a protocol line.
/// Every variant means the peer sent a malformed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// No newline arrived within the bounded line buffer
    #[error("Line exceeds {limit} bytes without a terminating newline")]
    LineTooLong { limit: usize },

    /// The line is not valid UTF-8
    #[error("Line is not valid UTF-8 text")]
    InvalidUtf8,

    /// The line holds no tokens at all
    #[error("Empty protocol line")]
    EmptyLine,

    /// The first token is not a known command word
    #[error("Unknown command '{command}'. Expected one of HELLO, YOU-ARE, NAK, READY, UNTIL, FINISH")]
    UnknownCommand { command: String },

    /// A required positional argument is absent
    #[error("{command} is missing its {argument} argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// A command that takes no arguments was given some
    #[error("{command} takes no arguments, found '{token}'")]
    UnexpectedArgument { command: &'static str, token: String },

    /// The time token is malformed
    #[error("Invalid time: {0}")]
    InvalidTime(#[from] TimeError),

    /// The YOU-ARE identity is not an unsigned integer
    #[error("Invalid device identity '{text}'")]
    InvalidIdent { text: String },

    /// A `NAME=VALUE` token has no `=`
    #[error("Token '{token}' is missing '='. Signals and options must be written NAME=VALUE")]
    MissingEquals { token: String },

    /// A `NAME=VALUE` token has an empty name
    #[error("Token '{token}' has an empty name")]
    EmptyName { token: String },

    /// The value of a signal is not a valid bit string
    #[error("Signal {name} has an invalid value: {source}")]
    InvalidSignalValue { name: String, source: SignalError },

    /// The same signal appears twice in one message
    #[error("Signal {name} appears more than once")]
    DuplicateSignal { name: String },

    /// The signal is not part of this participant's bus configuration
    #[error("Signal {name} is not driven by this participant on this bus")]
    UnknownSignal { name: String },

    /// The signal's value has the wrong number of bits
    #[error("Signal {name} has {found} bits but is configured {expected} bits wide")]
    WidthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}
