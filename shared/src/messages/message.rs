use std::fmt::{self, Write};

use crate::{
    signal::{SignalMap, SignalVector},
    sim_time::SimTime,
    types::{DeviceIdent, DeviceOptions},
};

use super::{constants, error::CodecError};

/// One line of the synchronization protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// C→S: introduce a participant by its configured device name
    Hello { name: String, options: DeviceOptions },
    /// S→C: handshake accepted, the participant's identity number
    YouAre { ident: DeviceIdent },
    /// S→C: handshake refused
    Nak,
    /// C→S: the participant is at `time` and drives `signals`
    Ready { time: SimTime, signals: SignalMap },
    /// S→C: the resolved wires, valid until the participant's next READY
    Until { time: SimTime, signals: SignalMap },
    /// Either direction: the participant is leaving the bus
    Finish,
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Message::Hello { .. } => constants::HELLO,
            Message::YouAre { .. } => constants::YOU_ARE,
            Message::Nak => constants::NAK,
            Message::Ready { .. } => constants::READY,
            Message::Until { .. } => constants::UNTIL,
            Message::Finish => constants::FINISH,
        }
    }

    /// Encodes the message as a newline-terminated line. Zero-width
    /// signals carry no wires and are left out.
    pub fn encode(&self) -> String {
        let mut line = self.to_string();
        line.push('\n');
        line
    }

    /// Decodes one line. A trailing `\n` or `\r\n` is accepted but not
    /// required. Signal widths are not checked here, see
    /// [`SignalWidths::validate`](crate::SignalWidths::validate).
    ///
    /// # Errors
    /// Returns a `CodecError` describing the first malformed token.
    pub fn decode(line: &str) -> Result<Message, CodecError> {
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let mut tokens = line.split_ascii_whitespace();
        let Some(command) = tokens.next() else {
            return Err(CodecError::EmptyLine);
        };

        match command {
            constants::HELLO => {
                let name = tokens.next().ok_or(CodecError::MissingArgument {
                    command: constants::HELLO,
                    argument: "name",
                })?;
                let mut options = DeviceOptions::new();
                for token in tokens {
                    let (key, value) = split_assignment(token)?;
                    options.insert(key.to_string(), value.to_string());
                }
                Ok(Message::Hello {
                    name: name.to_string(),
                    options,
                })
            }
            constants::YOU_ARE => {
                let text = tokens.next().ok_or(CodecError::MissingArgument {
                    command: constants::YOU_ARE,
                    argument: "ident",
                })?;
                let ident = text.parse::<DeviceIdent>().map_err(|_| CodecError::InvalidIdent {
                    text: text.to_string(),
                })?;
                expect_end(constants::YOU_ARE, tokens)?;
                Ok(Message::YouAre { ident })
            }
            constants::NAK => {
                expect_end(constants::NAK, tokens)?;
                Ok(Message::Nak)
            }
            constants::FINISH => {
                expect_end(constants::FINISH, tokens)?;
                Ok(Message::Finish)
            }
            constants::READY | constants::UNTIL => {
                let command = if command == constants::READY {
                    constants::READY
                } else {
                    constants::UNTIL
                };
                let time = tokens
                    .next()
                    .ok_or(CodecError::MissingArgument {
                        command,
                        argument: "time",
                    })?
                    .parse::<SimTime>()?;
                let signals = decode_signals(tokens)?;
                if command == constants::READY {
                    Ok(Message::Ready { time, signals })
                } else {
                    Ok(Message::Until { time, signals })
                }
            }
            other => Err(CodecError::UnknownCommand {
                command: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())?;
        match self {
            Message::Hello { name, options } => {
                write!(f, " {}", name)?;
                for (key, value) in options {
                    write!(f, " {}={}", key, value)?;
                }
            }
            Message::YouAre { ident } => write!(f, " {}", ident)?,
            Message::Ready { time, signals } | Message::Until { time, signals } => {
                write!(f, " {}", time)?;
                for (name, value) in signals.iter().filter(|(_, value)| value.width() > 0) {
                    f.write_char(' ')?;
                    f.write_str(name)?;
                    f.write_char('=')?;
                    write!(f, "{}", value)?;
                }
            }
            Message::Nak | Message::Finish => {}
        }
        Ok(())
    }
}

fn split_assignment(token: &str) -> Result<(&str, &str), CodecError> {
    let (name, value) = token.split_once('=').ok_or_else(|| CodecError::MissingEquals {
        token: token.to_string(),
    })?;
    if name.is_empty() {
        return Err(CodecError::EmptyName {
            token: token.to_string(),
        });
    }
    Ok((name, value))
}

fn decode_signals<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<SignalMap, CodecError> {
    let mut signals = SignalMap::new();
    for token in tokens {
        let (name, value) = split_assignment(token)?;
        let vector = value
            .parse::<SignalVector>()
            .map_err(|source| CodecError::InvalidSignalValue {
                name: name.to_string(),
                source,
            })?;
        if signals.insert(name.to_string(), vector).is_some() {
            return Err(CodecError::DuplicateSignal {
                name: name.to_string(),
            });
        }
    }
    Ok(signals)
}

fn expect_end<'a>(
    command: &'static str,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<(), CodecError> {
    match tokens.next() {
        Some(token) => Err(CodecError::UnexpectedArgument {
            command,
            token: token.to_string(),
        }),
        None => Ok(()),
    }
}
