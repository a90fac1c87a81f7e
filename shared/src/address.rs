use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";

/// Errors that can occur when parsing a bus address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The address has no `scheme:` prefix
    #[error("Bus address '{text}' has no scheme. Expected tcp:[host:]port or pipe:path")]
    MissingScheme { text: String },

    /// The scheme is neither `tcp` nor `pipe`
    #[error("Unknown bus address scheme '{scheme}'. Expected tcp or pipe")]
    UnknownScheme { scheme: String },

    /// The TCP port is not a 16-bit unsigned integer
    #[error("Invalid TCP port '{text}'")]
    InvalidPort { text: String },

    /// A `pipe:` address with no path
    #[error("pipe: address requires a path")]
    EmptyPath,
}

/// Where a bus listens, in the `tcp:[host:]port` / `pipe:path` notation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BusAddress {
    Tcp { host: String, port: u16 },
    /// Unix-domain stream socket
    Pipe { path: PathBuf },
}

impl BusAddress {
    pub fn tcp(host: &str, port: u16) -> Self {
        BusAddress::Tcp {
            host: host.to_string(),
            port,
        }
    }

    pub fn pipe<P: Into<PathBuf>>(path: P) -> Self {
        BusAddress::Pipe { path: path.into() }
    }
}

impl From<SocketAddr> for BusAddress {
    fn from(addr: SocketAddr) -> Self {
        BusAddress::tcp(&addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusAddress::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
            BusAddress::Pipe { path } => write!(f, "pipe:{}", path.display()),
        }
    }
}

impl FromStr for BusAddress {
    type Err = AddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = text.split_once(':').ok_or_else(|| AddressError::MissingScheme {
            text: text.to_string(),
        })?;
        match scheme {
            "tcp" => {
                let (host, port) = match rest.rsplit_once(':') {
                    Some((host, port)) => (host, port),
                    None => (DEFAULT_HOST, rest),
                };
                let port = port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
                    text: port.to_string(),
                })?;
                let host = if host.is_empty() { DEFAULT_HOST } else { host };
                Ok(BusAddress::tcp(host, port))
            }
            "pipe" => {
                if rest.is_empty() {
                    return Err(AddressError::EmptyPath);
                }
                Ok(BusAddress::pipe(rest))
            }
            other => Err(AddressError::UnknownScheme {
                scheme: other.to_string(),
            }),
        }
    }
}
