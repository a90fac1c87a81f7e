//! Stream listeners for the two address schemes a bus can listen on

use std::{io, path::Path};

use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
};

use simbus_shared::BusAddress;

use crate::error::SimbusServerError;

pub(crate) type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// An accepted participant stream, split for its reader and writer tasks
pub(crate) struct Accepted {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
    pub peer: String,
}

pub(crate) enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: tokio::net::UnixListener,
        path: std::path::PathBuf,
    },
}

impl Listener {
    pub async fn bind(address: &BusAddress) -> Result<Listener, SimbusServerError> {
        match address {
            BusAddress::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port)).await?;
                Ok(Listener::Tcp(listener))
            }
            BusAddress::Pipe { path } => bind_pipe(address, path),
        }
    }

    /// Where participants can reach this listener; a `tcp:` port of 0 is
    /// replaced by the port actually bound.
    pub fn local_address(&self) -> io::Result<BusAddress> {
        match self {
            Listener::Tcp(listener) => Ok(BusAddress::from(listener.local_addr()?)),
            #[cfg(unix)]
            Listener::Unix { path, .. } => Ok(BusAddress::pipe(path.clone())),
        }
    }

    /// Filesystem entry to remove when the bus shuts down
    pub fn socket_path(&self) -> Option<std::path::PathBuf> {
        match self {
            Listener::Tcp(_) => None,
            #[cfg(unix)]
            Listener::Unix { path, .. } => Some(path.clone()),
        }
    }

    pub async fn accept(&self) -> io::Result<Accepted> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                // every step is a round trip of small lines
                stream.set_nodelay(true)?;
                let (reader, writer) = stream.into_split();
                Ok(Accepted {
                    reader: Box::new(reader),
                    writer: Box::new(writer),
                    peer: peer.to_string(),
                })
            }
            #[cfg(unix)]
            Listener::Unix { listener, path } => {
                let (stream, _) = listener.accept().await?;
                let (reader, writer) = stream.into_split();
                Ok(Accepted {
                    reader: Box::new(reader),
                    writer: Box::new(writer),
                    peer: path.display().to_string(),
                })
            }
        }
    }
}

cfg_if! {
    if #[cfg(unix)] {
        /// A socket left behind by an earlier run is replaced. Anything
        /// else at `path` is left alone and the bind fails.
        fn bind_pipe(_address: &BusAddress, path: &Path) -> Result<Listener, SimbusServerError> {
            use std::os::unix::fs::FileTypeExt;

            if let Ok(metadata) = std::fs::symlink_metadata(path) {
                if metadata.file_type().is_socket() {
                    debug!("removing stale socket {}", path.display());
                    std::fs::remove_file(path)?;
                }
            }
            let listener = tokio::net::UnixListener::bind(path)?;
            Ok(Listener::Unix {
                listener,
                path: path.to_path_buf(),
            })
        }
    } else {
        fn bind_pipe(address: &BusAddress, _path: &Path) -> Result<Listener, SimbusServerError> {
            Err(SimbusServerError::UnsupportedAddress {
                address: address.to_string(),
            })
        }
    }
}

pub(crate) fn remove_socket_file(path: &Path) {
    if let Err(error) = std::fs::remove_file(path) {
        if error.kind() != io::ErrorKind::NotFound {
            warn!("could not remove socket {}: {}", path.display(), error);
        }
    }
}
