use std::{
    io::{self, Read, Write},
    net::TcpStream,
    path::Path,
};

use simbus_shared::BusAddress;

use crate::SimbusClientError;

/// Blocking stream to a bus listener
pub(crate) enum ClientStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl ClientStream {
    pub fn connect(address: &BusAddress) -> Result<ClientStream, SimbusClientError> {
        match address {
            BusAddress::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))?;
                stream.set_nodelay(true)?;
                Ok(ClientStream::Tcp(stream))
            }
            BusAddress::Pipe { path } => connect_pipe(address, path),
        }
    }
}

cfg_if! {
    if #[cfg(unix)] {
        fn connect_pipe(_address: &BusAddress, path: &Path) -> Result<ClientStream, SimbusClientError> {
            Ok(ClientStream::Unix(std::os::unix::net::UnixStream::connect(path)?))
        }
    } else {
        fn connect_pipe(address: &BusAddress, _path: &Path) -> Result<ClientStream, SimbusClientError> {
            Err(SimbusClientError::UnsupportedAddress {
                address: address.to_string(),
            })
        }
    }
}

impl Read for ClientStream {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self {
            ClientStream::Tcp(stream) => stream.read(buffer),
            #[cfg(unix)]
            ClientStream::Unix(stream) => stream.read(buffer),
        }
    }
}

impl Write for ClientStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        match self {
            ClientStream::Tcp(stream) => stream.write(bytes),
            #[cfg(unix)]
            ClientStream::Unix(stream) => stream.write(bytes),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ClientStream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ClientStream::Unix(stream) => stream.flush(),
        }
    }
}
