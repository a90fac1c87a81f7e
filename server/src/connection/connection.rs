use log::debug;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use simbus_shared::{ConnectionKey, DeviceIdent, LineFramer, Message};

use crate::{
    events::ServerEvent,
    transport::{Accepted, BoxedReader, BoxedWriter},
};

const READ_BUFFER_SIZE: usize = 4096;

/// Control loop handle on one participant stream
pub(crate) struct Connection {
    /// Index of the bus this stream was accepted on
    pub bus: usize,
    /// Set once HELLO has been answered with YOU-ARE
    pub ident: Option<DeviceIdent>,
    pub peer: String,
    outgoing: UnboundedSender<String>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Spawns the reader and writer tasks for an accepted stream
    pub fn open(
        key: ConnectionKey,
        bus: usize,
        stream: Accepted,
        max_line_length: usize,
        events: UnboundedSender<ServerEvent>,
    ) -> Self {
        let Accepted {
            reader,
            writer,
            peer,
        } = stream;
        let (outgoing, queue) = mpsc::unbounded_channel();
        tokio::spawn(write_lines(key, writer, queue));
        let reader = tokio::spawn(read_lines(key, reader, max_line_length, events));
        Self {
            bus,
            ident: None,
            peer,
            outgoing,
            reader,
        }
    }

    pub fn send(&self, message: &Message) {
        if self.outgoing.send(message.encode()).is_err() {
            debug!("{}: writer already gone, dropping {}", self.peer, message.command());
        }
    }

    /// Stops reading. Lines already queued are written before the stream
    /// closes.
    pub fn close(self) {
        self.reader.abort();
    }
}

async fn read_lines(
    key: ConnectionKey,
    mut reader: BoxedReader,
    max_line_length: usize,
    events: UnboundedSender<ServerEvent>,
) {
    let mut framer = LineFramer::new(max_line_length);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let count = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(count) => count,
            Err(error) => {
                debug!("connection {}: read failed: {}", key, error);
                break;
            }
        };
        framer.push(&buffer[..count]);
        loop {
            match framer.next_line() {
                Ok(Some(line)) => {
                    let event = ServerEvent::Line {
                        connection: key,
                        line,
                    };
                    if events.send(event).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    let _ = events.send(ServerEvent::Malformed {
                        connection: key,
                        error,
                    });
                    return;
                }
            }
        }
    }
    let _ = events.send(ServerEvent::Closed { connection: key });
}

async fn write_lines(key: ConnectionKey, mut writer: BoxedWriter, mut queue: UnboundedReceiver<String>) {
    while let Some(line) = queue.recv().await {
        if let Err(error) = writer.write_all(line.as_bytes()).await {
            debug!("connection {}: write failed: {}", key, error);
            return;
        }
    }
    let _ = writer.shutdown().await;
}
