use std::{collections::HashMap, path::PathBuf, time::Duration};

use log::{debug, error, info, warn};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use simbus_shared::{BusAddress, ConnectionKey, Message, SimTime};

use crate::{
    bus::{Bus, BusConfig, Received},
    connection::Connection,
    error::{ConfigError, SimbusServerError},
    events::ServerEvent,
    trace::tracer_for,
    transport::{self, Accepted, Listener},
    ServerConfig,
};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// How a bus ended, reported by `Server::run`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusSummary {
    pub name: String,
    pub assembled: bool,
    pub steps: u64,
    pub time: SimTime,
}

struct BusEntry {
    bus: Bus,
    acceptor: Option<JoinHandle<()>>,
    socket_path: Option<PathBuf>,
}

/// Serves any number of buses from one control loop. Connection tasks feed
/// lines in; the loop owns every bus and decides when each one steps.
pub struct Server {
    max_line_length: usize,
    buses: Vec<BusEntry>,
    connections: HashMap<ConnectionKey, Connection>,
    next_connection: ConnectionKey,
    event_sender: UnboundedSender<ServerEvent>,
    event_receiver: UnboundedReceiver<ServerEvent>,
    listening: bool,
}

impl Server {
    /// Builds every configured bus. Buses that fail validation are logged
    /// and left out.
    ///
    /// # Errors
    /// `SimbusServerError::NoBuses` if no bus survives validation.
    pub fn new(config: ServerConfig) -> Result<Self, SimbusServerError> {
        let mut buses: Vec<BusEntry> = Vec::new();
        for bus_config in config.buses {
            let name = bus_config.name.clone();
            match Self::build_bus(&buses, bus_config, config.trace) {
                Ok(bus) => buses.push(BusEntry {
                    bus,
                    acceptor: None,
                    socket_path: None,
                }),
                Err(error) => error!("bus '{}' not started: {}", name, error),
            }
        }
        if buses.is_empty() {
            return Err(SimbusServerError::NoBuses);
        }

        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        Ok(Self {
            max_line_length: config.max_line_length,
            buses,
            connections: HashMap::new(),
            next_connection: 0,
            event_sender,
            event_receiver,
            listening: false,
        })
    }

    fn build_bus(existing: &[BusEntry], config: BusConfig, trace: bool) -> Result<Bus, ConfigError> {
        for entry in existing {
            if entry.bus.name() == config.name {
                return Err(ConfigError::DuplicateBusName { name: config.name });
            }
            if shares_address(entry.bus.address(), &config.address) {
                return Err(ConfigError::DuplicateAddress {
                    bus: config.name,
                    address: config.address.to_string(),
                });
            }
        }
        let tracer = tracer_for(&config.name, trace);
        Bus::new(config, tracer)
    }

    /// Opens a listener for every bus and reports where each one can be
    /// reached
    pub async fn listen(&mut self) -> Result<Vec<(String, BusAddress)>, SimbusServerError> {
        let mut bound = Vec::new();
        for (index, entry) in self.buses.iter_mut().enumerate() {
            if entry.acceptor.is_some() || entry.bus.is_finished() {
                continue;
            }
            let listener = Listener::bind(entry.bus.address()).await?;
            let address = listener.local_address()?;
            info!("{}: listening on {}", entry.bus.name(), address);
            entry.socket_path = listener.socket_path();
            entry.acceptor = Some(spawn_acceptor(index, listener, self.event_sender.clone()));
            bound.push((entry.bus.name().to_string(), address));
        }
        self.listening = true;
        Ok(bound)
    }

    /// Returns whether or not the Server has opened its listeners
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether every bus has been torn down
    pub fn is_finished(&self) -> bool {
        self.buses.iter().all(|entry| entry.bus.is_finished())
    }

    /// Serves until every bus has been torn down
    pub async fn run(mut self) -> Result<Vec<BusSummary>, SimbusServerError> {
        if !self.listening {
            self.listen().await?;
        }
        while !self.is_finished() {
            let Some(event) = self.event_receiver.recv().await else {
                break;
            };
            self.handle_event(event);
            while let Ok(event) = self.event_receiver.try_recv() {
                self.handle_event(event);
            }
            self.service_buses();
        }
        info!("all buses finished");
        Ok(self.summaries())
    }

    /// Runs the server on a single-threaded runtime of its own
    pub fn run_blocking(self) -> Result<Vec<BusSummary>, SimbusServerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    fn summaries(&self) -> Vec<BusSummary> {
        self.buses
            .iter()
            .map(|entry| BusSummary {
                name: entry.bus.name().to_string(),
                assembled: entry.bus.is_assembled(),
                steps: entry.bus.steps(),
                time: entry.bus.current_time(),
            })
            .collect()
    }

    // Events

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Accepted { bus, stream } => self.accept(bus, stream),
            ServerEvent::Line { connection, line } => self.handle_line(connection, &line),
            ServerEvent::Malformed { connection, error } => {
                if let Some(record) = self.connections.get(&connection) {
                    let error = SimbusServerError::MalformedMessage {
                        bus: self.buses[record.bus].bus.name().to_string(),
                        peer: record.peer.clone(),
                        source: error,
                    };
                    warn!("{}", error);
                }
                self.drop_connection(connection);
            }
            ServerEvent::Closed { connection } => {
                debug!("connection {} closed by peer", connection);
                self.drop_connection(connection);
            }
        }
    }

    fn accept(&mut self, bus: usize, stream: Accepted) {
        let Some(entry) = self.buses.get(bus) else {
            return;
        };
        if entry.bus.is_finished() {
            debug!("{}: refusing {} after shutdown", entry.bus.name(), stream.peer);
            return;
        }
        let key = self.next_connection;
        self.next_connection += 1;
        debug!("{}: connection {} from {}", entry.bus.name(), key, stream.peer);
        let connection = Connection::open(
            key,
            bus,
            stream,
            self.max_line_length,
            self.event_sender.clone(),
        );
        self.connections.insert(key, connection);
    }

    fn handle_line(&mut self, key: ConnectionKey, line: &str) {
        let Some(connection) = self.connections.get_mut(&key) else {
            return;
        };
        let bus = &mut self.buses[connection.bus].bus;

        let Some(ident) = connection.ident else {
            let result = match Message::decode(line) {
                Ok(Message::Hello { name, options }) => bus.handshake(key, &name, options),
                Ok(other) => Err(SimbusServerError::ProtocolViolation {
                    bus: bus.name().to_string(),
                    device: connection.peer.clone(),
                    reason: format!("{} before HELLO", other.command()),
                }),
                Err(source) => Err(SimbusServerError::MalformedMessage {
                    bus: bus.name().to_string(),
                    peer: connection.peer.clone(),
                    source,
                }),
            };
            match result {
                Ok(ident) => {
                    connection.ident = Some(ident);
                    connection.send(&Message::YouAre { ident });
                }
                Err(error) => {
                    warn!("{}", error);
                    if let SimbusServerError::ConnectionRejected { .. } = error {
                        connection.send(&Message::Nak);
                    }
                    self.close_connection(key);
                }
            }
            return;
        };

        let result = bus
            .decode(ident, line)
            .map_err(|source| SimbusServerError::MalformedMessage {
                bus: bus.name().to_string(),
                peer: connection.peer.clone(),
                source,
            })
            .and_then(|message| bus.receive(ident, message));
        match result {
            Ok(Received::Ready) => {}
            Ok(Received::Finished) => {
                connection.send(&Message::Finish);
                self.close_connection(key);
            }
            Err(error) => {
                warn!("{}", error);
                // already retired by `receive`
                let _ = bus.disconnect(ident);
                self.close_connection(key);
            }
        }
    }

    /// Forgets a connection without touching its bus slot
    fn close_connection(&mut self, key: ConnectionKey) {
        if let Some(connection) = self.connections.remove(&key) {
            connection.close();
        }
    }

    /// Forgets a connection that went away on its own; a participant
    /// behind it is finished implicitly
    fn drop_connection(&mut self, key: ConnectionKey) {
        let Some(connection) = self.connections.remove(&key) else {
            return;
        };
        if let Some(ident) = connection.ident {
            if let Some(error) = self.buses[connection.bus].bus.disconnect(ident) {
                info!("{}, treating as FINISH", error);
            }
        }
        connection.close();
    }

    // Buses

    fn service_buses(&mut self) {
        for index in 0..self.buses.len() {
            let bus = &mut self.buses[index].bus;
            if bus.is_finished() {
                continue;
            }
            if bus.is_all_finished() {
                self.tear_down(index);
                continue;
            }
            match bus.advance() {
                Ok(Some(outgoing)) => {
                    for (key, message) in outgoing {
                        if let Some(connection) = self.connections.get(&key) {
                            connection.send(&message);
                        }
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    error!("{}: {}", bus.name(), error);
                    self.tear_down(index);
                }
            }
        }
    }

    fn tear_down(&mut self, index: usize) {
        let entry = &mut self.buses[index];
        let mut keys = entry.bus.tear_down();
        if let Some(acceptor) = entry.acceptor.take() {
            acceptor.abort();
        }
        if let Some(path) = entry.socket_path.take() {
            transport::remove_socket_file(&path);
        }
        keys.extend(
            self.connections
                .iter()
                .filter(|(_, connection)| connection.bus == index)
                .map(|(key, _)| *key),
        );
        for key in keys {
            self.close_connection(key);
        }
    }
}

fn spawn_acceptor(
    bus: usize,
    listener: Listener,
    events: UnboundedSender<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(stream) => {
                    if events.send(ServerEvent::Accepted { bus, stream }).is_err() {
                        return;
                    }
                }
                Err(error) => {
                    warn!("accept failed: {}", error);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    })
}

// Ephemeral ports never collide
fn shares_address(left: &BusAddress, right: &BusAddress) -> bool {
    match (left, right) {
        (BusAddress::Tcp { port: 0, .. }, _) | (_, BusAddress::Tcp { port: 0, .. }) => false,
        _ => left == right,
    }
}
