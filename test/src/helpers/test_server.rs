use std::{
    env,
    path::PathBuf,
    process,
    sync::mpsc,
    thread::{self, JoinHandle},
};

use log::debug;

use simbus_server::{shared::BusAddress, BusSummary, Server, ServerConfig, SimbusServerError};

type ServerResult = Result<Vec<BusSummary>, SimbusServerError>;

/// A `Server` running on a thread of its own, for end-to-end tests.
///
/// `start` returns once every bus is listening, so participants can
/// connect straight away.
pub struct TestServer {
    addresses: Vec<(String, BusAddress)>,
    handle: JoinHandle<ServerResult>,
}

impl TestServer {
    pub fn start(config: ServerConfig) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || -> ServerResult {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async move {
                let mut server = Server::new(config)?;
                let addresses = server.listen().await?;
                let _ = sender.send(addresses);
                server.run().await
            })
        });
        // a server that failed to start drops the sender
        let addresses = receiver.recv().unwrap_or_default();
        debug!("test server listening on {:?}", addresses);
        Self { addresses, handle }
    }

    /// Where bus `name` was bound
    pub fn address(&self, name: &str) -> Option<BusAddress> {
        self.addresses
            .iter()
            .find(|(bus, _)| bus == name)
            .map(|(_, address)| address.clone())
    }

    pub fn addresses(&self) -> &[(String, BusAddress)] {
        &self.addresses
    }

    /// Waits for every bus to finish
    pub fn join(self) -> ServerResult {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// A socket path unique to this process and `name`
pub fn pipe_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("simbus-{}-{}.sock", process::id(), name))
}
