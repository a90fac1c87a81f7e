mod server;
pub use server::{BusSummary, Server};

mod server_config;
pub use server_config::ServerConfig;
