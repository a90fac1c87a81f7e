use std::default::Default;

use simbus_shared::constants::MAX_LINE_LENGTH;

use crate::bus::BusConfig;

/// Contains Config properties which will be used by the Server
#[derive(Clone)]
pub struct ServerConfig {
    /// Buses to serve. A bus that fails validation is logged and skipped.
    pub buses: Vec<BusConfig>,
    /// Log every value a protocol engine publishes at trace level
    pub trace: bool,
    /// Longest line accepted from a participant before its connection is
    /// dropped
    pub max_line_length: usize,
}

impl ServerConfig {
    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.buses.push(bus);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            buses: Vec::new(),
            trace: false,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}
