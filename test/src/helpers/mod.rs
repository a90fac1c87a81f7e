pub mod axi4;
pub mod pci;
pub mod test_server;

pub use axi4::{Axi4Master, Axi4MemorySlave};
pub use pci::{PciConfigTarget, PciMaster, MASTER_ABORT};
pub use test_server::{pipe_path, TestServer};

use simbus_client::shared::{BitValue, SignalMap, SignalVector};

/// Signals a device model drives, kept between steps
#[derive(Clone, Debug, Default)]
pub struct Drive {
    signals: SignalMap,
}

impl Drive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: SignalVector) {
        self.signals.insert(name.to_string(), value);
    }

    pub fn set_bit(&mut self, name: &str, value: BitValue) {
        self.set(name, SignalVector::bit(value));
    }

    pub fn set_u64(&mut self, name: &str, value: u64, width: usize) {
        self.set(name, SignalVector::from_u64(value, width));
    }

    /// Stops driving `name`
    pub fn release(&mut self, name: &str) {
        if let Some(value) = self.signals.get_mut(name) {
            *value = SignalVector::hiz(value.width());
        }
    }

    pub fn signals(&self) -> &SignalMap {
        &self.signals
    }
}
