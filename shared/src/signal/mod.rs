mod bit_value;
mod signal_map;
mod signal_vector;

pub use bit_value::BitValue;
pub use signal_map::{SignalMap, SignalWidths};
pub use signal_vector::{SignalError, SignalVector};
