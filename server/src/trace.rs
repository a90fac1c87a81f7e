use log::trace;

use simbus_shared::{SignalVector, SimTime};

/// Receives every signal value a protocol engine publishes. Tracing has
/// no influence on what participants see.
pub trait Tracer: Send {
    fn declare_signal(&mut self, name: &str, width: usize);
    fn set_time(&mut self, time: SimTime);
    fn set_signal(&mut self, name: &str, value: &SignalVector);
}

/// Discards everything
pub struct NullTracer;

impl Tracer for NullTracer {
    fn declare_signal(&mut self, _name: &str, _width: usize) {}
    fn set_time(&mut self, _time: SimTime) {}
    fn set_signal(&mut self, _name: &str, _value: &SignalVector) {}
}

/// Writes each published value to the `log` facade at trace level
pub struct LogTracer {
    bus: String,
    time: SimTime,
}

impl LogTracer {
    pub fn new(bus: &str) -> Self {
        Self {
            bus: bus.to_string(),
            time: SimTime::ZERO,
        }
    }
}

impl Tracer for LogTracer {
    fn declare_signal(&mut self, name: &str, width: usize) {
        trace!("{}: declare {} [{}]", self.bus, name, width);
    }

    fn set_time(&mut self, time: SimTime) {
        self.time = time;
    }

    fn set_signal(&mut self, name: &str, value: &SignalVector) {
        trace!("{} @{}: {} = {}", self.bus, self.time, name, value);
    }
}

/// Picks the tracer a bus is built with
pub fn tracer_for(bus: &str, enabled: bool) -> Box<dyn Tracer> {
    if enabled {
        Box::new(LogTracer::new(bus))
    } else {
        Box::new(NullTracer)
    }
}
