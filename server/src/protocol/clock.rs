use simbus_shared::{BitValue, SimTime};

use crate::bus::ClockTiming;

/// The four points of a clock period at which a bus steps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPhase {
    /// Just after the rising edge, inside the hold window
    Rising,
    /// Clock high, hold window over
    High,
    /// Just after the falling edge
    Falling,
    /// Clock low, inside the setup window before the next rising edge
    Setup,
}

impl ClockPhase {
    pub fn next(self) -> ClockPhase {
        match self {
            ClockPhase::Rising => ClockPhase::High,
            ClockPhase::High => ClockPhase::Falling,
            ClockPhase::Falling => ClockPhase::Setup,
            ClockPhase::Setup => ClockPhase::Rising,
        }
    }

    pub fn level(self) -> BitValue {
        match self {
            ClockPhase::Rising | ClockPhase::High => BitValue::One,
            ClockPhase::Falling | ClockPhase::Setup => BitValue::Zero,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            ClockPhase::Rising => 0,
            ClockPhase::High => 1,
            ClockPhase::Falling => 2,
            ClockPhase::Setup => 3,
        }
    }
}

/// Walks a bus clock through its phases, yielding the time spent getting
/// to each one.
pub struct ClockSequencer {
    timing: ClockTiming,
    phase: ClockPhase,
}

impl ClockSequencer {
    /// Starts in the setup phase so that the first step is a rising edge
    pub fn new(timing: ClockTiming) -> Self {
        Self {
            timing,
            phase: ClockPhase::Setup,
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Time that elapses while entering `phase`
    pub fn duration(&self, phase: ClockPhase) -> SimTime {
        let ClockTiming {
            high,
            low,
            hold,
            setup,
        } = self.timing;
        let picos = match phase {
            ClockPhase::Rising => setup,
            ClockPhase::High => hold,
            ClockPhase::Falling => high - hold,
            ClockPhase::Setup => low - setup,
        };
        SimTime::from_picos(picos)
    }

    /// Moves to the next phase, returning it with the time it took
    pub fn advance(&mut self) -> (ClockPhase, SimTime) {
        self.phase = self.phase.next();
        (self.phase, self.duration(self.phase))
    }
}
