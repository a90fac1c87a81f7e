use std::str::FromStr;

use simbus_shared::DeviceIdent;

/// Number of REQ#/GNT# pairs a PCI arbiter serves
pub const ARBITER_SLOTS: DeviceIdent = 16;

/// What happens to the grant when nobody is requesting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parking {
    /// Recall the grant after a random number of idle clocks
    #[default]
    None,
    /// Leave the grant with the last grantee
    Last,
}

impl FromStr for Parking {
    type Err = ();

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "none" => Ok(Parking::None),
            "last" => Ok(Parking::Last),
            _ => Err(()),
        }
    }
}

/// Round-robin PCI arbiter. Runs once per rising clock edge.
pub struct Arbiter {
    granted: Option<DeviceIdent>,
    // the grantee has started a transaction under the current grant
    spent: bool,
    parking: Parking,
    linger: u32,
    idle_clocks: u32,
    recall_after: u32,
    rng: fastrand::Rng,
}

impl Arbiter {
    pub fn new(parking: Parking, linger: u32, seed: u64) -> Self {
        let mut arbiter = Self {
            granted: None,
            spent: false,
            parking,
            linger,
            idle_clocks: 0,
            recall_after: 0,
            rng: fastrand::Rng::with_seed(seed),
        };
        arbiter.recall_after = arbiter.draw_linger();
        arbiter
    }

    pub fn granted(&self) -> Option<DeviceIdent> {
        self.granted
    }

    /// The grantee became bus master; its grant goes back up for
    /// arbitration at the next edge.
    pub fn spend(&mut self) {
        self.spent = true;
    }

    /// Picks the grantee for the coming clock. Bit `i` of `requests` is
    /// set when device `i` samples REQ# asserted.
    pub fn arbitrate(&mut self, requests: u16) -> Option<DeviceIdent> {
        let requesting = |ident: DeviceIdent| requests & (1 << ident) != 0;

        if let Some(current) = self.granted {
            if requesting(current) && !self.spent {
                self.idle_clocks = 0;
                return self.granted;
            }
        }

        if requests != 0 {
            let start = self.granted.map_or(0, |current| current + 1);
            let next = (0..ARBITER_SLOTS)
                .map(|offset| (start + offset) % ARBITER_SLOTS)
                .find(|ident| requesting(*ident));
            if next.is_some() {
                self.granted = next;
                self.spent = false;
                self.idle_clocks = 0;
                return self.granted;
            }
        }

        if self.parking == Parking::None && self.granted.is_some() {
            self.idle_clocks += 1;
            if self.idle_clocks >= self.recall_after {
                self.granted = None;
                self.spent = false;
                self.idle_clocks = 0;
                self.recall_after = self.draw_linger();
            }
        }
        self.granted
    }

    // uniform over 1..=2*linger, so the mean is about `linger`
    fn draw_linger(&mut self) -> u32 {
        if self.linger == 0 {
            return 1;
        }
        self.rng.u32(1..=self.linger.saturating_mul(2))
    }
}
