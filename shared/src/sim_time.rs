use std::{cmp::Ordering, fmt, str::FromStr};

use thiserror::Error;

/// Errors that can occur during simulation time arithmetic or parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// Rescaling or adding would overflow the 64-bit mantissa
    #[error("Simulation time overflow combining {left} and {right}. The result cannot be represented without losing precision")]
    Overflow { left: String, right: String },

    /// The text is not of the form `<mantissa>e<exponent>`
    #[error("Invalid simulation time '{text}'. Expected <mantissa>e<exponent>, for example 1500e-12")]
    Parse { text: String },
}

/// An exact simulation time, `mantissa × 10^exponent` seconds.
///
/// Two times with different exponents are combined by rescaling the coarser
/// one down to the finer exponent, so no precision is ever dropped. Equality
/// and ordering compare the represented value, so `1e0 == 10e-1`.
#[derive(Clone, Copy, Debug)]
pub struct SimTime {
    mantissa: u64,
    exponent: i32,
}

impl SimTime {
    /// Exponent used by the clock generators: times are kept in picoseconds.
    pub const PICOSECONDS: i32 = -12;

    pub const ZERO: SimTime = SimTime {
        mantissa: 0,
        exponent: Self::PICOSECONDS,
    };

    pub const fn new(mantissa: u64, exponent: i32) -> Self {
        Self { mantissa, exponent }
    }

    pub const fn from_picos(picos: u64) -> Self {
        Self::new(picos, Self::PICOSECONDS)
    }

    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Re-express this time with a finer (smaller or equal) exponent.
    ///
    /// # Errors
    /// Returns `TimeError::Overflow` if the rescaled mantissa does not fit
    /// in 64 bits, or if `exponent` is coarser than the current one and the
    /// value is not an exact multiple of the coarser unit.
    pub fn rescale(&self, exponent: i32) -> Result<SimTime, TimeError> {
        if self.mantissa == 0 {
            return Ok(SimTime::new(0, exponent));
        }
        let overflow = || TimeError::Overflow {
            left: self.to_string(),
            right: format!("1e{}", exponent),
        };
        match exponent.cmp(&self.exponent) {
            Ordering::Equal => Ok(*self),
            Ordering::Less => {
                let shift = u32::try_from(i64::from(self.exponent) - i64::from(exponent))
                    .map_err(|_| overflow())?;
                let scale = 10u64.checked_pow(shift).ok_or_else(overflow)?;
                let mantissa = self.mantissa.checked_mul(scale).ok_or_else(overflow)?;
                Ok(SimTime::new(mantissa, exponent))
            }
            Ordering::Greater => {
                let shift = u32::try_from(i64::from(exponent) - i64::from(self.exponent))
                    .map_err(|_| overflow())?;
                let scale = 10u64.checked_pow(shift).ok_or_else(overflow)?;
                if self.mantissa % scale != 0 {
                    return Err(overflow());
                }
                Ok(SimTime::new(self.mantissa / scale, exponent))
            }
        }
    }

    /// Adds two times exactly. The result carries the finer of the two
    /// exponents.
    ///
    /// # Errors
    /// Returns `TimeError::Overflow` if the sum cannot be represented.
    pub fn checked_add(&self, other: &SimTime) -> Result<SimTime, TimeError> {
        // zero never forces a rescale
        if other.mantissa == 0 {
            return Ok(*self);
        }
        if self.mantissa == 0 {
            return Ok(*other);
        }
        let exponent = self.exponent.min(other.exponent);
        let overflow = || TimeError::Overflow {
            left: self.to_string(),
            right: other.to_string(),
        };
        let left = self.rescale(exponent).map_err(|_| overflow())?;
        let right = other.rescale(exponent).map_err(|_| overflow())?;
        let mantissa = left
            .mantissa
            .checked_add(right.mantissa)
            .ok_or_else(overflow)?;
        Ok(SimTime::new(mantissa, exponent))
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.exponent == other.exponent {
            return self.mantissa.cmp(&other.mantissa);
        }
        // `coarse` has the larger exponent
        let (coarse, fine, flipped) = if self.exponent > other.exponent {
            (self, other, false)
        } else {
            (other, self, true)
        };
        let shift = i64::from(coarse.exponent) - i64::from(fine.exponent);

        // u64::MAX < 10^20, so any non-zero coarse mantissa shifted by 20 or
        // more decades outweighs every fine mantissa
        let ordering = if coarse.mantissa == 0 {
            0u64.cmp(&fine.mantissa)
        } else if shift >= 20 {
            Ordering::Greater
        } else {
            let scaled = u128::from(coarse.mantissa) * 10u128.pow(shift as u32);
            scaled.cmp(&u128::from(fine.mantissa))
        };

        if flipped {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

impl FromStr for SimTime {
    type Err = TimeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parse_error = || TimeError::Parse {
            text: text.to_string(),
        };
        let (mantissa, exponent) = text.split_once('e').ok_or_else(parse_error)?;
        if mantissa.is_empty() || !mantissa.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_error());
        }
        let mantissa = mantissa.parse::<u64>().map_err(|_| parse_error())?;
        let exponent = exponent.parse::<i32>().map_err(|_| parse_error())?;
        Ok(SimTime::new(mantissa, exponent))
    }
}
