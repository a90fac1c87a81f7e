use std::{fmt, str::FromStr};

use thiserror::Error;

use super::BitValue;

/// Errors that can occur when combining signal vectors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// Two vectors describing the same wires have different widths
    #[error("Signal width mismatch: expected {expected} bits, found {found}")]
    WidthMismatch { expected: usize, found: usize },

    /// A character outside of `0`, `1`, `x`, `z`
    #[error("Invalid bit character '{character}'. Bits must be one of 0, 1, x, z")]
    InvalidBit { character: char },

    /// Zero-width vectors are not representable on the wire
    #[error("Signal value is empty")]
    Empty,
}

/// A bundle of wires. Bit 0 is the least significant bit; the wire form
/// (`Display`/`FromStr`) is most significant bit first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SignalVector {
    bits: Vec<BitValue>,
}

impl SignalVector {
    pub fn new(width: usize, fill: BitValue) -> Self {
        Self {
            bits: vec![fill; width],
        }
    }

    pub fn hiz(width: usize) -> Self {
        Self::new(width, BitValue::HiZ)
    }

    pub fn bit(value: BitValue) -> Self {
        Self { bits: vec![value] }
    }

    /// Bits above bit 63 are filled with `0`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|index| BitValue::from_bool(index < 64 && (value >> index) & 1 == 1))
            .collect();
        Self { bits }
    }

    /// Builds a vector from bits ordered least significant first
    pub fn from_bits(bits: Vec<BitValue>) -> Self {
        Self { bits }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bits(&self) -> &[BitValue] {
        &self.bits
    }

    pub fn get(&self, index: usize) -> Option<BitValue> {
        self.bits.get(index).copied()
    }

    /// Out of range indices are ignored.
    pub fn set(&mut self, index: usize, value: BitValue) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = value;
        }
    }

    pub fn resize(&mut self, width: usize, fill: BitValue) {
        self.bits.resize(width, fill);
    }

    /// Extracts `width` bits starting at `low`. Bits past the end read as `z`.
    pub fn slice(&self, low: usize, width: usize) -> SignalVector {
        let bits = (low..low + width)
            .map(|index| self.get(index).unwrap_or(BitValue::HiZ))
            .collect();
        Self { bits }
    }

    pub fn is_all(&self, value: BitValue) -> bool {
        self.bits.iter().all(|bit| *bit == value)
    }

    pub fn is_definite(&self) -> bool {
        self.bits.iter().all(|bit| bit.is_definite())
    }

    /// Interprets the vector as an unsigned integer. Returns `None` if any
    /// bit is `x`/`z` or if a bit above bit 63 is set.
    pub fn to_u64(&self) -> Option<u64> {
        let mut value = 0u64;
        for (index, bit) in self.bits.iter().enumerate() {
            match (bit.to_bool()?, index < 64) {
                (true, true) => value |= 1 << index,
                (true, false) => return None,
                (false, _) => {}
            }
        }
        Some(value)
    }

    /// Bitwise `BitValue::blend` of two equally wide drivers.
    ///
    /// # Errors
    /// Returns `SignalError::WidthMismatch` if the widths differ.
    pub fn blend(&self, other: &SignalVector) -> Result<SignalVector, SignalError> {
        self.check_width(other)?;
        let bits = self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| a.blend(*b))
            .collect();
        Ok(Self { bits })
    }

    /// The value of this resolved wire bundle as seen by a driver that
    /// offered `own`: every bit where the wire equals the driver's own
    /// contribution reads back as `z`.
    ///
    /// # Errors
    /// Returns `SignalError::WidthMismatch` if the widths differ.
    pub fn feedback(&self, own: &SignalVector) -> Result<SignalVector, SignalError> {
        self.check_width(own)?;
        let bits = self
            .bits
            .iter()
            .zip(own.bits.iter())
            .map(|(resolved, own)| {
                if resolved == own {
                    BitValue::HiZ
                } else {
                    *resolved
                }
            })
            .collect();
        Ok(Self { bits })
    }

    fn check_width(&self, other: &SignalVector) -> Result<(), SignalError> {
        if self.width() != other.width() {
            return Err(SignalError::WidthMismatch {
                expected: self.width(),
                found: other.width(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SignalVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

impl FromStr for SignalVector {
    type Err = SignalError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err(SignalError::Empty);
        }
        let mut bits = text
            .chars()
            .map(|character| {
                BitValue::from_char(character).ok_or(SignalError::InvalidBit { character })
            })
            .collect::<Result<Vec<_>, _>>()?;
        bits.reverse();
        Ok(Self { bits })
    }
}

impl From<BitValue> for SignalVector {
    fn from(value: BitValue) -> Self {
        Self::bit(value)
    }
}
