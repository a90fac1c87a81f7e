use std::collections::{btree_map, BTreeMap};

use crate::messages::error::CodecError;

use super::{BitValue, SignalVector};

/// Named signal values, ordered by name so that encoding is deterministic.
pub type SignalMap = BTreeMap<String, SignalVector>;

/// The set of signals one side may put on the wire, and their widths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalWidths {
    widths: BTreeMap<String, usize>,
}

impl SignalWidths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, width: usize) {
        self.widths.insert(name.to_string(), width);
    }

    pub fn with(mut self, name: &str, width: usize) -> Self {
        self.insert(name, width);
        self
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.widths.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.widths.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, usize> {
        self.widths.iter()
    }

    /// A map holding every signal at its width, filled with `fill`
    pub fn filled(&self, fill: BitValue) -> SignalMap {
        self.widths
            .iter()
            .map(|(name, width)| (name.clone(), SignalVector::new(*width, fill)))
            .collect()
    }

    /// Checks that every signal in `signals` is known and has its
    /// configured width.
    ///
    /// # Errors
    /// Returns `CodecError::UnknownSignal` or `CodecError::WidthMismatch`.
    pub fn validate(&self, signals: &SignalMap) -> Result<(), CodecError> {
        for (name, value) in signals {
            let Some(expected) = self.get(name) else {
                return Err(CodecError::UnknownSignal { name: name.clone() });
            };
            if value.width() != expected {
                return Err(CodecError::WidthMismatch {
                    name: name.clone(),
                    expected,
                    found: value.width(),
                });
            }
        }
        Ok(())
    }
}
