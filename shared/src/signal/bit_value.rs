use std::fmt;

/// The value of a single wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BitValue {
    Zero,
    One,
    /// Driven, but to an unknown or conflicting level (`x`)
    Unknown,
    /// Not driven (`z`)
    #[default]
    HiZ,
}

impl BitValue {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(BitValue::Zero),
            '1' => Some(BitValue::One),
            'x' => Some(BitValue::Unknown),
            'z' => Some(BitValue::HiZ),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            BitValue::Zero => '0',
            BitValue::One => '1',
            BitValue::Unknown => 'x',
            BitValue::HiZ => 'z',
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            BitValue::One
        } else {
            BitValue::Zero
        }
    }

    /// Returns the logic level for `0`/`1`, `None` for `x`/`z`
    pub fn to_bool(self) -> Option<bool> {
        match self {
            BitValue::Zero => Some(false),
            BitValue::One => Some(true),
            BitValue::Unknown | BitValue::HiZ => None,
        }
    }

    pub fn is_definite(self) -> bool {
        matches!(self, BitValue::Zero | BitValue::One)
    }

    /// Resolves two drivers of the same wire.
    ///
    /// `z` yields to anything, equal values agree, and any other
    /// combination is a conflict that resolves to `x`.
    pub fn blend(self, other: BitValue) -> BitValue {
        match (self, other) {
            (BitValue::HiZ, value) | (value, BitValue::HiZ) => value,
            (a, b) if a == b => a,
            _ => BitValue::Unknown,
        }
    }
}

impl fmt::Display for BitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
