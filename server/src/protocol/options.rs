use std::{collections::BTreeMap, str::FromStr};

use simbus_shared::{constants::MAX_SIGNAL_WIDTH, DeviceOptions};

use crate::error::ProtocolError;

pub(crate) type BusOptions = BTreeMap<String, String>;

pub(crate) fn parse<T: FromStr>(key: &str, text: &str) -> Result<T, ProtocolError> {
    text.parse::<T>().map_err(|_| ProtocolError::InvalidOption {
        key: key.to_string(),
        value: text.to_string(),
        reason: "expected an unsigned integer",
    })
}

/// Looks `key` up in the options a device announced, then `bus_key` in
/// the bus options, then falls back to `default`. Widths above
/// `MAX_SIGNAL_WIDTH` are rejected.
pub(crate) fn resolve_width(
    device: &str,
    key: &'static str,
    announced: &DeviceOptions,
    bus_key: &'static str,
    bus: &BusOptions,
    default: Option<usize>,
) -> Result<usize, ProtocolError> {
    let width = match announced.get(key).or_else(|| bus.get(bus_key)) {
        Some(text) => parse(key, text)?,
        None => default.ok_or_else(|| ProtocolError::MissingOption {
            device: device.to_string(),
            key,
        })?,
    };
    if width > MAX_SIGNAL_WIDTH {
        return Err(invalid(key, width, "wider than the longest signal a line can carry"));
    }
    Ok(width)
}

pub(crate) fn invalid(key: &str, value: usize, reason: &'static str) -> ProtocolError {
    ProtocolError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Fails unless both ends of a link resolved `key` to the same value
pub(crate) fn agree(
    key: &'static str,
    left: (&str, usize),
    right: (&str, usize),
) -> Result<(), ProtocolError> {
    if left.1 == right.1 {
        return Ok(());
    }
    Err(ProtocolError::OptionMismatch {
        key,
        left: left.0.to_string(),
        left_value: left.1,
        right: right.0.to_string(),
        right_value: right.1,
    })
}
