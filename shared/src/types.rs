use std::collections::BTreeMap;

/// Fixed identity number of a device on a bus. By convention 0 is the
/// host/root.
pub type DeviceIdent = u32;

/// The `key=value` options a participant attaches to its HELLO.
pub type DeviceOptions = BTreeMap<String, String>;

/// Opaque handle the server uses to address one live connection.
pub type ConnectionKey = u64;
