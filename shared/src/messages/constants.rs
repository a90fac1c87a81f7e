pub const HELLO: &str = "HELLO";
pub const YOU_ARE: &str = "YOU-ARE";
pub const NAK: &str = "NAK";
pub const READY: &str = "READY";
pub const UNTIL: &str = "UNTIL";
pub const FINISH: &str = "FINISH";

/// Bound on a single protocol line. A peer that sends this many bytes
/// without a newline is cut off.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Widest signal a device may announce. Anything wider could not be
/// written on one line.
pub const MAX_SIGNAL_WIDTH: usize = 4096;
