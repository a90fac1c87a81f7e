use std::default::Default;

use simbus_shared::constants::MAX_LINE_LENGTH;

/// Contains Config properties which will be used by a Participant
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Longest line accepted from the server
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}
