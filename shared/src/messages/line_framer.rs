use super::error::CodecError;

/// Splits a byte stream into protocol lines.
///
/// Bytes may arrive in arbitrary chunks; `next_line` yields each complete
/// line without its terminating `\n` (or `\r\n`). A line that grows past the
/// configured bound without a newline is an error, after which the framer
/// should be discarded along with its connection.
pub struct LineFramer {
    buffer: Vec<u8>,
    // bytes already scanned for a newline
    scanned: usize,
    max_line_length: usize,
}

impl LineFramer {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_length,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete line, `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    /// `CodecError::LineTooLong` if the pending line exceeds the bound,
    /// `CodecError::InvalidUtf8` if a complete line is not UTF-8.
    pub fn next_line(&mut self) -> Result<Option<String>, CodecError> {
        let newline = self.buffer[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map(|offset| self.scanned + offset);

        let Some(newline) = newline else {
            self.scanned = self.buffer.len();
            if self.buffer.len() > self.max_line_length {
                return Err(CodecError::LineTooLong {
                    limit: self.max_line_length,
                });
            }
            return Ok(None);
        };

        if newline > self.max_line_length {
            return Err(CodecError::LineTooLong {
                limit: self.max_line_length,
            });
        }

        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        self.scanned = 0;
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line)
            .map(Some)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}
