//! Line buffer for accumulating stdin bytes into commands

use log::debug;

/// Buffer that collects raw input until whole lines are available
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Create a new empty line buffer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append raw bytes read from input
    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Remove and return every complete line, without line terminators
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn take_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            let line = std::mem::replace(&mut self.buffer, rest);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Clear the buffer and return a trailing partial line, if any
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        debug!("Flushing partial input line: {} bytes", self.buffer.len());
        let line = std::mem::take(&mut self.buffer);
        Some(decode_line(&line))
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get buffer length in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(&['\n', '\r'][..])
        .to_string()
}
