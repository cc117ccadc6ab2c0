/// Reassembles complete lines from an arbitrarily-chunked byte stream.
///
/// One instance per pod stream; never shared across workers. Bytes are
/// appended to a single growable buffer and scanned for newline delimiters,
/// so chunk boundaries falling mid-line (or mid-UTF-8-sequence) are handled
/// the same as whole-line chunks.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line completed by it.
    ///
    /// A line is the bytes between newline delimiters, exclusive. Anything
    /// after the last delimiter stays buffered for the next call. Empty
    /// chunks are no-ops, not end-of-stream.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end + 1;
        }
        if start > 0 {
            self.pending.drain(..start);
        }
        lines
    }

    /// Flush the trailing unterminated fragment at end of stream, if any.
    ///
    /// Logs that do not end in a newline would otherwise lose their last
    /// line.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
