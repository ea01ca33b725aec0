/// Splits a chunked byte stream into complete newline-terminated records.
///
/// The upstream body arrives in arbitrary chunk boundaries; a record is only
/// handed out once its terminating newline has been seen. Whatever trails the
/// last newline is carried to the next chunk. There is no cap on the carry
/// buffer, so a newline-free upstream can grow it without bound.
#[derive(Debug, Default)]
pub struct FrameReader {
    carry: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, get back every line completed by it. Empty and
    /// whitespace-only lines are dropped silently.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.carry[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.carry[start..end]);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
            start = end + 1;
        }
        self.carry.drain(..start);

        lines
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
