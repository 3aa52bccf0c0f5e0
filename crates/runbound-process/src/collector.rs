//! Bounded per-stream output accumulator

use tracing::trace;

/// Which child stream a collector is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Accumulates bytes from one stream up to a fixed ceiling
///
/// Once the ceiling is hit the collector flips to truncated and silently
/// discards everything that follows. `append` never blocks and never fails.
#[derive(Debug)]
pub struct OutputCollector {
    kind: StreamKind,
    buffer: Vec<u8>,
    max_bytes: usize,
    truncated: bool,
}

/// Finalized contents of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedStream {
    pub text: String,
    pub truncated: bool,
}

impl OutputCollector {
    /// Create a collector that keeps at most `max_bytes` bytes
    pub fn new(kind: StreamKind, max_bytes: usize) -> Self {
        Self {
            kind,
            buffer: Vec::new(),
            max_bytes,
            truncated: false,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Bytes retained so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Ingest one chunk in arrival order
    pub fn append(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }

        let remaining = self.max_bytes - self.buffer.len();
        if chunk.len() <= remaining {
            self.buffer.extend_from_slice(chunk);
            return;
        }

        self.buffer.extend_from_slice(&chunk[..remaining]);
        self.truncated = true;
        trace!(
            stream = self.kind.as_str(),
            kept = self.buffer.len(),
            discarded = chunk.len() - remaining,
            "Output ceiling reached"
        );
    }

    /// Decode the retained bytes as text
    ///
    /// When the ceiling cut a UTF-8 sequence in half, the dangling partial
    /// character is dropped so the text never exceeds the byte ceiling. Any
    /// other invalid byte is decoded lossily.
    pub fn finalize(self) -> CollectedStream {
        let end = if self.truncated {
            complete_prefix_len(&self.buffer)
        } else {
            self.buffer.len()
        };

        CollectedStream {
            text: String::from_utf8_lossy(&self.buffer[..end]).into_owned(),
            truncated: self.truncated,
        }
    }
}

/// Length of `bytes` without a trailing incomplete UTF-8 sequence
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let tail_start = len.saturating_sub(3);

    for i in (tail_start..len).rev() {
        let byte = bytes[i];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if len - i < width { i } else { len };
    }

    len
}
