//! Byte-level segmentation of raw output chunks into parser tokens.
//!
//! Each parsing strategy consumes one of three delimiter families. The
//! segmenter is incremental: chunks may split tokens anywhere, and the
//! partial tail is carried until the next chunk or end of stream. Every
//! delimiter is a single ASCII byte (or the two-byte backspace-space pair),
//! so splitting at the byte level is UTF-8 safe; token bytes are converted
//! lossily.

/// Delimiter family a parsing strategy consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segmentation {
    /// Newline-terminated lines, trailing carriage returns stripped.
    Lines,
    /// Single whitespace characters. Consecutive delimiters yield empty
    /// tokens, which the whitespace-oriented parsers treat as line breaks.
    Whitespace,
    /// Newline or backspace-space, for tools that redraw progress in place.
    InPlaceRedraw,
}

const BACKSPACE: u8 = 0x08;

/// Incremental tokenizer over raw byte chunks.
#[derive(Debug)]
pub struct Segmenter {
    mode: Segmentation,
    buf: Vec<u8>,
}

impl Segmenter {
    #[must_use]
    pub fn new(mode: Segmentation) -> Self {
        Self {
            mode,
            buf: Vec::new(),
        }
    }

    /// Feed a chunk, returning every token it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut tokens = Vec::new();
        let mut start = 0;
        while let Some((end, skip)) = self.find_delimiter(start) {
            tokens.push(self.token(start, end));
            start = end + skip;
        }
        self.buf.drain(..start);
        tokens
    }

    /// Flush the trailing partial token at end of stream.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            let end = self.buf.len();
            Some(self.token(0, end))
        }
    }

    /// Find the next delimiter at or after `from`, returning the token end
    /// index and the delimiter width.
    fn find_delimiter(&self, from: usize) -> Option<(usize, usize)> {
        let buf = &self.buf;
        match self.mode {
            Segmentation::Lines => (from..buf.len())
                .find(|&i| buf[i] == b'\n')
                .map(|i| (i, 1)),
            Segmentation::Whitespace => (from..buf.len())
                .find(|&i| is_whitespace(buf[i]))
                .map(|i| (i, 1)),
            Segmentation::InPlaceRedraw => {
                for i in from..buf.len() {
                    if buf[i] == b'\n' {
                        return Some((i, 1));
                    }
                    if buf[i] == BACKSPACE {
                        if i + 1 < buf.len() {
                            if buf[i + 1] == b' ' {
                                return Some((i, 2));
                            }
                        } else {
                            // Trailing backspace: wait for the next chunk to
                            // decide whether it starts a delimiter pair.
                            return None;
                        }
                    }
                }
                None
            }
        }
    }

    fn token(&self, start: usize, end: usize) -> String {
        let mut bytes = &self.buf[start..end];
        if self.mode == Segmentation::Lines {
            if let Some(stripped) = bytes.strip_suffix(b"\r") {
                bytes = stripped;
            }
        }
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// The single-character whitespace class the whitespace-oriented tools are
/// tokenized on.
fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}
