//! Streaming UTF-8 decoding for the ground state
//!
//! Bytes are validated against the well-formed byte sequence table of the
//! Unicode standard (no overlong forms, no surrogates, nothing past
//! U+10FFFF). A sequence interrupted by a byte that cannot continue it is
//! reported as [`Utf8Step::Interrupted`]: the caller emits one replacement
//! character and feeds the interrupting byte again, so no byte is ever
//! swallowed by a broken sequence.

/// U+FFFD, emitted for every malformed sequence
pub const REPLACEMENT: char = '\u{FFFD}';

/// Result of feeding one byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Step {
    /// More continuation bytes are needed
    Pending,
    /// A complete scalar value was decoded
    Char(char),
    /// The byte can never start a sequence (it was consumed)
    Invalid,
    /// The byte broke the pending sequence; it was NOT consumed
    Interrupted,
}

/// Incremental UTF-8 decoder
///
/// Holds at most one partially decoded scalar value, so it can be carried
/// across calls to the parser without any buffering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utf8Decoder {
    /// Codepoint bits accumulated so far
    codepoint: u32,
    /// Continuation bytes still expected
    remaining: u8,
    /// Allowed range of the next continuation byte
    lower: u8,
    upper: u8,
}

impl Utf8Decoder {
    /// Create a decoder with no pending sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partial sequence
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether a multi-byte sequence is in progress
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Feed one byte
    pub fn feed(&mut self, byte: u8) -> Utf8Step {
        if self.remaining == 0 {
            return self.start(byte);
        }

        if byte < self.lower || byte > self.upper {
            self.reset();
            return Utf8Step::Interrupted;
        }

        self.codepoint = (self.codepoint << 6) | u32::from(byte & 0x3F);
        self.remaining -= 1;
        self.lower = 0x80;
        self.upper = 0xBF;

        if self.remaining > 0 {
            return Utf8Step::Pending;
        }

        let decoded = char::from_u32(self.codepoint).unwrap_or(REPLACEMENT);
        self.reset();
        Utf8Step::Char(decoded)
    }

    fn start(&mut self, byte: u8) -> Utf8Step {
        let (bits, remaining, lower, upper) = match byte {
            0x00..=0x7F => return Utf8Step::Char(byte as char),
            0xC2..=0xDF => (byte & 0x1F, 1, 0x80, 0xBF),
            0xE0 => (byte & 0x0F, 2, 0xA0, 0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => (byte & 0x0F, 2, 0x80, 0xBF),
            0xED => (byte & 0x0F, 2, 0x80, 0x9F),
            0xF0 => (byte & 0x07, 3, 0x90, 0xBF),
            0xF1..=0xF3 => (byte & 0x07, 3, 0x80, 0xBF),
            0xF4 => (byte & 0x07, 3, 0x80, 0x8F),
            // Stray continuation bytes, C0/C1 overlong leads, F5..FF
            _ => return Utf8Step::Invalid,
        };

        self.codepoint = u32::from(bits);
        self.remaining = remaining;
        self.lower = lower;
        self.upper = upper;
        Utf8Step::Pending
    }
}
