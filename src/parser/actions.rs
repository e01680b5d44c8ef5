//! Terminal actions produced by the parser
//!
//! These actions represent the semantic meaning of parsed escape sequences.
//! The screen never sees raw bytes, only these.

use serde::{Deserialize, Serialize};

/// A terminal action produced by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Print a character at the cursor position
    Print(char),

    /// Execute a C0 control character
    /// Common controls:
    /// - 0x07 BEL: Bell
    /// - 0x08 BS: Backspace
    /// - 0x09 HT: Horizontal Tab
    /// - 0x0A LF: Line Feed
    /// - 0x0B VT: Vertical Tab (treated as LF)
    /// - 0x0C FF: Form Feed (treated as LF)
    /// - 0x0D CR: Carriage Return
    Execute(u8),

    /// CSI (Control Sequence Introducer) dispatch
    CsiDispatch(CsiAction),

    /// ESC dispatch (non-CSI escape sequences)
    EscDispatch(EscAction),

    /// OSC (Operating System Command) dispatch
    OscDispatch(OscAction),

    /// DCS/SOS/PM/APC payloads and sequences with no known meaning
    Unsupported(Vec<u8>),
}

/// A complete control sequence: `CSI [private] params [intermediates] final`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiAction {
    /// Numeric parameters; empty parameters are recorded as 0
    pub params: Vec<u16>,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x40-0x7E) determines the command
    pub final_byte: u8,
    /// Private marker (`?`, `>`, `<` or `=`) if the sequence had one
    pub private_marker: Option<u8>,
}

impl CsiAction {
    pub fn new(final_byte: u8) -> Self {
        Self {
            params: Vec::new(),
            intermediates: Vec::new(),
            final_byte,
            private_marker: None,
        }
    }

    /// Get parameter at index, or default value if not present
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get(index).copied().unwrap_or(default)
    }

    /// Get parameter at index, treating 0 as default
    pub fn param_or_default(&self, index: usize, default: u16) -> u16 {
        match self.params.get(index) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    /// Whether this is a DEC private sequence (`CSI ? ...`)
    pub fn is_dec_private(&self) -> bool {
        self.private_marker == Some(b'?')
    }
}

/// ESC sequence actions (non-CSI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscAction {
    /// ESC 7 - Save cursor (DECSC)
    SaveCursor,

    /// ESC 8 - Restore cursor (DECRC)
    RestoreCursor,

    /// ESC D - Index (IND) - move cursor down, scroll if at bottom
    Index,

    /// ESC M - Reverse Index (RI) - move cursor up, scroll if at top
    ReverseIndex,

    /// ESC E - Next Line (NEL) - move to beginning of next line
    NextLine,

    /// ESC H - Horizontal Tab Set (HTS)
    TabSet,

    /// ESC c - Full Reset (RIS)
    FullReset,

    /// ESC = - Application Keypad Mode (DECKPAM)
    ApplicationKeypad,

    /// ESC > - Normal Keypad Mode (DECKPNM)
    NormalKeypad,

    /// ESC ( B, ESC ) 0, ... - designate a character set into a G-set slot
    DesignateCharset {
        /// The intermediate naming the slot: `(`, `)`, `*`, `+`, `-`, `.` or `/`
        slot: u8,
        /// The final byte naming the character set
        charset: u8,
    },
}

/// OSC (Operating System Command) actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscAction {
    /// Set window title (OSC 0 or OSC 2)
    SetTitle(String),

    /// Set icon name (OSC 1)
    SetIconName(String),

    /// Any other numbered OSC
    Unknown { command: u16, data: String },
}
