//! Parser State Machine
//!
//! Implements a VT500-series compatible parser state machine.
//! The parser handles arbitrary chunk boundaries and produces
//! semantic actions for the terminal core.
//!
//! # State Machine
//!
//! The parser follows the state machine model described in:
//! - "A parser for DEC's ANSI-compatible video terminals" by Paul Williams
//! - https://vt100.net/emu/dec_ansi_parser
//!
//! States:
//! - Ground: Normal text processing (through the UTF-8 decoder)
//! - Escape: After ESC, waiting for next byte
//! - EscapeIntermediate: ESC followed by intermediate bytes
//! - CsiEntry: After CSI (ESC [), collecting parameters
//! - CsiParam: Collecting CSI parameters
//! - CsiIntermediate: CSI with intermediate bytes
//! - CsiIgnore: Malformed CSI, consumed up to its final byte
//! - OscString: Collecting OSC payload
//! - DcsEntry/DcsParam/DcsIntermediate/DcsPassthrough/DcsIgnore: DCS handling
//! - SosPmApcString: SOS/PM/APC string collection
//!
//! # 8-bit controls
//!
//! Raw C1 bytes (0x80-0x9F) are controls only in the escape, CSI and DCS
//! header states. In Ground every high byte belongs to the UTF-8 decoder,
//! and a decoded U+0080..U+009F is treated as the matching C1 control.
//! Inside OSC, DCS passthrough and SOS/PM/APC strings high bytes are
//! payload, so strings end only with BEL (OSC), `ESC \`, CAN or SUB.

use super::actions::{Action, CsiAction, EscAction, OscAction};
use super::utf8::{Utf8Decoder, Utf8Step, REPLACEMENT};

/// Maximum number of CSI parameters kept; extra ones are dropped
pub const MAX_PARAMS: usize = 32;

/// Maximum number of intermediate bytes in one sequence
const MAX_INTERMEDIATES: usize = 2;

/// Maximum OSC/DCS/SOS/PM/APC payload kept; excess bytes are discarded
pub const MAX_STRING_LEN: usize = 4096;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    SosPmApcString,
}

impl State {
    /// States whose high bytes are payload rather than controls
    fn is_string(self) -> bool {
        matches!(
            self,
            State::OscString | State::DcsPassthrough | State::DcsIgnore | State::SosPmApcString
        )
    }
}

/// The terminal parser
///
/// All state lives in this struct, so input may be split at any byte and
/// fed over several calls with the same result as a single call.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    /// Intermediate bytes collected during parsing
    intermediates: Vec<u8>,
    /// Parameters for CSI sequences
    params: Vec<u16>,
    /// Current parameter being built
    current_param: u16,
    /// Whether we've seen a digit for the current parameter
    param_has_digit: bool,
    /// Private marker (`?`, `>`, `<`, `=`) of the current CSI sequence
    private_marker: Option<u8>,
    /// OSC string payload (command number included)
    osc_string: Vec<u8>,
    /// DCS/SOS/PM/APC payload
    dcs_string: Vec<u8>,
    /// UTF-8 decoder state
    utf8: Utf8Decoder,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in the ground state
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            params: Vec::with_capacity(16),
            current_param: 0,
            param_has_digit: false,
            private_marker: None,
            osc_string: Vec::with_capacity(256),
            dcs_string: Vec::new(),
            utf8: Utf8Decoder::new(),
        }
    }

    /// Reset the parser to initial state
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_params();
        self.osc_string.clear();
        self.dcs_string.clear();
        self.utf8.reset();
    }

    /// Whether the parser is between sequences with no partial character
    pub fn is_ground(&self) -> bool {
        self.state == State::Ground && !self.utf8.is_pending()
    }

    /// Clear parameter state
    fn clear_params(&mut self) {
        self.intermediates.clear();
        self.params.clear();
        self.current_param = 0;
        self.param_has_digit = false;
        self.private_marker = None;
    }

    /// Process a chunk of bytes, returning actions
    pub fn parse(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse_with(data, |action| actions.push(action));
        actions
    }

    /// Process a chunk of bytes, handing each action to `sink` as it is produced
    pub fn parse_with<F: FnMut(Action)>(&mut self, data: &[u8], mut sink: F) {
        for &byte in data {
            self.advance(byte, &mut sink);
        }
    }

    fn advance<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        if self.state == State::Ground && (byte >= 0x80 || self.utf8.is_pending()) {
            match self.utf8.feed(byte) {
                Utf8Step::Pending => {}
                Utf8Step::Char(c) => {
                    if let Some(action) = self.process_decoded(c) {
                        sink(action);
                    }
                }
                Utf8Step::Invalid => {
                    tracing::trace!("invalid UTF-8 byte {:#04x}", byte);
                    sink(Action::Print(REPLACEMENT));
                }
                Utf8Step::Interrupted => {
                    tracing::trace!("UTF-8 sequence interrupted by {:#04x}", byte);
                    sink(Action::Print(REPLACEMENT));
                    // The decoder is idle again, so this cannot recurse twice
                    self.advance(byte, sink);
                }
            }
            return;
        }

        if let Some(action) = self.process_byte(byte) {
            sink(action);
        }
    }

    /// Handle a scalar value produced by the UTF-8 decoder
    fn process_decoded(&mut self, c: char) -> Option<Action> {
        if ('\u{80}'..='\u{9F}').contains(&c) {
            return self.process_c1(c as u8);
        }
        Some(Action::Print(c))
    }

    /// Process a single byte outside of UTF-8 decoding
    fn process_byte(&mut self, byte: u8) -> Option<Action> {
        // C0 controls are handled in every state
        if byte < 0x20 {
            return self.process_c0(byte);
        }

        // DEL is ignored everywhere
        if byte == 0x7F {
            return None;
        }

        // C1 controls (0x80-0x9F), except where they are string payload
        if (0x80..=0x9F).contains(&byte) && !self.state.is_string() {
            return self.process_c1(byte);
        }

        match self.state {
            State::Ground => Some(Action::Print(byte as char)),
            State::Escape => self.process_escape(byte),
            State::EscapeIntermediate => self.process_escape_intermediate(byte),
            State::CsiEntry => self.process_csi_entry(byte),
            State::CsiParam => self.process_csi_param(byte),
            State::CsiIntermediate => self.process_csi_intermediate(byte),
            State::CsiIgnore => self.process_csi_ignore(byte),
            State::OscString => self.process_osc_string(byte),
            State::DcsEntry => self.process_dcs_entry(byte),
            State::DcsParam => self.process_dcs_param(byte),
            State::DcsIntermediate => self.process_dcs_intermediate(byte),
            State::DcsPassthrough | State::SosPmApcString => {
                self.collect_string(byte);
                None
            }
            State::DcsIgnore => None,
        }
    }

    /// Process C0 control characters (0x00-0x1F)
    fn process_c0(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x18 | 0x1A => {
                // CAN, SUB - abort the current sequence without dispatching
                if self.state != State::Ground {
                    tracing::trace!("sequence cancelled in {:?}", self.state);
                }
                self.state = State::Ground;
                self.clear_params();
                self.osc_string.clear();
                self.dcs_string.clear();
                None
            }
            0x1B => {
                // ESC - terminates strings, restarts everything else
                let action = match self.state {
                    State::OscString => self.terminate_osc(),
                    State::DcsPassthrough | State::SosPmApcString => self.terminate_string(),
                    State::DcsIgnore => {
                        self.dcs_string.clear();
                        None
                    }
                    _ => None,
                };
                self.state = State::Escape;
                self.clear_params();
                action
            }
            _ => match self.state {
                // BEL terminates OSC (xterm extension), other C0 are ignored there
                State::OscString if byte == 0x07 => {
                    let action = self.terminate_osc();
                    self.state = State::Ground;
                    action
                }
                State::OscString
                | State::SosPmApcString
                | State::DcsEntry
                | State::DcsParam
                | State::DcsIntermediate
                | State::DcsIgnore => None,
                State::DcsPassthrough => {
                    self.collect_string(byte);
                    None
                }
                // Executed immediately, even in the middle of a sequence
                _ => Some(Action::Execute(byte)),
            },
        }
    }

    /// Process C1 control characters (0x80-0x9F)
    fn process_c1(&mut self, byte: u8) -> Option<Action> {
        self.clear_params();
        self.state = State::Ground;

        match byte {
            0x84 => Some(Action::EscDispatch(EscAction::Index)),
            0x85 => Some(Action::EscDispatch(EscAction::NextLine)),
            0x88 => Some(Action::EscDispatch(EscAction::TabSet)),
            0x8D => Some(Action::EscDispatch(EscAction::ReverseIndex)),
            0x90 => {
                // DCS
                self.state = State::DcsEntry;
                self.dcs_string.clear();
                None
            }
            0x98 | 0x9E | 0x9F => {
                // SOS, PM, APC
                self.state = State::SosPmApcString;
                self.dcs_string.clear();
                None
            }
            0x9B => {
                // CSI
                self.state = State::CsiEntry;
                None
            }
            0x9D => {
                // OSC
                self.state = State::OscString;
                self.osc_string.clear();
                None
            }
            // ST outside of a string, and C1 controls with no meaning here
            _ => {
                tracing::debug!("ignored C1 control {:#04x}", byte);
                None
            }
        }
    }

    /// Process bytes in escape state
    fn process_escape(&mut self, byte: u8) -> Option<Action> {
        match byte {
            // Intermediate bytes
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::EscapeIntermediate;
                None
            }
            // CSI (ESC [)
            b'[' => {
                self.state = State::CsiEntry;
                self.clear_params();
                None
            }
            // OSC (ESC ])
            b']' => {
                self.state = State::OscString;
                self.osc_string.clear();
                None
            }
            // DCS (ESC P)
            b'P' => {
                self.state = State::DcsEntry;
                self.clear_params();
                self.dcs_string.clear();
                None
            }
            // SOS (ESC X), PM (ESC ^), APC (ESC _)
            b'X' | b'^' | b'_' => {
                self.state = State::SosPmApcString;
                self.dcs_string.clear();
                None
            }
            // Final bytes - dispatch ESC sequence
            0x30..=0x7E => {
                self.state = State::Ground;
                self.dispatch_esc(byte)
            }
            _ => {
                tracing::debug!("unexpected byte {:#04x} after ESC", byte);
                self.state = State::Ground;
                None
            }
        }
    }

    /// Process bytes in escape intermediate state
    fn process_escape_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                }
                None
            }
            0x30..=0x7E => {
                self.state = State::Ground;
                self.dispatch_esc(byte)
            }
            _ => {
                self.state = State::Ground;
                None
            }
        }
    }

    /// Dispatch ESC sequence
    fn dispatch_esc(&mut self, final_byte: u8) -> Option<Action> {
        let action = match (self.intermediates.as_slice(), final_byte) {
            ([], b'7') => EscAction::SaveCursor,
            ([], b'8') => EscAction::RestoreCursor,
            ([], b'D') => EscAction::Index,
            ([], b'M') => EscAction::ReverseIndex,
            ([], b'E') => EscAction::NextLine,
            ([], b'H') => EscAction::TabSet,
            ([], b'c') => EscAction::FullReset,
            ([], b'=') => EscAction::ApplicationKeypad,
            ([], b'>') => EscAction::NormalKeypad,
            // ST with nothing to terminate
            ([], b'\\') => return None,
            (&[slot @ (b'(' | b')' | b'*' | b'+' | b'-' | b'.' | b'/')], charset) => {
                EscAction::DesignateCharset { slot, charset }
            }
            _ => {
                let mut seq = self.intermediates.clone();
                seq.push(final_byte);
                tracing::debug!("unknown ESC sequence {:?}", seq);
                return Some(Action::Unsupported(seq));
            }
        };

        Some(Action::EscDispatch(action))
    }

    /// Finish the parameter being built, if any
    fn finish_param(&mut self) {
        if self.param_has_digit || !self.params.is_empty() {
            self.push_param();
        }
    }

    /// Push the current parameter and start a new one
    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.current_param);
        }
        self.current_param = 0;
        self.param_has_digit = false;
    }

    fn accumulate_digit(&mut self, byte: u8) {
        self.current_param = self
            .current_param
            .saturating_mul(10)
            .saturating_add(u16::from(byte - b'0'));
        self.param_has_digit = true;
    }

    /// Process bytes in CSI entry state
    fn process_csi_entry(&mut self, byte: u8) -> Option<Action> {
        match byte {
            // Parameter bytes
            b'0'..=b'9' => {
                self.accumulate_digit(byte);
                self.state = State::CsiParam;
                None
            }
            // Separator - empty first parameter
            b';' | b':' => {
                self.push_param();
                self.state = State::CsiParam;
                None
            }
            // Private marker
            b'<'..=b'?' => {
                self.private_marker = Some(byte);
                self.state = State::CsiParam;
                None
            }
            // Intermediate bytes
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
                None
            }
            // Final bytes - dispatch
            0x40..=0x7E => {
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    /// Process bytes in CSI param state
    fn process_csi_param(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'0'..=b'9' => {
                self.accumulate_digit(byte);
                None
            }
            // Parameter separator; sub-parameters are flattened
            b';' | b':' => {
                self.push_param();
                None
            }
            // Intermediate bytes
            0x20..=0x2F => {
                self.finish_param();
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
                None
            }
            // Final bytes - dispatch
            0x40..=0x7E => {
                self.finish_param();
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            // Private markers in wrong position, or non-ASCII
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    /// Process bytes in CSI intermediate state
    fn process_csi_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F if self.intermediates.len() < MAX_INTERMEDIATES => {
                self.intermediates.push(byte);
                None
            }
            0x40..=0x7E => {
                self.state = State::Ground;
                self.dispatch_csi(byte)
            }
            _ => {
                self.state = State::CsiIgnore;
                None
            }
        }
    }

    /// Process bytes in CSI ignore state
    fn process_csi_ignore(&mut self, byte: u8) -> Option<Action> {
        if (0x40..=0x7E).contains(&byte) {
            tracing::debug!("malformed CSI sequence ending in {:?} ignored", byte as char);
            self.state = State::Ground;
            self.clear_params();
        }
        None
    }

    /// Dispatch CSI sequence
    fn dispatch_csi(&mut self, final_byte: u8) -> Option<Action> {
        let action = CsiAction {
            params: std::mem::take(&mut self.params),
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
            private_marker: self.private_marker,
        };
        self.clear_params();

        Some(Action::CsiDispatch(action))
    }

    /// Process bytes in OSC string state
    fn process_osc_string(&mut self, byte: u8) -> Option<Action> {
        if self.osc_string.len() < MAX_STRING_LEN {
            self.osc_string.push(byte);
        }
        None
    }

    /// Terminate OSC sequence and dispatch
    ///
    /// The caller decides the next state (Ground for BEL, Escape for ESC).
    fn terminate_osc(&mut self) -> Option<Action> {
        let raw = std::mem::take(&mut self.osc_string);
        let (command, payload) = match raw.iter().position(|&b| b == b';') {
            Some(split) => (&raw[..split], &raw[split + 1..]),
            None => (&raw[..], &[][..]),
        };

        let command = match std::str::from_utf8(command)
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
        {
            Some(command) => command,
            None => {
                tracing::debug!("OSC without a numeric command ignored");
                return Some(Action::Unsupported(raw));
            }
        };

        let payload = String::from_utf8_lossy(payload).into_owned();
        let action = match command {
            0 | 2 => OscAction::SetTitle(payload),
            1 => OscAction::SetIconName(payload),
            _ => OscAction::Unknown {
                command,
                data: payload,
            },
        };

        Some(Action::OscDispatch(action))
    }

    /// Process bytes in DCS entry state
    fn process_dcs_entry(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'0'..=b'9' | b';' | b':' | b'<'..=b'?' => {
                self.state = State::DcsParam;
                None
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::DcsIntermediate;
                None
            }
            0x40..=0x7E => {
                self.state = State::DcsPassthrough;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    /// Process bytes in DCS param state
    fn process_dcs_param(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'0'..=b'9' | b';' | b':' => None,
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::DcsIntermediate;
                None
            }
            0x40..=0x7E => {
                self.state = State::DcsPassthrough;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    /// Process bytes in DCS intermediate state
    fn process_dcs_intermediate(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x20..=0x2F if self.intermediates.len() < MAX_INTERMEDIATES => {
                self.intermediates.push(byte);
                None
            }
            0x40..=0x7E => {
                self.state = State::DcsPassthrough;
                None
            }
            _ => {
                self.state = State::DcsIgnore;
                None
            }
        }
    }

    /// Append a byte to the DCS/SOS/PM/APC payload
    fn collect_string(&mut self, byte: u8) {
        if self.dcs_string.len() < MAX_STRING_LEN {
            self.dcs_string.push(byte);
        }
    }

    /// Terminate a DCS/SOS/PM/APC string (ST received)
    fn terminate_string(&mut self) -> Option<Action> {
        let data = std::mem::take(&mut self.dcs_string);
        tracing::debug!("string sequence of {} bytes ignored", data.len());
        Some(Action::Unsupported(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_csi(actions: &[Action]) -> &CsiAction {
        assert_eq!(actions.len(), 1, "actions: {:?}", actions);
        match &actions[0] {
            Action::CsiDispatch(csi) => csi,
            other => panic!("Expected CsiDispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_print() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"Hello");

        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], Action::Print('H'));
        assert_eq!(actions[4], Action::Print('o'));
    }

    #[test]
    fn test_parser_c0_controls() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"A\nB\rC");

        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], Action::Print('A'));
        assert_eq!(actions[1], Action::Execute(b'\n'));
        assert_eq!(actions[2], Action::Print('B'));
        assert_eq!(actions[3], Action::Execute(b'\r'));
        assert_eq!(actions[4], Action::Print('C'));
    }

    #[test]
    fn test_parser_csi_cursor_up() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[5A");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![5]);
        assert_eq!(csi.final_byte, b'A');
        assert_eq!(csi.private_marker, None);
    }

    #[test]
    fn test_parser_csi_cup() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[10;20H");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![10, 20]);
        assert_eq!(csi.final_byte, b'H');
    }

    #[test]
    fn test_parser_csi_private() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[?25h");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![25]);
        assert_eq!(csi.final_byte, b'h');
        assert!(csi.is_dec_private());
    }

    #[test]
    fn test_parser_csi_sgr() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[1;31;48;2;255;128;0m");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![1, 31, 48, 2, 255, 128, 0]);
        assert_eq!(csi.final_byte, b'm');
    }

    #[test]
    fn test_parser_missing_params_are_zero() {
        let mut parser = Parser::new();

        let csi = single_csi(&parser.parse(b"\x1b[;5H")).clone();
        assert_eq!(csi.params, vec![0, 5]);

        let csi = single_csi(&parser.parse(b"\x1b[5;H")).clone();
        assert_eq!(csi.params, vec![5, 0]);
    }

    #[test]
    fn test_parser_colon_is_separator() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[38:2:1:2:3m");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![38, 2, 1, 2, 3]);
    }

    #[test]
    fn test_parser_param_saturates() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[99999999999A");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![u16::MAX]);
    }

    #[test]
    fn test_parser_param_count_capped() {
        let mut parser = Parser::new();
        let mut seq = b"\x1b[".to_vec();
        for i in 0..40 {
            if i > 0 {
                seq.push(b';');
            }
            seq.extend_from_slice(b"1");
        }
        seq.push(b'm');

        let actions = parser.parse(&seq);
        let csi = single_csi(&actions);
        assert_eq!(csi.params.len(), MAX_PARAMS);
    }

    #[test]
    fn test_parser_misplaced_private_marker_ignored() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[1?2hX");

        // The whole sequence is swallowed up to its final byte
        assert_eq!(actions, vec![Action::Print('X')]);
        assert!(parser.is_ground());
    }

    #[test]
    fn test_parser_esc_save_restore() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b7\x1b8");

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Action::EscDispatch(EscAction::SaveCursor));
        assert_eq!(actions[1], Action::EscDispatch(EscAction::RestoreCursor));
    }

    #[test]
    fn test_parser_unknown_esc_is_unsupported() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b#8");

        assert_eq!(actions, vec![Action::Unsupported(vec![b'#', b'8'])]);
    }

    #[test]
    fn test_parser_osc_title() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b]0;My Title\x07");

        assert_eq!(
            actions,
            vec![Action::OscDispatch(OscAction::SetTitle("My Title".into()))]
        );
    }

    #[test]
    fn test_parser_osc_st_terminator() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b]2;Other\x1b\\A");

        assert_eq!(
            actions,
            vec![
                Action::OscDispatch(OscAction::SetTitle("Other".into())),
                Action::Print('A'),
            ]
        );
        assert!(parser.is_ground());
    }

    #[test]
    fn test_parser_osc_raw_c1_is_payload() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b]7;a\x9cb\x07");

        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::OscDispatch(OscAction::Unknown { command, data }) => {
                assert_eq!(*command, 7);
                // 0x9C on its own is not valid UTF-8
                assert_eq!(data, "a\u{FFFD}b");
            }
            other => panic!("Expected OscDispatch Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_osc_payload_capped() {
        let mut parser = Parser::new();
        let mut seq = b"\x1b]0;".to_vec();
        seq.extend(std::iter::repeat(b'x').take(MAX_STRING_LEN * 2));
        seq.push(0x07);
        seq.push(b'Z');

        let actions = parser.parse(&seq);
        assert_eq!(actions.len(), 2);
        match &actions[0] {
            // "0;" counts toward the cap
            Action::OscDispatch(OscAction::SetTitle(title)) => {
                assert_eq!(title.len(), MAX_STRING_LEN - 2)
            }
            other => panic!("Expected SetTitle, got {:?}", other),
        }
        assert_eq!(actions[1], Action::Print('Z'));
    }

    #[test]
    fn test_parser_utf8() {
        let mut parser = Parser::new();
        let actions = parser.parse("Hello 世界".as_bytes());

        // "Hello " = 6 chars, "世界" = 2 chars
        assert_eq!(actions.len(), 8);
        assert_eq!(actions[6], Action::Print('世'));
        assert_eq!(actions[7], Action::Print('界'));
    }

    #[test]
    fn test_parser_utf8_interrupted_by_escape() {
        let mut parser = Parser::new();
        // E4 B8 is a truncated '世'; the ESC must still start a CSI
        let actions = parser.parse(b"\xe4\xb8\x1b[2A");

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Action::Print(REPLACEMENT));
        let csi = single_csi(&actions[1..]);
        assert_eq!(csi.final_byte, b'A');
        assert_eq!(csi.params, vec![2]);
    }

    #[test]
    fn test_parser_decoded_c1_csi() {
        let mut parser = Parser::new();
        // U+009B encoded as UTF-8 is CSI
        let actions = parser.parse(b"\xc2\x9b3B");

        let csi = single_csi(&actions);
        assert_eq!(csi.final_byte, b'B');
        assert_eq!(csi.params, vec![3]);
    }

    #[test]
    fn test_parser_raw_c1_in_ground_is_replacement() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x9b3B");

        assert_eq!(
            actions,
            vec![
                Action::Print(REPLACEMENT),
                Action::Print('3'),
                Action::Print('B')
            ]
        );
    }

    #[test]
    fn test_parser_raw_c1_after_escape() {
        let mut parser = Parser::new();
        // A raw CSI restarts the sequence in any non-string state
        let actions = parser.parse(b"\x1b[1\x9b4C");

        let csi = single_csi(&actions);
        assert_eq!(csi.params, vec![4]);
        assert_eq!(csi.final_byte, b'C');
    }

    #[test]
    fn test_parser_chunk_boundary() {
        let mut parser = Parser::new();

        // Split CSI sequence across chunks
        let actions1 = parser.parse(b"\x1b[");
        let actions2 = parser.parse(b"5");
        let actions3 = parser.parse(b"A");

        assert!(actions1.is_empty());
        assert!(actions2.is_empty());
        let csi = single_csi(&actions3);
        assert_eq!(csi.params, vec![5]);
        assert_eq!(csi.final_byte, b'A');
    }

    #[test]
    fn test_parser_utf8_chunk_boundary() {
        let mut parser = Parser::new();

        // UTF-8 for '世' is E4 B8 96
        let actions1 = parser.parse(&[0xE4]);
        let actions2 = parser.parse(&[0xB8]);
        assert!(!parser.is_ground());
        let actions3 = parser.parse(&[0x96]);

        assert!(actions1.is_empty());
        assert!(actions2.is_empty());
        assert_eq!(actions3, vec![Action::Print('世')]);
    }

    #[test]
    fn test_parser_cancel_sequence() {
        let mut parser = Parser::new();

        // Start CSI, then cancel with CAN
        let actions = parser.parse(b"\x1b[5\x18A");

        // CAN cancels the sequence, 'A' is printed
        assert_eq!(actions, vec![Action::Print('A')]);
    }

    #[test]
    fn test_parser_sub_cancels_osc() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b]0;title\x1aB");

        assert_eq!(actions, vec![Action::Print('B')]);
    }

    #[test]
    fn test_parser_empty_params() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[H");

        let csi = single_csi(&actions);
        assert!(csi.params.is_empty());
        assert_eq!(csi.final_byte, b'H');
    }

    #[test]
    fn test_parser_designate_charset() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b(B\x1b)0");

        assert_eq!(
            actions,
            vec![
                Action::EscDispatch(EscAction::DesignateCharset {
                    slot: b'(',
                    charset: b'B'
                }),
                Action::EscDispatch(EscAction::DesignateCharset {
                    slot: b')',
                    charset: b'0'
                }),
            ]
        );
    }

    #[test]
    fn test_parser_dcs_is_unsupported() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1bP1$qm\x1b\\X");

        assert_eq!(
            actions,
            vec![Action::Unsupported(b"m".to_vec()), Action::Print('X')]
        );
    }

    #[test]
    fn test_parser_apc_is_unsupported() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b_Gabc\x1b\\");

        assert_eq!(actions, vec![Action::Unsupported(b"Gabc".to_vec())]);
    }

    #[test]
    fn test_parser_c0_inside_csi_executes() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[1\r2H");

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Action::Execute(b'\r'));
        let csi = single_csi(&actions[1..]);
        assert_eq!(csi.params, vec![12]);
    }

    #[test]
    fn test_parser_reset() {
        let mut parser = Parser::new();
        parser.parse(b"\x1b[12;");
        assert!(!parser.is_ground());

        parser.reset();
        assert!(parser.is_ground());
        assert_eq!(parser.parse(b"A"), vec![Action::Print('A')]);
    }
}
