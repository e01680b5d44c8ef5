//! Terminal escape sequence parser
//!
//! A stateful parser that converts bytes into terminal actions.
//! Based on the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>

mod actions;
mod state;
mod utf8;

pub use actions::{Action, CsiAction, EscAction, OscAction};
pub use state::{Parser, MAX_PARAMS, MAX_STRING_LEN};
pub use utf8::{Utf8Decoder, Utf8Step, REPLACEMENT};
