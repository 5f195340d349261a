//! Acknowledgement tokens sent back to the scanner

use std::fmt;

/// Acknowledgement for one identity scan
///
/// The scanner firmware drives its display from these tokens, so each
/// must be flushed before the next inbound line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ack {
    /// Scan accepted (session opened/closed, entry or exit recorded)
    Logged,
    /// Scan refused (no session open and not the professor)
    Rejected,
    /// Scan had no effect (identity already completed entry and exit)
    Ignored,
}

impl Ack {
    /// Wire token, without the line terminator
    pub fn token(&self) -> &'static str {
        match self {
            Ack::Logged => "Logged_1000",
            Ack::Rejected => "Rejected_2000",
            Ack::Ignored => "Ignored_1500",
        }
    }

    /// Parse a wire token as the scanner firmware would
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim_end() {
            "Logged_1000" => Some(Ack::Logged),
            "Rejected_2000" => Some(Ack::Rejected),
            "Ignored_1500" => Some(Ack::Ignored),
            _ => None,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
