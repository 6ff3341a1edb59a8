//! Capture adapter between a code-reading device and the scan controller.
//!
//! Devices emit one decoded code per line. Hardware scanners may prefix each
//! line with an AIM symbology identifier (`]Q1` for QR); unprefixed lines are
//! taken as QR.

pub mod device;
pub mod session;

pub use device::{request_access, CaptureError, LineDevice, PermissionState};
pub use session::{CaptureGate, CaptureSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbology {
    Qr,
    /// Any other AIM code character, e.g. `C` for Code 128
    Other(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub symbology: Symbology,
    pub text: String,
}

impl DecodedCode {
    /// Parses one device line. Empty lines carry no code.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        let (symbology, text) = match split_aim_prefix(line) {
            Some(('Q', rest)) => (Symbology::Qr, rest),
            Some((code, rest)) => (Symbology::Other(code), rest),
            None => (Symbology::Qr, line),
        };

        if text.is_empty() {
            return None;
        }

        Some(Self {
            symbology,
            text: text.to_string(),
        })
    }
}

/// `]` + code character + modifier digit
fn split_aim_prefix(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    if chars.next()? != ']' {
        return None;
    }
    let code = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    let modifier = chars.next().filter(|c| c.is_ascii_alphanumeric())?;
    let prefix_len = 1 + code.len_utf8() + modifier.len_utf8();
    Some((code, &line[prefix_len..]))
}
