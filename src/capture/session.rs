use tokio::io::AsyncBufRead;
use tokio::sync::watch;

use super::device::{CaptureError, LineDevice};
use super::{DecodedCode, Symbology};

/// Switches decode delivery on and off while the device stays open.
#[derive(Debug)]
pub struct CaptureGate {
    tx: watch::Sender<bool>,
}

impl CaptureGate {
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.tx.send_replace(enabled);
        if was != enabled {
            tracing::debug!(enabled, "Capture gate changed");
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Filters raw device lines down to codes of one symbology, honouring the gate.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    symbology: Symbology,
    enabled: watch::Receiver<bool>,
}

impl CaptureSession {
    /// Creates a session that starts enabled.
    pub fn new(symbology: Symbology) -> (Self, CaptureGate) {
        let (tx, rx) = watch::channel(true);
        (
            Self {
                symbology,
                enabled: rx,
            },
            CaptureGate { tx },
        )
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Returns the decoded text if the line should reach the controller.
    pub fn accept(&self, line: &str) -> Option<String> {
        let decoded = DecodedCode::from_line(line)?;

        if decoded.symbology != self.symbology {
            tracing::debug!(symbology = ?decoded.symbology, "Ignoring code of unexpected symbology");
            return None;
        }

        if !self.is_enabled() {
            tracing::debug!("Capture paused, ignoring decoded code");
            return None;
        }

        Some(decoded.text)
    }

    /// Reads until an accepted code arrives. `None` once the device is exhausted.
    pub async fn next_code<R>(
        &self,
        device: &mut LineDevice<R>,
    ) -> Result<Option<String>, CaptureError>
    where
        R: AsyncBufRead + Unpin,
    {
        while let Some(line) = device.next_line().await? {
            if let Some(text) = self.accept(&line) {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}
