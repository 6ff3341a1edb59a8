use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("Permission denied for capture device {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Capture device {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("Capture device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionState {
    /// Access has not been requested yet
    Pending,
    /// Access was refused; the operator may retry
    Denied(String),
    Granted,
}

impl From<&CaptureError> for PermissionState {
    fn from(error: &CaptureError) -> Self {
        PermissionState::Denied(error.to_string())
    }
}

/// Line-oriented code reader, e.g. a QR scanner in serial (CDC) mode.
pub struct LineDevice<R> {
    lines: Lines<R>,
}

impl<R> LineDevice<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, CaptureError> {
        Ok(self.lines.next_line().await?)
    }
}

/// Opens the capture device at `path`.
#[tracing::instrument]
pub async fn request_access(path: &Path) -> Result<LineDevice<BufReader<File>>, CaptureError> {
    match File::open(path).await {
        Ok(file) => {
            tracing::info!("Capture device opened");
            Ok(LineDevice::new(BufReader::new(file)))
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!("Capture device access denied");
            Err(CaptureError::PermissionDenied(path.to_path_buf()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("Capture device not found");
            Err(CaptureError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
