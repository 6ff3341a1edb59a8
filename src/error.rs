use thiserror::Error;

use crate::capture::CaptureError;
use crate::services::credential_store::StoreError;
use crate::services::session::LoginError;
use crate::services::ticket_qr::TicketQrError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Login(#[from] LoginError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    #[error("QR code error: {0}")]
    TicketQr(#[from] TicketQrError),

    #[error("Not logged in; run `tkscan login` first")]
    Unauthorized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
