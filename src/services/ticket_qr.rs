use qrcode::render::{svg, unicode};
use qrcode::QrCode;

use crate::services::ticket_payload::TicketPayload;

#[derive(thiserror::Error, Debug)]
pub enum TicketQrError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("JSON serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

fn encode(payload: &TicketPayload) -> Result<QrCode, TicketQrError> {
    let json_str = payload.to_qr_string()?;
    Ok(QrCode::new(json_str.as_bytes())?)
}

/// Renders a ticket QR code for display in a terminal.
pub fn render_terminal(payload: &TicketPayload) -> Result<String, TicketQrError> {
    let code = encode(payload)?;

    // Inverted so the code scans on dark terminal backgrounds
    let rendered = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build();

    Ok(rendered)
}

/// Renders a ticket QR code as an SVG document.
pub fn render_svg(payload: &TicketPayload) -> Result<String, TicketQrError> {
    let code = encode(payload)?;
    Ok(code.render::<svg::Color>().min_dimensions(200, 200).build())
}
