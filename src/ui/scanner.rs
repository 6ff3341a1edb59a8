use askama::Template;

use crate::capture::PermissionState;
use crate::services::scan_controller::Phase;
use crate::ui::terminal::QUIT_COMMAND;

#[derive(Template)]
#[template(path = "scanner.txt", escape = "none")]
struct ScannerTemplate<'a> {
    operator: &'a str,
    status: &'static str,
    hint: String,
}

#[derive(Template)]
#[template(path = "permission.txt", escape = "none")]
struct PermissionTemplate<'a> {
    title: &'static str,
    detail: &'a str,
    hint: &'static str,
}

pub fn status_line(phase: Phase) -> &'static str {
    match phase {
        Phase::Scanning => "Point camera at QR code",
        Phase::Verifying => "Verifying...",
        Phase::Showing => "Processing result...",
    }
}

/// Overlay shown above the live capture feed.
pub fn render(operator: &str, phase: Phase) -> Result<String, askama::Error> {
    let hint = match phase {
        Phase::Scanning => format!("Type {} to exit.", QUIT_COMMAND),
        Phase::Verifying | Phase::Showing => String::new(),
    };
    ScannerTemplate {
        operator,
        status: status_line(phase),
        hint,
    }
    .render()
}

/// Device access screen for each permission state.
pub fn render_permission(state: &PermissionState) -> Result<String, askama::Error> {
    let template = match state {
        PermissionState::Pending => PermissionTemplate {
            title: "Opening capture device...",
            detail: "",
            hint: "",
        },
        PermissionState::Denied(reason) => PermissionTemplate {
            title: "Camera Access Required",
            detail: reason,
            hint: "Press Enter to retry, or q to quit.",
        },
        PermissionState::Granted => PermissionTemplate {
            title: "Align QR code within frame",
            detail: "",
            hint: "",
        },
    };
    template.render()
}
