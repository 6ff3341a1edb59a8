use crate::capture::CaptureGate;
use crate::models::ScanResult;
use crate::services::api_client::ApiClient;
use crate::services::scan_result::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Verifying,
    Showing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Whole ticket checked in; back to scanning
    CheckedIn,
    /// One member checked in; the result stays on screen
    MemberCheckedIn { member_id: String },
    /// Server refused or the call failed; the result is unchanged
    Failed(String),
    /// The displayed result does not offer this action
    NotAllowed,
}

/// Drives one scanning screen: decode → verify → show → confirm or reset.
pub struct ScanController {
    api: ApiClient,
    scanner_id: String,
    gate: Option<CaptureGate>,
    phase: Phase,
    result: Option<ScanResult>,
    last_scanned: Option<String>,
}

impl ScanController {
    pub fn new(api: ApiClient, scanner_id: impl Into<String>) -> Self {
        Self {
            api,
            scanner_id: scanner_id.into(),
            gate: None,
            phase: Phase::Scanning,
            result: None,
            last_scanned: None,
        }
    }

    /// Mirrors the phase onto a capture gate so the device is paused while busy.
    pub fn with_gate(mut self, gate: CaptureGate) -> Self {
        gate.set_enabled(self.phase == Phase::Scanning);
        self.gate = Some(gate);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    pub fn last_scanned(&self) -> Option<&str> {
        self.last_scanned.as_deref()
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        if let Some(gate) = &self.gate {
            gate.set_enabled(phase == Phase::Scanning);
        }
    }

    /// Verifies a decoded code. Ignored unless the controller is scanning.
    #[tracing::instrument(skip(self, decoded_text), fields(scanner_id = %self.scanner_id))]
    pub async fn handle_decode(&mut self, decoded_text: &str) -> Option<&ScanResult> {
        if self.phase != Phase::Scanning || self.result.is_some() {
            tracing::debug!(phase = ?self.phase, "Decode ignored while busy");
            return None;
        }

        self.set_phase(Phase::Verifying);
        self.last_scanned = Some(decoded_text.to_string());

        let result = self.api.scan(decoded_text, &self.scanner_id).await;
        tracing::info!(status = ?result.status(), "Scan result ready");

        self.result = Some(result);
        self.set_phase(Phase::Showing);
        self.result.as_ref()
    }

    /// Dismisses the current result and resumes scanning.
    pub fn reset(&mut self) {
        self.result = None;
        self.last_scanned = None;
        self.set_phase(Phase::Scanning);
    }

    fn confirm_target(&self) -> Option<String> {
        let result = self.result.as_ref()?;
        let scanned = self.last_scanned.as_deref().unwrap_or_default();
        Some(result.confirm_target(scanned)).filter(|target| !target.is_empty())
    }

    /// Checks in the whole single-pass ticket.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&mut self) -> ConfirmOutcome {
        let allowed = self
            .result
            .as_ref()
            .is_some_and(|result| result.allows(&Action::CheckIn));
        let Some(target) = self.confirm_target().filter(|_| allowed) else {
            return ConfirmOutcome::NotAllowed;
        };

        let response = self.api.confirm_check_in(&target, None).await;
        if response.success {
            tracing::info!(pass_id = %target, "Ticket checked in");
            self.reset();
            ConfirmOutcome::CheckedIn
        } else {
            let message = response
                .error
                .unwrap_or_else(|| "Confirmation failed".to_string());
            tracing::warn!(pass_id = %target, error = %message, "Ticket check-in failed");
            ConfirmOutcome::Failed(message)
        }
    }

    /// Checks in one member of a group ticket and marks them locally on success.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_member(&mut self, member_id: &str) -> ConfirmOutcome {
        let action = Action::CheckInMember {
            member_id: member_id.to_string(),
        };
        let allowed = self
            .result
            .as_ref()
            .is_some_and(|result| result.allows(&action));
        let Some(target) = self.confirm_target().filter(|_| allowed) else {
            return ConfirmOutcome::NotAllowed;
        };

        let response = self.api.confirm_check_in(&target, Some(member_id)).await;
        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "Check-in failed".to_string());
            tracing::warn!(pass_id = %target, member_id, error = %message, "Member check-in failed");
            return ConfirmOutcome::Failed(message);
        }

        if let Some(result) = self.result.as_mut() {
            result.mark_member_checked_in(member_id);
        }
        tracing::info!(pass_id = %target, member_id, "Member checked in");
        ConfirmOutcome::MemberCheckedIn {
            member_id: member_id.to_string(),
        }
    }
}
