use crate::models::{ScanResult, Student, TeamMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Valid,
    Duplicate,
    Invalid,
}

/// Operator actions offered by a displayed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Check in the whole single-pass ticket
    CheckIn,
    /// Check in one team member of a group ticket
    CheckInMember { member_id: String },
    /// Dismiss the result and resume scanning
    Reset,
}

impl ScanResult {
    pub fn display_state(&self) -> DisplayState {
        match self {
            ScanResult::Valid(_) => DisplayState::Valid,
            ScanResult::Duplicate(_) => DisplayState::Duplicate,
            ScanResult::Invalid { .. } => DisplayState::Invalid,
        }
    }

    /// Group tickets carry a member list; the aggregate check-in is hidden for them.
    pub fn is_group_ticket(&self) -> bool {
        self.student().is_some_and(|student| student.members.is_some())
    }

    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let ScanResult::Valid(student) = self {
            match &student.members {
                None => actions.push(Action::CheckIn),
                Some(members) => actions.extend(pending_members(members).map(|member| {
                    Action::CheckInMember {
                        member_id: member.member_id.clone(),
                    }
                })),
            }
        }
        actions.push(Action::Reset);
        actions
    }

    pub fn allows(&self, action: &Action) -> bool {
        self.actions().contains(action)
    }

    pub fn reset_label(&self) -> &'static str {
        match self {
            ScanResult::Valid(student) if student.members.is_none() => "Cancel",
            ScanResult::Valid(_) | ScanResult::Duplicate(_) => "Scan Next",
            ScanResult::Invalid { .. } => "Try Again",
        }
    }

    /// Pass id to confirm: the server document id when known, else what was scanned.
    pub fn confirm_target(&self, scanned: &str) -> String {
        self.student()
            .and_then(|student| student.id.as_deref())
            .filter(|id| !id.is_empty())
            .unwrap_or(scanned)
            .to_string()
    }

    /// Marks one member as checked in. Returns false if the member is unknown.
    pub fn mark_member_checked_in(&mut self, member_id: &str) -> bool {
        let student: &mut Student = match self {
            ScanResult::Valid(student) | ScanResult::Duplicate(student) => student,
            ScanResult::Invalid { .. } => return false,
        };

        match student
            .members
            .as_mut()
            .and_then(|members| members.iter_mut().find(|m| m.member_id == member_id))
        {
            Some(member) => {
                member.checked_in = true;
                true
            }
            None => false,
        }
    }
}

fn pending_members(members: &[TeamMember]) -> impl Iterator<Item = &TeamMember> {
    members.iter().filter(|member| !member.checked_in)
}
