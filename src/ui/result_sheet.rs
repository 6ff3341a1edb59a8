use askama::Template;
use chrono::{DateTime, Local};

use crate::models::{ScanResult, Student};
use crate::services::scan_result::Action;

/// Key the operator types to confirm a single-pass ticket
pub const CHECK_IN_KEY: &str = "c";
/// Key the operator types to dismiss a result
pub const RESET_KEY: &str = "n";

struct Row {
    label: &'static str,
    value: String,
}

struct MemberRow {
    index: usize,
    name: String,
    role: &'static str,
    phone: String,
    checked_in: bool,
}

struct ActionRow {
    key: String,
    label: String,
}

#[derive(Template)]
#[template(path = "result_sheet.txt", escape = "none")]
struct ResultSheetTemplate {
    heading: &'static str,
    subheading: String,
    rows: Vec<Row>,
    is_group: bool,
    members: Vec<MemberRow>,
    actions: Vec<ActionRow>,
}

/// Operator input typed while a result is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetCommand {
    Perform(Action),
    Quit,
    Unknown,
}

/// Maps a typed key to one of the result's current actions.
pub fn parse_command(result: &ScanResult, input: &str) -> SheetCommand {
    let input = input.trim();
    match input {
        "q" | "quit" => return SheetCommand::Quit,
        "" | RESET_KEY => return SheetCommand::Perform(Action::Reset),
        _ => {}
    }

    let action = if input.eq_ignore_ascii_case(CHECK_IN_KEY) {
        Some(Action::CheckIn)
    } else {
        input
            .parse::<usize>()
            .ok()
            .and_then(|index| member_at(result, index))
            .map(|member_id| Action::CheckInMember { member_id })
    };

    match action {
        Some(action) if result.allows(&action) => SheetCommand::Perform(action),
        _ => SheetCommand::Unknown,
    }
}

/// Members are numbered from 1 in server order.
fn member_at(result: &ScanResult, index: usize) -> Option<String> {
    let members = result.student()?.members.as_ref()?;
    members
        .get(index.checked_sub(1)?)
        .map(|member| member.member_id.clone())
}

fn format_scanned_at(student: &Student) -> String {
    student
        .first_check_in_time
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|time| time.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("₹{}", amount as i64)
    } else {
        format!("₹{:.2}", amount)
    }
}

pub fn render(result: &ScanResult) -> Result<String, askama::Error> {
    let (heading, subheading, rows) = match result {
        ScanResult::Valid(student) => {
            let mut rows = vec![
                Row {
                    label: "Name",
                    value: student.name.clone(),
                },
                Row {
                    label: "Pass Type",
                    value: student.pass_type.clone(),
                },
            ];
            if student.members.as_ref().map_or(true, |members| members.is_empty()) {
                rows.push(Row {
                    label: "Amount Paid",
                    value: format_amount(student.amount_paid),
                });
            }
            ("Valid Ticket", "Ready for Check-in".to_string(), rows)
        }
        ScanResult::Duplicate(student) => (
            "Already Scanned",
            "Duplicate Entry Attempt".to_string(),
            vec![
                Row {
                    label: "Name",
                    value: student.name.clone(),
                },
                Row {
                    label: "Scanned At",
                    value: format_scanned_at(student),
                },
                Row {
                    label: "Pass Type",
                    value: student.pass_type.clone(),
                },
            ],
        ),
        ScanResult::Invalid { error } => ("Invalid Ticket", error.clone(), Vec::new()),
    };

    // The member list is only shown for accepted group tickets
    let members: Vec<MemberRow> = match result {
        ScanResult::Valid(Student {
            members: Some(members),
            ..
        }) => members
            .iter()
            .enumerate()
            .map(|(i, member)| MemberRow {
                index: i + 1,
                name: member.name.clone(),
                role: if member.is_leader { "Leader" } else { "Member" },
                phone: member.phone.clone(),
                checked_in: member.checked_in,
            })
            .collect(),
        _ => Vec::new(),
    };

    let actions = result
        .actions()
        .into_iter()
        .filter_map(|action| match action {
            Action::CheckIn => Some(ActionRow {
                key: CHECK_IN_KEY.to_string(),
                label: "Check In".to_string(),
            }),
            // Member actions are listed inline next to each member
            Action::CheckInMember { .. } => None,
            Action::Reset => Some(ActionRow {
                key: RESET_KEY.to_string(),
                label: result.reset_label().to_string(),
            }),
        })
        .collect();

    ResultSheetTemplate {
        heading,
        subheading,
        rows,
        is_group: !members.is_empty(),
        members,
        actions,
    }
    .render()
}
