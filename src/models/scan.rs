use serde::{Deserialize, Serialize};

use super::null_as_default;

pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Valid,
    Duplicate,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub member_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_leader: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub checked_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pass_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount_paid: f64,
    /// Server-assigned document id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISO-8601 timestamp of the first check-in, present on duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_check_in_time: Option<String>,
    /// Present only for group tickets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TeamMember>>,
}

/// Request body for `POST /api/scan`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest<'a> {
    pub pass_id: &'a str,
    pub user_id: &'a str,
    pub pass_type: &'a str,
    pub token: &'a str,
    pub scanner_id: &'a str,
}

/// Wire shape of `POST /api/scan` responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of verifying one scanned ticket. The status tag decides the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult {
    Valid(Student),
    Duplicate(Student),
    Invalid { error: String },
}

impl ScanResult {
    pub fn invalid(error: impl Into<String>) -> Self {
        ScanResult::Invalid {
            error: error.into(),
        }
    }

    pub fn status(&self) -> ScanStatus {
        match self {
            ScanResult::Valid(_) => ScanStatus::Valid,
            ScanResult::Duplicate(_) => ScanStatus::Duplicate,
            ScanResult::Invalid { .. } => ScanStatus::Invalid,
        }
    }

    pub fn student(&self) -> Option<&Student> {
        match self {
            ScanResult::Valid(student) | ScanResult::Duplicate(student) => Some(student),
            ScanResult::Invalid { .. } => None,
        }
    }
}

impl From<ScanResponse> for ScanResult {
    fn from(response: ScanResponse) -> Self {
        match (response.status, response.student) {
            (ScanStatus::Valid, Some(student)) => ScanResult::Valid(student),
            (ScanStatus::Duplicate, Some(student)) => ScanResult::Duplicate(student),
            (ScanStatus::Valid | ScanStatus::Duplicate, None) => {
                ScanResult::invalid("Malformed server response: missing ticket details")
            }
            (ScanStatus::Invalid, _) => {
                ScanResult::invalid(response.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ticket_parsing() {
        let json = r#"{
            "status": "valid",
            "student": {
                "name": "Asha",
                "passType": "Team",
                "amountPaid": 1200,
                "_id": "doc-9",
                "members": [
                    {"memberId": "m1", "name": "Asha", "phone": "555", "isLeader": true, "checkedIn": false},
                    {"memberId": "m2", "name": "Ravi", "phone": "556", "isLeader": false, "checkedIn": true,
                     "checkedInAt": "2026-03-01T10:00:00Z"}
                ]
            }
        }"#;
        let response: ScanResponse = serde_json::from_str(json).unwrap();
        let result = ScanResult::from(response);

        let ScanResult::Valid(student) = result else {
            panic!("expected valid result");
        };
        assert_eq!(student.id.as_deref(), Some("doc-9"));
        assert_eq!(student.amount_paid, 1200.0);
        let members = student.members.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[0].is_leader);
        assert!(members[1].checked_in);
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let json = r#"{
            "status": "valid",
            "student": {
                "name": null,
                "passType": null,
                "amountPaid": null,
                "members": [
                    {"memberId": "m1", "name": "Ravi", "phone": null, "isLeader": null, "checkedIn": null}
                ]
            }
        }"#;
        let response: ScanResponse = serde_json::from_str(json).unwrap();

        let ScanResult::Valid(student) = ScanResult::from(response) else {
            panic!("expected valid result");
        };
        assert_eq!(student.name, "");
        assert_eq!(student.pass_type, "");
        assert_eq!(student.amount_paid, 0.0);
        let member = &student.members.unwrap()[0];
        assert_eq!(member.name, "Ravi");
        assert_eq!(member.phone, "");
        assert!(!member.is_leader);
        assert!(!member.checked_in);
    }

    #[test]
    fn test_valid_without_student_is_invalid() {
        let response: ScanResponse = serde_json::from_str(r#"{"status":"valid"}"#).unwrap();
        assert!(matches!(
            ScanResult::from(response),
            ScanResult::Invalid { error } if error.starts_with("Malformed server response")
        ));
    }

    #[test]
    fn test_invalid_without_error_message() {
        let response: ScanResponse = serde_json::from_str(r#"{"status":"invalid"}"#).unwrap();
        assert_eq!(ScanResult::from(response), ScanResult::invalid(UNKNOWN_ERROR));
    }

    #[test]
    fn test_scan_request_wire_names() {
        let body = serde_json::to_value(ScanRequest {
            pass_id: "P",
            user_id: "U",
            pass_type: "T",
            token: "K",
            scanner_id: "S",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "passId": "P", "userId": "U", "passType": "T", "token": "K", "scannerId": "S"
            })
        );
    }
}
