// Models module - API wire types and scan outcomes

pub mod check_in;
pub mod scan;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use check_in::{ConfirmRequest, ConfirmResponse};
pub use scan::{ScanRequest, ScanResponse, ScanResult, ScanStatus, Student, TeamMember};
pub use user::{AuthResponse, LoginRequest, User};

/// Reads a JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
