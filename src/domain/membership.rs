//! Membership and contact records as read from the CRM.

use super::primitives::{string_or_number, ContactId};
use serde::{Deserialize, Deserializer, Serialize};

/// Membership status as stored in the CRM.
///
/// Codes outside the known table map to [`MembershipStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Unknown,
    New,
    Pirate,
    Grace,
    Expired,
    Pending,
    Left,
    Dead,
    Excluded,
}

impl MembershipStatus {
    /// Every status, in code order.
    pub const ALL: [MembershipStatus; 9] = [
        MembershipStatus::Unknown,
        MembershipStatus::New,
        MembershipStatus::Pirate,
        MembershipStatus::Grace,
        MembershipStatus::Expired,
        MembershipStatus::Pending,
        MembershipStatus::Left,
        MembershipStatus::Dead,
        MembershipStatus::Excluded,
    ];

    /// Look up the status for a raw CRM status code.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => MembershipStatus::New,
            "2" => MembershipStatus::Pirate,
            "3" => MembershipStatus::Grace,
            "4" => MembershipStatus::Expired,
            "5" => MembershipStatus::Pending,
            "6" => MembershipStatus::Left,
            "7" => MembershipStatus::Dead,
            "8" => MembershipStatus::Excluded,
            _ => MembershipStatus::Unknown,
        }
    }

    /// Human status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Unknown => "unknown",
            MembershipStatus::New => "new",
            MembershipStatus::Pirate => "pirate",
            MembershipStatus::Grace => "grace",
            MembershipStatus::Expired => "expired",
            MembershipStatus::Pending => "pending",
            MembershipStatus::Left => "left",
            MembershipStatus::Dead => "dead",
            MembershipStatus::Excluded => "excluded",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred communication channel codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommunicationMethod {
    Phone,
    Email,
    SnailMail,
}

impl CommunicationMethod {
    /// Look up a channel code; unmapped codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(CommunicationMethod::Phone),
            "2" => Some(CommunicationMethod::Email),
            "3" => Some(CommunicationMethod::SnailMail),
            _ => None,
        }
    }
}

/// One row of the paged membership query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub contact_id: ContactId,
    #[serde(deserialize_with = "string_or_number")]
    pub status_id: String,
}

impl MembershipRecord {
    pub fn new(contact_id: ContactId, status_id: impl Into<String>) -> Self {
        Self {
            contact_id,
            status_id: status_id.into(),
        }
    }
}

/// Contact details needed to build one invoice letter.
///
/// `external_identifier` is kept raw here; it becomes a [`super::MemberId`]
/// only after validation in the driver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub external_identifier: String,
    #[serde(default, deserialize_with = "communication_codes")]
    pub preferred_communication_method: Vec<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numeric identifiers are kept as their decimal text. Any other shape
/// decodes to the empty string so the driver skips just that contact.
fn lenient_identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// The CRM reports multi-valued fields either as a JSON array or as a single
/// string delimited by the `\x01` value separator.
fn communication_codes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<serde_json::Value>),
        Joined(String),
        Single(i64),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(Raw::List(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Raw::Joined(s)) => s
            .split('\u{1}')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Raw::Single(n)) => vec![n.to_string()],
    })
}
