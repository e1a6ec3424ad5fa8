//! Domain primitives: ContactId, MemberId.

use serde::{Deserialize, Deserializer, Serialize};

/// CRM-internal contact identifier, as referenced by a membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ContactId(pub String);

impl ContactId {
    /// Create a ContactId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        ContactId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ContactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(ContactId)
    }
}

/// Stable external member identifier.
///
/// Used for output file names, signed URL paths and project hashes, so it is
/// only constructed from non-empty values that are safe as a single path
/// segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MemberId(String);

impl MemberId {
    /// Parse a member id, rejecting empty values and values that would escape
    /// the output directory.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\', '\0'])
        {
            return None;
        }
        Some(MemberId(trimmed.to_string()))
    }

    /// Get the member id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this member's invoice artifact.
    pub fn output_file_name(&self) -> String {
        format!("{}.pdf", self.0)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The CRM returns ids either as JSON strings or as JSON numbers depending on
/// the entity and API version.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
