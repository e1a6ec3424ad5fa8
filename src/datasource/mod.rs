//! Data source abstraction for reading memberships and contacts from the CRM.

use crate::domain::{ContactId, ContactRecord, MembershipRecord};
use async_trait::async_trait;
use std::fmt;

pub mod civicrm;
pub mod mock;

pub use civicrm::CiviCrmClient;
pub use mock::MockMembershipSource;

/// Read-only paged record store holding memberships and their contacts.
///
/// Any error returned here means the store itself is unusable; callers treat
/// it as fatal for the whole run.
#[async_trait]
pub trait MembershipSource: Send + Sync + fmt::Debug {
    /// Fetch one page of memberships.
    ///
    /// # Arguments
    /// * `offset` - Index of the first record
    /// * `limit` - Maximum number of records in the page
    ///
    /// # Returns
    /// The page's records; fewer than `limit` means there is no further page
    async fn fetch_memberships(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MembershipRecord>, DataSourceError>;

    /// Fetch the contact a membership belongs to, or `None` if it does not
    /// exist.
    async fn fetch_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<ContactRecord>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 403 bad key, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// The API answered with `is_error` set
    ApiError(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::ApiError(msg) => write!(f, "API call failed: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::HttpError {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 403: Forbidden");

        let err = DataSourceError::ParseError("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: invalid JSON");

        let err = DataSourceError::ApiError("Invalid site key".to_string());
        assert_eq!(err.to_string(), "API call failed: Invalid site key");
    }
}
