//! CiviCRM REST (API v3) client implementation.

use super::{DataSourceError, MembershipSource};
use crate::domain::{ContactId, ContactRecord, MembershipRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const MEMBERSHIP_FIELDS: &str = "contact_id,status_id";
const CONTACT_FIELDS: &str =
    "external_identifier,preferred_communication_method,preferred_language,first_name,last_name";

/// CiviCRM data source using the `extern/rest.php` endpoint.
#[derive(Clone)]
pub struct CiviCrmClient {
    client: Client,
    endpoint: String,
    site_key: String,
    api_key: String,
    membership_type: String,
}

impl std::fmt::Debug for CiviCrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiviCrmClient")
            .field("endpoint", &self.endpoint)
            .field("membership_type", &self.membership_type)
            .finish_non_exhaustive()
    }
}

/// Envelope of every API v3 response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    is_error: i64,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    values: serde_json::Value,
}

impl CiviCrmClient {
    /// `server` and `path` are joined verbatim, e.g.
    /// `https://crm.example.org` + `/sites/all/modules/civicrm/extern/rest.php`.
    pub fn new(
        client: Client,
        server: &str,
        path: &str,
        site_key: impl Into<String>,
        api_key: impl Into<String>,
        membership_type: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", server, path),
            site_key: site_key.into(),
            api_key: api_key.into(),
            membership_type: membership_type.into(),
        }
    }

    pub fn membership_params(&self, offset: usize, limit: usize) -> serde_json::Value {
        serde_json::json!({
            "sequential": 1,
            "options": { "offset": offset, "limit": limit },
            "membership_type_id": self.membership_type,
            "return": MEMBERSHIP_FIELDS,
        })
    }

    pub fn contact_params(contact_id: &ContactId) -> serde_json::Value {
        serde_json::json!({
            "sequential": 1,
            "id": contact_id.as_str(),
            "return": CONTACT_FIELDS,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        entity: &str,
        params: serde_json::Value,
    ) -> Result<Vec<T>, DataSourceError> {
        debug!("CiviCRM {}.get {}", entity, params);

        let json = params.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("entity", entity),
                ("action", "get"),
                ("json", json.as_str()),
                ("key", self.site_key.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DataSourceError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataSourceError::HttpError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| DataSourceError::ParseError(e.to_string()))?;

        parse_values(body)
    }
}

/// Unpack `values`, which is an array for sequential requests and an object
/// keyed by id otherwise.
fn parse_values<T: DeserializeOwned>(body: ApiResponse) -> Result<Vec<T>, DataSourceError> {
    if body.is_error != 0 {
        return Err(DataSourceError::ApiError(
            body.error_message
                .unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    let rows = match body.values {
        serde_json::Value::Array(rows) => rows,
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        serde_json::Value::Null => Vec::new(),
        other => {
            return Err(DataSourceError::ParseError(format!(
                "Expected array or object values, got {}",
                other
            )))
        }
    };

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| DataSourceError::ParseError(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl MembershipSource for CiviCrmClient {
    async fn fetch_memberships(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MembershipRecord>, DataSourceError> {
        self.get("Membership", self.membership_params(offset, limit))
            .await
    }

    async fn fetch_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<ContactRecord>, DataSourceError> {
        let contacts: Vec<ContactRecord> =
            self.get("Contact", Self::contact_params(contact_id)).await?;
        Ok(contacts.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_sequential_values() {
        let rows: Vec<MembershipRecord> = parse_values(response(serde_json::json!({
            "is_error": 0,
            "count": 2,
            "values": [
                {"id": "1", "contact_id": "7", "status_id": "1"},
                {"id": "2", "contact_id": "8", "status_id": "4"}
            ]
        })))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].contact_id, ContactId::new("8"));
        assert_eq!(rows[1].status_id, "4");
    }

    #[test]
    fn test_parse_keyed_values() {
        let rows: Vec<MembershipRecord> = parse_values(response(serde_json::json!({
            "is_error": 0,
            "values": {"10": {"contact_id": "7", "status_id": "2"}}
        })))
        .unwrap();
        assert_eq!(rows, vec![MembershipRecord::new(ContactId::new("7"), "2")]);
    }

    #[test]
    fn test_parse_is_error() {
        let err = parse_values::<MembershipRecord>(response(serde_json::json!({
            "is_error": 1,
            "error_message": "Invalid API key"
        })))
        .unwrap_err();
        assert!(matches!(err, DataSourceError::ApiError(msg) if msg == "Invalid API key"));
    }

    #[test]
    fn test_parse_empty_values() {
        let rows = parse_values::<ContactRecord>(response(serde_json::json!({
            "is_error": 0,
            "count": 0,
            "values": []
        })))
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_contacts_with_odd_identifier() {
        let rows = parse_values::<ContactRecord>(response(serde_json::json!({
            "is_error": 0,
            "values": [
                {"external_identifier": "M007", "preferred_communication_method": ["3"]},
                {"external_identifier": {"legacy": 5}, "preferred_communication_method": ["3"]},
                {"external_identifier": 4711, "preferred_communication_method": "3"}
            ]
        })))
        .unwrap();
        let ids: Vec<&str> = rows.iter().map(|c| c.external_identifier.as_str()).collect();
        assert_eq!(ids, vec!["M007", "", "4711"]);
    }

    #[test]
    fn test_membership_params() {
        let client = CiviCrmClient::new(Client::new(), "https://crm", "/rest.php", "k", "a", "PPS");
        let params = client.membership_params(200, 100);
        assert_eq!(params["options"]["offset"], 200);
        assert_eq!(params["options"]["limit"], 100);
        assert_eq!(params["membership_type_id"], "PPS");
        assert_eq!(params["return"], "contact_id,status_id");
    }
}
