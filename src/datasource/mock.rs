//! Mock membership source for testing without network calls.

use super::{DataSourceError, MembershipSource};
use crate::domain::{ContactId, ContactRecord, MembershipRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Mock membership source that serves predefined records and records every
/// page request it receives.
#[derive(Debug, Default)]
pub struct MockMembershipSource {
    memberships: Vec<MembershipRecord>,
    contacts: HashMap<ContactId, ContactRecord>,
    failing_offset: Option<usize>,
    failing_contacts: HashSet<ContactId>,
    page_requests: Mutex<Vec<(usize, usize)>>,
    contact_requests: Mutex<Vec<ContactId>>,
}

impl MockMembershipSource {
    /// Create a new mock source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a membership record.
    pub fn with_membership(mut self, record: MembershipRecord) -> Self {
        self.memberships.push(record);
        self
    }

    /// Add multiple membership records.
    pub fn with_memberships(mut self, records: Vec<MembershipRecord>) -> Self {
        self.memberships.extend(records);
        self
    }

    /// Add a contact.
    pub fn with_contact(mut self, id: ContactId, contact: ContactRecord) -> Self {
        self.contacts.insert(id, contact);
        self
    }

    /// Report an API error for the page starting at `offset`.
    pub fn with_failing_page(mut self, offset: usize) -> Self {
        self.failing_offset = Some(offset);
        self
    }

    /// Report an API error when this contact is looked up.
    pub fn with_failing_contact(mut self, id: ContactId) -> Self {
        self.failing_contacts.insert(id);
        self
    }

    /// `(offset, limit)` of every page request, in order.
    pub fn page_requests(&self) -> Vec<(usize, usize)> {
        self.page_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn contact_requests(&self) -> Vec<ContactId> {
        self.contact_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MembershipSource for MockMembershipSource {
    async fn fetch_memberships(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MembershipRecord>, DataSourceError> {
        if let Ok(mut requests) = self.page_requests.lock() {
            requests.push((offset, limit));
        }
        if self.failing_offset == Some(offset) {
            return Err(DataSourceError::ApiError("mock page failure".to_string()));
        }

        Ok(self
            .memberships
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<ContactRecord>, DataSourceError> {
        if let Ok(mut requests) = self.contact_requests.lock() {
            requests.push(contact_id.clone());
        }
        if self.failing_contacts.contains(contact_id) {
            return Err(DataSourceError::ApiError("mock contact failure".to_string()));
        }
        Ok(self.contacts.get(contact_id).cloned())
    }
}
