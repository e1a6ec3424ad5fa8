//! Domain types for the invoice letter run.
//!
//! This module provides:
//! - Identifier primitives: ContactId, MemberId
//! - Membership and contact records with lenient CRM deserialization
//! - Status and communication-method code tables

pub mod membership;
pub mod primitives;

pub use membership::{CommunicationMethod, ContactRecord, MembershipRecord, MembershipStatus};
pub use primitives::{ContactId, MemberId};
