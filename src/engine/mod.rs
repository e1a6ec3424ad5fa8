//! Pure decision logic: eligibility, locale resolution and URL signing.

pub mod eligibility;
pub mod locale;
pub mod signer;

pub use eligibility::{needs_invoice, prefers_snail_mail, RunMode, StatusSelection, UsageError};
pub use locale::{Language, LetterLocale, LocaleResolver};
pub use signer::{project_hash, sign, UrlSigner};
