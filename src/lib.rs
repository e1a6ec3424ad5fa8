pub mod compile;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use compile::{CompileJob, CompileQueue, CompileService, QueueTask, TaskReport, TaskState};
pub use config::{CliArgs, Config};
pub use datasource::{CiviCrmClient, DataSourceError, MembershipSource, MockMembershipSource};
pub use domain::{ContactId, ContactRecord, MemberId, MembershipRecord, MembershipStatus};
pub use engine::{LocaleResolver, RunMode, StatusSelection};
pub use error::AppError;
pub use orchestration::{InvoiceRun, RunError, RunStats};
