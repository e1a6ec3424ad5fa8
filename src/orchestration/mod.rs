pub mod driver;
pub mod pages;

pub use driver::{InvoiceRun, RunError, RunStats};
pub use pages::{Page, Pages, PaginationCursor};
