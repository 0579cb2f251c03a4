pub mod backend;
pub mod cancel;
pub mod cli;
pub mod diff;
pub mod error;
pub mod git;
pub mod model;
pub mod query;
pub mod report;
pub mod util;

pub use backend::{Backend, MemoryRepo};
pub use error::{ReportError, Result};
