//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-row writes run in a single
//! transaction.

pub mod submission_repo;
pub mod template_repo;

pub use submission_repo::SubmissionRepo;
pub use template_repo::TemplateRepo;
