//! Operator commands besides `deploy`.
//!
//! Each command takes its transports by reference and returns a serializable
//! report; rendering is left to the frontend.

pub mod backup;
pub mod check;
pub mod init;
pub mod validate;

pub use backup::{BackupCommand, BackupOptions, BackupReport, BackupStatus};
pub use check::{CheckCommand, CheckReport, PreflightIssue, Severity};
pub use init::{InitCommand, InitOptions, InitReport};
pub use validate::{ValidateCommand, ValidateOptions, ValidateReport};
