//! Canonical data model for the spoolwatch observation core.
//!
//! Everything the monitor, grouping engine, and classifier exchange lives
//! here: observed job records, status decoding, document groups, analysis
//! results, and the notification payloads delivered to event sinks. The
//! crate is pure data - no I/O, no spooler access.

pub mod defaults;
pub mod error;
pub mod types;

// Re-export types for convenience
pub use types::{
    DocumentAnalysis,
    DocumentGroup,
    DocumentType,
    GroupEvent,
    GroupId,
    JobControl,
    JobEvent,
    JobKey,
    JobStatus,
    PrintJob,
    RawJobInfo,
    SubmittedTime,
};

pub use error::BackendError;
