//! Error types for the spool backend seam.

use thiserror::Error;

/// Failure reported by the spool backend.
///
/// Backend errors are recovered locally by the monitor: the affected
/// printer's data degrades for one poll cycle and the loop continues. They
/// never cross the component boundary to event sinks. A job that disappears
/// between enumeration and fetch is NOT an error - backends signal that with
/// `Ok(None)` from `get_job_info`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to open printer '{printer}': {reason}")]
    PrinterOpen { printer: String, reason: String },

    #[error("failed to enumerate jobs on printer '{printer}': {reason}")]
    Enumerate { printer: String, reason: String },

    #[error("failed to fetch job {job_id} on printer '{printer}': {reason}")]
    JobFetch {
        printer: String,
        job_id: u32,
        reason: String,
    },

    #[error("control command failed for job {job_id} on printer '{printer}': {reason}")]
    Control {
        printer: String,
        job_id: u32,
        reason: String,
    },
}

impl BackendError {
    /// The printer the failure belongs to.
    pub fn printer(&self) -> &str {
        match self {
            BackendError::PrinterOpen { printer, .. }
            | BackendError::Enumerate { printer, .. }
            | BackendError::JobFetch { printer, .. }
            | BackendError::Control { printer, .. } => printer,
        }
    }
}
