//! The opaque seam between the observation core and the OS print spooler.
//!
//! The core never touches the spooler call surface directly - enumerating,
//! fetching, and controlling jobs all go through [`SpoolBackend`]. Per-OS
//! adapters (handle open/marshal/close plumbing) live outside this crate;
//! tests drive the core with scripted implementations.

use async_trait::async_trait;
use spoolwatch_protocol::{BackendError, JobControl, RawJobInfo};

/// Low-level spooler access for one host.
#[async_trait]
pub trait SpoolBackend: Send + Sync {
    /// Enumerate the ids of all jobs currently spooled on a printer.
    ///
    /// Fails with [`BackendError`] when the printer cannot be opened. The
    /// monitor recovers from this locally (the printer reads as empty for
    /// the cycle); implementations should not retry internally.
    async fn list_job_ids(&self, printer_name: &str) -> Result<Vec<u32>, BackendError>;

    /// Fetch the full raw record for one job.
    ///
    /// `Ok(None)` means the job disappeared between enumeration and fetch -
    /// a raced deletion, not an error.
    async fn get_job_info(
        &self,
        printer_name: &str,
        job_id: u32,
    ) -> Result<Option<RawJobInfo>, BackendError>;

    /// Pause, resume, or cancel a job. Returns the spooler's success flag;
    /// callers must check it rather than assume success.
    async fn control_job(
        &self,
        printer_name: &str,
        job_id: u32,
        command: JobControl,
    ) -> Result<bool, BackendError>;
}
