//! Observed-job payload types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Status decoding
// ============================================================================

/// Spooler status mask bits carried by raw job records.
pub const STATUS_BIT_PAUSED: u32 = 0x0000_0100;
pub const STATUS_BIT_ERROR: u32 = 0x0000_0200;
pub const STATUS_BIT_DELETED: u32 = 0x0000_0400;
pub const STATUS_BIT_COMPLETED: u32 = 0x0000_1000;

/// Print job status - exactly one holds at a time.
/// This is the CANONICAL definition - use this everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job is spooling or printing (the default when no other bit is set)
    #[default]
    Printing,
    /// Job is paused
    Paused,
    /// Job is in an error state
    Error,
    /// Job is pending deletion
    Deleted,
    /// Job has printed completely
    Completed,
}

impl JobStatus {
    /// Decode a spooler status bitmask.
    ///
    /// Fixed precedence, first matching bit wins:
    /// Paused > Error > Deleted > Completed > Printing.
    pub fn from_bits(bits: u32) -> Self {
        if bits & STATUS_BIT_PAUSED != 0 {
            JobStatus::Paused
        } else if bits & STATUS_BIT_ERROR != 0 {
            JobStatus::Error
        } else if bits & STATUS_BIT_DELETED != 0 {
            JobStatus::Deleted
        } else if bits & STATUS_BIT_COMPLETED != 0 {
            JobStatus::Completed
        } else {
            JobStatus::Printing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Printing => "PRINTING",
            JobStatus::Paused => "PAUSED",
            JobStatus::Error => "ERROR",
            JobStatus::Deleted => "DELETED",
            JobStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Deleted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Control command routed through the monitor to the spool backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobControl {
    Pause,
    Resume,
    Cancel,
}

impl JobControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobControl::Pause => "PAUSE",
            JobControl::Resume => "RESUME",
            JobControl::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for JobControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Job records
// ============================================================================

/// Identity of a tracked job. Job ids are only unique per printer, so the
/// pair is the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub printer_name: String,
    pub job_id: u32,
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.printer_name, self.job_id)
    }
}

/// Submission time as the spooler reports it - a bare field group, not a
/// timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTime {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

impl SubmittedTime {
    /// Collapse the field group into a single UTC timestamp.
    ///
    /// Out-of-range fields (a zeroed struct from a failed marshal, Feb 30)
    /// fall back to the epoch rather than failing record construction.
    pub fn to_utc(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(
            self.year as i32,
            self.month as u32,
            self.day as u32,
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Raw job record as returned by the spool backend, before canonicalization.
///
/// Status is still a bitmask and the submission time is still a field group;
/// [`PrintJob::from_raw`] maps both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJobInfo {
    pub job_id: u32,
    pub document_name: String,
    pub owner: String,
    pub machine_name: String,
    pub data_type: String,
    pub print_processor: String,
    pub driver_name: String,
    pub status_bits: u32,
    pub priority: u32,
    pub total_pages: u32,
    pub pages_printed: u32,
    pub size: u64,
    pub submitted: SubmittedTime,
}

/// One observed print job in canonical form.
///
/// Created when a poll cycle first observes the job, replaced in place when
/// a significant field changes, removed when the job id disappears from its
/// printer's enumeration. Owned exclusively by the monitor's tracked table;
/// groups hold snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub job_id: u32,
    pub document_name: String,
    pub owner: String,
    pub printer_name: String,
    pub machine_name: String,
    pub total_pages: u32,
    pub pages_printed: u32,
    pub size: u64,
    pub priority: u32,
    pub submission_time: DateTime<Utc>,
    pub data_type: String,
    pub print_processor: String,
    pub driver_name: String,
    pub status: JobStatus,
}

impl PrintJob {
    /// Build the canonical record from a backend's raw record.
    pub fn from_raw(printer_name: &str, raw: &RawJobInfo) -> Self {
        Self {
            job_id: raw.job_id,
            document_name: raw.document_name.clone(),
            owner: raw.owner.clone(),
            printer_name: printer_name.to_string(),
            machine_name: raw.machine_name.clone(),
            total_pages: raw.total_pages,
            pages_printed: raw.pages_printed,
            size: raw.size,
            priority: raw.priority,
            submission_time: raw.submitted.to_utc(),
            data_type: raw.data_type.clone(),
            print_processor: raw.print_processor.clone(),
            driver_name: raw.driver_name.clone(),
            status: JobStatus::from_bits(raw.status_bits),
        }
    }

    /// The tracked-table key for this job.
    pub fn key(&self) -> JobKey {
        JobKey {
            printer_name: self.printer_name.clone(),
            job_id: self.job_id,
        }
    }

    /// Whether a re-observed record counts as a modification.
    ///
    /// Only status, pages printed, total pages, and priority are
    /// significant; changes to any other field do not raise `Modified`.
    pub fn differs_from(&self, other: &PrintJob) -> bool {
        self.status != other.status
            || self.pages_printed != other.pages_printed
            || self.total_pages != other.total_pages
            || self.priority != other.priority
    }
}

// ============================================================================
// Document groups
// ============================================================================

/// Generated identifier for a document group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Create a new random group ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical document, possibly spanning multiple spooled jobs that share
/// document name and owner (re-submissions, multi-copy jobs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGroup {
    pub group_id: GroupId,
    pub document_name: String,
    pub owner: String,
    pub created_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    pub jobs: Vec<PrintJob>,
}

impl DocumentGroup {
    /// Create a group seeded with its first member.
    pub fn new(group_id: GroupId, job: PrintJob) -> Self {
        Self {
            group_id,
            document_name: job.document_name.clone(),
            owner: job.owner.clone(),
            created_time: job.submission_time,
            last_modified_time: job.submission_time,
            jobs: vec![job],
        }
    }

    /// Append a member and recompute the min/max submission times across
    /// all members.
    pub fn add_job(&mut self, job: PrintJob) {
        self.jobs.push(job);
        if let Some(min) = self.jobs.iter().map(|j| j.submission_time).min() {
            self.created_time = min;
        }
        if let Some(max) = self.jobs.iter().map(|j| j.submission_time).max() {
            self.last_modified_time = max;
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.jobs.iter().map(|j| j.total_pages).sum()
    }

    pub fn pages_printed(&self) -> u32 {
        self.jobs.iter().map(|j| j.pages_printed).sum()
    }

    /// Aggregate status: Error if any member errored, Completed if every
    /// member completed, Printing otherwise.
    pub fn status(&self) -> JobStatus {
        if self.jobs.iter().any(|j| j.status == JobStatus::Error) {
            JobStatus::Error
        } else if !self.jobs.is_empty() && self.jobs.iter().all(|j| j.status == JobStatus::Completed)
        {
            JobStatus::Completed
        } else {
            JobStatus::Printing
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == JobStatus::Completed
    }
}

// ============================================================================
// Document analysis
// ============================================================================

/// Heuristic document type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    #[default]
    Unknown,
    Text,
    Image,
    Mixed,
    Pdf,
    Office,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Unknown => "UNKNOWN",
            DocumentType::Text => "TEXT",
            DocumentType::Image => "IMAGE",
            DocumentType::Mixed => "MIXED",
            DocumentType::Pdf => "PDF",
            DocumentType::Office => "OFFICE",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-job classification result. Immutable once produced; delivered once
/// per newly observed job and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_name: String,
    pub doc_type: DocumentType,
    pub page_count: u32,
    pub file_size: u64,
    pub file_extension: String,
    pub is_color: bool,
    pub is_duplex: bool,
    pub paper_size: String,
    pub orientation: String,
    pub copies: u32,
    pub printer_name: String,
    pub print_processor: String,
    pub driver_name: String,
    pub metadata: HashMap<String, String>,
    pub analysis_time: DateTime<Utc>,
}

impl fmt::Display for DocumentAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} pages, {} bytes)",
            self.document_name, self.doc_type, self.page_count, self.file_size
        )
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Job-level notification raised by the monitor's diff pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "job")]
pub enum JobEvent {
    Created(PrintJob),
    Modified(PrintJob),
    Deleted(PrintJob),
}

impl JobEvent {
    pub fn job(&self) -> &PrintJob {
        match self {
            JobEvent::Created(job) | JobEvent::Modified(job) | JobEvent::Deleted(job) => job,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Created(_) => "CREATED",
            JobEvent::Modified(_) => "MODIFIED",
            JobEvent::Deleted(_) => "DELETED",
        }
    }
}

/// Group-level notification raised by the grouping engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "group")]
pub enum GroupEvent {
    Created(DocumentGroup),
    Modified(DocumentGroup),
    Completed(DocumentGroup),
}

impl GroupEvent {
    pub fn group(&self) -> &DocumentGroup {
        match self {
            GroupEvent::Created(group)
            | GroupEvent::Modified(group)
            | GroupEvent::Completed(group) => group,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GroupEvent::Created(_) => "GROUP_CREATED",
            GroupEvent::Modified(_) => "GROUP_MODIFIED",
            GroupEvent::Completed(_) => "GROUP_COMPLETED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u32, status: JobStatus) -> PrintJob {
        PrintJob {
            job_id: id,
            document_name: "report.pdf".to_string(),
            owner: "alice".to_string(),
            printer_name: "Office-1".to_string(),
            machine_name: "\\\\DESK-01".to_string(),
            total_pages: 4,
            pages_printed: 0,
            size: 4096,
            priority: 1,
            submission_time: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            data_type: "RAW".to_string(),
            print_processor: "winprint".to_string(),
            driver_name: "Generic".to_string(),
            status,
        }
    }

    #[test]
    fn test_status_precedence_paused_wins() {
        let bits = STATUS_BIT_PAUSED | STATUS_BIT_ERROR | STATUS_BIT_COMPLETED;
        assert_eq!(JobStatus::from_bits(bits), JobStatus::Paused);
    }

    #[test]
    fn test_status_precedence_order() {
        assert_eq!(
            JobStatus::from_bits(STATUS_BIT_ERROR | STATUS_BIT_DELETED),
            JobStatus::Error
        );
        assert_eq!(
            JobStatus::from_bits(STATUS_BIT_DELETED | STATUS_BIT_COMPLETED),
            JobStatus::Deleted
        );
        assert_eq!(
            JobStatus::from_bits(STATUS_BIT_COMPLETED),
            JobStatus::Completed
        );
        assert_eq!(JobStatus::from_bits(0), JobStatus::Printing);
    }

    #[test]
    fn test_submitted_time_maps_to_utc() {
        let submitted = SubmittedTime {
            year: 2024,
            month: 3,
            day: 1,
            hour: 9,
            minute: 30,
            second: 15,
        };
        assert_eq!(
            submitted.to_utc(),
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 15).unwrap()
        );
    }

    #[test]
    fn test_submitted_time_invalid_falls_back_to_epoch() {
        let zeroed = SubmittedTime::default();
        assert_eq!(zeroed.to_utc(), DateTime::UNIX_EPOCH);

        let feb_30 = SubmittedTime {
            year: 2024,
            month: 2,
            day: 30,
            ..Default::default()
        };
        assert_eq!(feb_30.to_utc(), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_differs_from_significant_fields_only() {
        let base = job(1, JobStatus::Printing);

        let mut progressed = base.clone();
        progressed.pages_printed = 2;
        assert!(progressed.differs_from(&base));

        let mut reprioritized = base.clone();
        reprioritized.priority = 99;
        assert!(reprioritized.differs_from(&base));

        // Renames and size changes are not significant.
        let mut renamed = base.clone();
        renamed.document_name = "other.pdf".to_string();
        renamed.size = 9999;
        assert!(!renamed.differs_from(&base));
    }

    #[test]
    fn test_group_aggregates() {
        let first = job(1, JobStatus::Completed);
        let mut group = DocumentGroup::new(GroupId::new(), first.clone());
        assert_eq!(group.created_time, first.submission_time);
        assert_eq!(group.status(), JobStatus::Completed);

        let mut second = job(2, JobStatus::Printing);
        second.submission_time = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        second.pages_printed = 3;
        group.add_job(second.clone());

        assert_eq!(group.total_pages(), 8);
        assert_eq!(group.pages_printed(), 3);
        assert_eq!(group.created_time, first.submission_time);
        assert_eq!(group.last_modified_time, second.submission_time);
        assert_eq!(group.status(), JobStatus::Printing);

        let mut errored = job(3, JobStatus::Error);
        errored.submission_time = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        group.add_job(errored);

        // Earliest member pulls created_time back; any error dominates.
        assert_eq!(
            group.created_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(group.status(), JobStatus::Error);
    }

    #[test]
    fn test_from_raw_maps_bits_and_time() {
        let raw = RawJobInfo {
            job_id: 7,
            document_name: "memo.docx".to_string(),
            owner: "bob".to_string(),
            machine_name: "\\\\DESK-02".to_string(),
            data_type: "NT EMF 1.008".to_string(),
            print_processor: "winprint".to_string(),
            driver_name: "HP Universal".to_string(),
            status_bits: STATUS_BIT_PAUSED,
            priority: 3,
            total_pages: 2,
            pages_printed: 1,
            size: 1024,
            submitted: SubmittedTime {
                year: 2024,
                month: 6,
                day: 5,
                hour: 14,
                minute: 0,
                second: 0,
            },
        };

        let job = PrintJob::from_raw("Office-1", &raw);
        assert_eq!(job.printer_name, "Office-1");
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(
            job.submission_time,
            Utc.with_ymd_and_hms(2024, 6, 5, 14, 0, 0).unwrap()
        );
        assert_eq!(
            job.key(),
            JobKey {
                printer_name: "Office-1".to_string(),
                job_id: 7
            }
        );
    }
}
