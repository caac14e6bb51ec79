//! Integration tests for the reconciliation pipeline.
//!
//! A scripted spool backend stands in for the OS spooler; tests mutate its
//! job table between polls and assert on the notifications the monitor and
//! grouping engine raise.

use async_trait::async_trait;
use chrono::{Datelike, Timelike, Utc};
use spoolwatch::protocol::{
    BackendError, DocumentAnalysis, DocumentType, JobControl, RawJobInfo, SubmittedTime,
};
use spoolwatch::{AppConfig, PrintJobMonitor, SpoolBackend};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Scripted backend
// ============================================================================

#[derive(Default)]
struct ScriptedBackend {
    jobs: Mutex<HashMap<String, Vec<RawJobInfo>>>,
    failing_printers: Mutex<HashSet<String>>,
    unfetchable: Mutex<HashSet<(String, u32)>>,
    control_log: Mutex<Vec<(String, u32, JobControl)>>,
}

impl ScriptedBackend {
    fn put_job(&self, printer: &str, raw: RawJobInfo) {
        let mut jobs = self.jobs.lock().unwrap();
        let printer_jobs = jobs.entry(printer.to_string()).or_default();
        printer_jobs.retain(|j| j.job_id != raw.job_id);
        printer_jobs.push(raw);
    }

    fn remove_job(&self, printer: &str, job_id: u32) {
        if let Some(printer_jobs) = self.jobs.lock().unwrap().get_mut(printer) {
            printer_jobs.retain(|j| j.job_id != job_id);
        }
    }

    fn set_failing(&self, printer: &str, failing: bool) {
        let mut failing_printers = self.failing_printers.lock().unwrap();
        if failing {
            failing_printers.insert(printer.to_string());
        } else {
            failing_printers.remove(printer);
        }
    }

    fn set_unfetchable(&self, printer: &str, job_id: u32, unfetchable: bool) {
        let mut set = self.unfetchable.lock().unwrap();
        if unfetchable {
            set.insert((printer.to_string(), job_id));
        } else {
            set.remove(&(printer.to_string(), job_id));
        }
    }
}

#[async_trait]
impl SpoolBackend for ScriptedBackend {
    async fn list_job_ids(&self, printer_name: &str) -> Result<Vec<u32>, BackendError> {
        if self.failing_printers.lock().unwrap().contains(printer_name) {
            return Err(BackendError::Enumerate {
                printer: printer_name.to_string(),
                reason: "access denied".to_string(),
            });
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .get(printer_name)
            .map(|jobs| jobs.iter().map(|j| j.job_id).collect())
            .unwrap_or_default())
    }

    async fn get_job_info(
        &self,
        printer_name: &str,
        job_id: u32,
    ) -> Result<Option<RawJobInfo>, BackendError> {
        if self
            .unfetchable
            .lock()
            .unwrap()
            .contains(&(printer_name.to_string(), job_id))
        {
            return Ok(None);
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .get(printer_name)
            .and_then(|jobs| jobs.iter().find(|j| j.job_id == job_id).cloned()))
    }

    async fn control_job(
        &self,
        printer_name: &str,
        job_id: u32,
        command: JobControl,
    ) -> Result<bool, BackendError> {
        self.control_log
            .lock()
            .unwrap()
            .push((printer_name.to_string(), job_id, command));
        Ok(true)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn submitted_secs_ago(secs: i64) -> SubmittedTime {
    let t = Utc::now() - chrono::Duration::seconds(secs);
    SubmittedTime {
        year: t.year() as u16,
        month: t.month() as u16,
        day: t.day() as u16,
        hour: t.hour() as u16,
        minute: t.minute() as u16,
        second: t.second() as u16,
    }
}

fn raw_job(job_id: u32, document: &str, owner: &str) -> RawJobInfo {
    RawJobInfo {
        job_id,
        document_name: document.to_string(),
        owner: owner.to_string(),
        machine_name: "\\\\DESK-01".to_string(),
        data_type: "RAW".to_string(),
        print_processor: "winprint".to_string(),
        driver_name: "Generic / Text Only".to_string(),
        status_bits: 0,
        priority: 1,
        total_pages: 4,
        pages_printed: 0,
        size: 4096,
        submitted: submitted_secs_ago(5),
    }
}

#[derive(Default)]
struct Recorded {
    job_events: Vec<String>,
    group_events: Vec<String>,
    analyses: Vec<DocumentAnalysis>,
}

fn setup(printers: &[&str]) -> (Arc<ScriptedBackend>, PrintJobMonitor, Arc<Mutex<Recorded>>) {
    let backend = Arc::new(ScriptedBackend::default());
    let mut config = AppConfig::default();
    config.printers.enabled_printers = printers.iter().map(|p| p.to_string()).collect();
    config.monitoring.polling_interval_secs = 3600;

    let monitor = PrintJobMonitor::new(Arc::clone(&backend) as Arc<dyn SpoolBackend>, &config);
    let recorded = Arc::new(Mutex::new(Recorded::default()));

    let sink = Arc::clone(&recorded);
    monitor.events().on_job_event(move |event| {
        sink.lock()
            .unwrap()
            .job_events
            .push(format!("{} {}", event.kind(), event.job().job_id));
    });
    let sink = Arc::clone(&recorded);
    monitor.events().on_group_event(move |event| {
        sink.lock()
            .unwrap()
            .group_events
            .push(event.kind().to_string());
    });
    let sink = Arc::clone(&recorded);
    monitor.events().on_analysis(move |analysis| {
        sink.lock().unwrap().analyses.push(analysis.clone());
    });

    (backend, monitor, recorded)
}

// ============================================================================
// Diffing
// ============================================================================

#[tokio::test]
async fn test_new_jobs_raise_created_and_analysis() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    backend.put_job("Office-1", raw_job(1, "report.pdf", "alice"));
    backend.put_job("Office-1", raw_job(2, "notes.txt", "bob"));

    monitor.poll_once().await;

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.job_events, vec!["CREATED 1", "CREATED 2"]);
    assert_eq!(recorded.analyses.len(), 2);
    assert_eq!(recorded.analyses[0].doc_type, DocumentType::Pdf);
    assert_eq!(recorded.analyses[1].doc_type, DocumentType::Text);
}

#[tokio::test]
async fn test_identical_second_poll_is_silent() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    backend.put_job("Office-1", raw_job(1, "report.pdf", "alice"));

    monitor.poll_once().await;
    let after_first = recorded.lock().unwrap().job_events.len();
    monitor.poll_once().await;

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.job_events.len(), after_first);
    assert_eq!(recorded.analyses.len(), 1);
}

#[tokio::test]
async fn test_modified_only_for_significant_fields() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    let mut job = raw_job(1, "report.pdf", "alice");
    backend.put_job("Office-1", job.clone());
    monitor.poll_once().await;

    // Insignificant changes: no event.
    job.machine_name = "\\\\DESK-02".to_string();
    job.size = 9999;
    backend.put_job("Office-1", job.clone());
    monitor.poll_once().await;
    assert_eq!(recorded.lock().unwrap().job_events, vec!["CREATED 1"]);

    // Progress counts.
    job.pages_printed = 2;
    backend.put_job("Office-1", job.clone());
    monitor.poll_once().await;
    assert_eq!(
        recorded.lock().unwrap().job_events,
        vec!["CREATED 1", "MODIFIED 1"]
    );

    // Status change counts too - and a modified job is not re-analyzed.
    job.status_bits = spoolwatch::protocol::types::STATUS_BIT_PAUSED;
    backend.put_job("Office-1", job.clone());
    monitor.poll_once().await;
    let recorded = recorded.lock().unwrap();
    assert_eq!(
        recorded.job_events,
        vec!["CREATED 1", "MODIFIED 1", "MODIFIED 1"]
    );
    assert_eq!(recorded.analyses.len(), 1);
}

#[tokio::test]
async fn test_absent_job_raises_exactly_one_deleted() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    backend.put_job("Office-1", raw_job(1, "report.pdf", "alice"));
    monitor.poll_once().await;

    backend.remove_job("Office-1", 1);
    monitor.poll_once().await;
    monitor.poll_once().await;

    let deleted = recorded
        .lock()
        .unwrap()
        .job_events
        .iter()
        .filter(|e| e.starts_with("DELETED"))
        .count();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_raced_fetch_is_skipped_not_deleted() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    let mut job = raw_job(1, "report.pdf", "alice");
    backend.put_job("Office-1", job.clone());
    monitor.poll_once().await;

    // Id still enumerated, record no longer fetchable: neither a deletion
    // nor a modification for this cycle.
    backend.set_unfetchable("Office-1", 1, true);
    monitor.poll_once().await;
    assert_eq!(recorded.lock().unwrap().job_events, vec!["CREATED 1"]);

    // Still tracked: when the record comes back changed, it is Modified,
    // not re-Created.
    backend.set_unfetchable("Office-1", 1, false);
    job.pages_printed = 4;
    backend.put_job("Office-1", job);
    monitor.poll_once().await;
    assert_eq!(
        recorded.lock().unwrap().job_events,
        vec!["CREATED 1", "MODIFIED 1"]
    );
}

#[tokio::test]
async fn test_enumeration_failure_is_isolated_per_printer() {
    let (backend, monitor, recorded) = setup(&["Flaky", "Steady"]);
    backend.put_job("Flaky", raw_job(1, "a.pdf", "alice"));
    backend.put_job("Steady", raw_job(1, "b.pdf", "bob"));
    monitor.poll_once().await;
    assert_eq!(recorded.lock().unwrap().job_events.len(), 2);

    // Fail-open: the flaky printer reads as empty, so its job is swept;
    // the steady printer is untouched.
    backend.set_failing("Flaky", true);
    monitor.poll_once().await;

    {
        let recorded = recorded.lock().unwrap();
        let deleted: Vec<&String> = recorded
            .job_events
            .iter()
            .filter(|e| e.starts_with("DELETED"))
            .collect();
        assert_eq!(deleted.len(), 1);
    }

    // Recovery re-creates the job on the next successful cycle.
    backend.set_failing("Flaky", false);
    monitor.poll_once().await;
    let created = recorded
        .lock()
        .unwrap()
        .job_events
        .iter()
        .filter(|e| e.starts_with("CREATED"))
        .count();
    assert_eq!(created, 3);
}

// ============================================================================
// Grouping through the loop
// ============================================================================

#[tokio::test]
async fn test_jobs_sharing_identity_form_one_group() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    backend.put_job("Office-1", raw_job(1, "report.pdf", "alice"));
    backend.put_job("Office-1", raw_job(2, "report.pdf", "alice"));
    backend.put_job("Office-1", raw_job(3, "other.pdf", "alice"));

    monitor.poll_once().await;

    let groups = monitor.active_groups();
    assert_eq!(groups.len(), 2);
    let report = groups
        .iter()
        .find(|g| g.document_name == "report.pdf")
        .unwrap();
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.total_pages(), 8);

    let recorded = recorded.lock().unwrap();
    let created = recorded
        .group_events
        .iter()
        .filter(|e| *e == "GROUP_CREATED")
        .count();
    assert_eq!(created, 2);
}

#[tokio::test]
async fn test_idle_group_is_evicted_by_the_cycle_cleanup() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    monitor.update_group_timeout(Duration::from_secs(60));

    let mut stale = raw_job(1, "old.pdf", "alice");
    stale.submitted = submitted_secs_ago(300);
    backend.put_job("Office-1", stale);

    // Cleanup runs at the end of the same cycle that created the group.
    monitor.poll_once().await;

    assert!(monitor.active_groups().is_empty());
    let recorded = recorded.lock().unwrap();
    assert!(recorded
        .group_events
        .contains(&"GROUP_CREATED".to_string()));
}

// ============================================================================
// Lifecycle and control
// ============================================================================

#[tokio::test]
async fn test_background_loop_polls_immediately_on_start() {
    let (backend, monitor, recorded) = setup(&["Office-1"]);
    backend.put_job("Office-1", raw_job(1, "report.pdf", "alice"));

    assert!(monitor.start().await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(monitor.stop().await);

    assert_eq!(recorded.lock().unwrap().job_events, vec!["CREATED 1"]);
    assert!(!monitor.is_monitoring());
}

#[tokio::test]
async fn test_control_command_reaches_backend() {
    let (backend, monitor, _recorded) = setup(&["Office-1"]);

    assert!(monitor.control_job("Office-1", 7, JobControl::Pause).await);

    let log = backend.control_log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], ("Office-1".to_string(), 7, JobControl::Pause));
}

#[tokio::test]
async fn test_group_timeout_query_reflects_updates() {
    let (_backend, monitor, _recorded) = setup(&["Office-1"]);
    assert_eq!(monitor.group_timeout(), Duration::from_secs(3600));
    monitor.update_group_timeout(Duration::from_secs(120));
    assert_eq!(monitor.group_timeout(), Duration::from_secs(120));
}
