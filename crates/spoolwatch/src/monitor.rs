//! Print job monitor loop.
//!
//! The orchestrator: on a fixed interval, enumerates every monitored
//! printer, diffs the current job set against the tracked table, raises
//! create/modify/delete notifications, feeds new jobs to the classifier and
//! the grouping engine, and triggers group eviction. Owns the cancellable
//! background task and the running/stopped state machine.

use crate::analyzer;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::grouping::GroupingEngine;
use crate::spooler::SpoolBackend;
use spoolwatch_protocol::{DocumentGroup, JobControl, JobEvent, JobKey, PrintJob};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Background task plumbing for one monitoring run. Rebuilt from scratch on
/// every `start()` - cancellation is single-shot.
struct LoopHandle {
    shutdown_tx: mpsc::Sender<()>,
    join_handle: JoinHandle<()>,
}

/// Watches a host's print spooler and reconciles its flat job list into
/// tracked jobs, document groups, and analysis results.
pub struct PrintJobMonitor {
    inner: Arc<MonitorInner>,
    /// Present while a monitoring run is active. tokio mutex: `stop()`
    /// awaits the loop's JoinHandle while holding it.
    loop_handle: tokio::sync::Mutex<Option<LoopHandle>>,
}

struct MonitorInner {
    backend: Arc<dyn SpoolBackend>,
    events: Arc<EventBus>,
    grouping: Arc<GroupingEngine>,
    printers: Vec<String>,
    poll_interval: Duration,
    /// Tracked-job table - the canonical "what we believe is spooled".
    /// INVARIANT: locked only for brief map operations, never across an
    /// await or a subscriber callback.
    tracked: Mutex<HashMap<JobKey, PrintJob>>,
    running: AtomicBool,
}

impl PrintJobMonitor {
    /// Build a monitor over `backend` using the printer list, poll
    /// interval, and group timeout from `config`.
    pub fn new(backend: Arc<dyn SpoolBackend>, config: &AppConfig) -> Self {
        let events = Arc::new(EventBus::new());
        let grouping = Arc::new(GroupingEngine::new(
            Arc::clone(&events),
            config.group_timeout(),
        ));
        Self {
            inner: Arc::new(MonitorInner {
                backend,
                events,
                grouping,
                printers: config.printers.monitored(),
                poll_interval: config.poll_interval(),
                tracked: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
            loop_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Subscription surface for event sinks.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    /// Whether the background loop is active.
    pub fn is_monitoring(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the active document groups.
    pub fn active_groups(&self) -> Vec<DocumentGroup> {
        self.inner.grouping.active_groups()
    }

    /// The effective group idle timeout.
    pub fn group_timeout(&self) -> Duration {
        self.inner.grouping.group_timeout()
    }

    /// Replace the group idle timeout for future cleanup passes.
    pub fn update_group_timeout(&self, timeout: Duration) {
        self.inner.grouping.update_group_timeout(timeout);
    }

    /// Launch the background poll loop.
    ///
    /// Returns `true` when a new run was started. Calling while already
    /// running is not an error: it logs a warning, leaves the running loop
    /// untouched, and returns `false`.
    pub async fn start(&self) -> bool {
        let mut handle = self.loop_handle.lock().await;
        if handle.is_some() {
            warn!("Monitoring already started, ignoring start request");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let inner = Arc::clone(&self.inner);
        inner.running.store(true, Ordering::SeqCst);
        let join_handle = tokio::spawn(run_loop(inner, shutdown_rx));
        *handle = Some(LoopHandle {
            shutdown_tx,
            join_handle,
        });

        info!(
            "Print job monitoring started ({} printers, {:?} interval)",
            self.inner.printers.len(),
            self.inner.poll_interval
        );
        true
    }

    /// Signal the loop to stop and wait until it has fully exited.
    ///
    /// Returns `true` when a running loop was stopped. Calling while
    /// already stopped logs a warning and returns `false`.
    pub async fn stop(&self) -> bool {
        let taken = self.loop_handle.lock().await.take();
        let Some(handle) = taken else {
            warn!("Monitoring already stopped, ignoring stop request");
            return false;
        };

        // The loop may already have exited; a dead receiver is fine.
        let _ = handle.shutdown_tx.send(()).await;
        if let Err(e) = handle.join_handle.await {
            error!("Monitor loop task failed to join cleanly: {e}");
        }
        self.inner.running.store(false, Ordering::SeqCst);
        info!("Print job monitoring stopped");
        true
    }

    /// Run one reconciliation pass immediately, outside the background
    /// cadence. The background loop calls exactly this once per interval.
    pub async fn poll_once(&self) {
        self.inner.poll_all().await;
    }

    /// Route a pause/resume/cancel command to the spool backend, bypassing
    /// grouping. Returns the backend's success flag; a backend error reads
    /// as `false`.
    pub async fn control_job(&self, printer_name: &str, job_id: u32, command: JobControl) -> bool {
        match self
            .inner
            .backend
            .control_job(printer_name, job_id, command)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    "Spooler refused {} for job {} on '{}'",
                    command, job_id, printer_name
                );
                false
            }
            Err(e) => {
                warn!("{} failed for job {} on '{}': {e}", command, job_id, printer_name);
                false
            }
        }
    }
}

/// The background task: poll, interruptible sleep, repeat until cancelled.
async fn run_loop(inner: Arc<MonitorInner>, mut shutdown_rx: mpsc::Receiver<()>) {
    info!("Monitor loop entered");
    loop {
        // Cancellation is checked both here and during the sleep, so a stop
        // request never waits on a full extra cycle.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        // One bad cycle must not kill monitoring: the poll runs in its own
        // task so a panic surfaces here as a JoinError instead of tearing
        // the loop down.
        let poll_inner = Arc::clone(&inner);
        if let Err(e) = tokio::spawn(async move { poll_inner.poll_all().await }).await {
            error!("Poll cycle aborted: {e}");
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(inner.poll_interval) => {}
        }
    }
    inner.running.store(false, Ordering::SeqCst);
    info!("Monitor loop exited");
}

impl MonitorInner {
    /// One full poll cycle over every monitored printer, then one group
    /// eviction pass. Never fails: per-printer trouble is contained in
    /// `poll_printer`.
    async fn poll_all(&self) {
        for printer in &self.printers {
            self.poll_printer(printer).await;
        }
        self.grouping.cleanup_old_groups();
    }

    /// Reconcile one printer's job set against the tracked table.
    ///
    /// Fail-open on enumeration errors: the printer reads as empty for this
    /// cycle, so its tracked jobs are swept as deleted. Known risk - a
    /// momentarily unreachable printer can spuriously report its jobs as
    /// gone - kept to match the fail-open contract.
    async fn poll_printer(&self, printer: &str) {
        let job_ids = match self.backend.list_job_ids(printer).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Enumeration failed on printer '{printer}', treating as empty: {e}");
                Vec::new()
            }
        };

        // Every enumerated id counts as present this cycle, even when the
        // record fetch fails below - only absence from this set deletes.
        let present: HashSet<u32> = job_ids.iter().copied().collect();

        for job_id in job_ids {
            let raw = match self.backend.get_job_info(printer, job_id).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!("Job {job_id} on '{printer}' vanished between enumerate and fetch");
                    continue;
                }
                Err(e) => {
                    warn!("Fetch failed for job {job_id} on '{printer}', skipping this cycle: {e}");
                    continue;
                }
            };

            let job = PrintJob::from_raw(printer, &raw);
            self.reconcile_job(job);
        }

        self.sweep_absent(printer, &present);
    }

    /// Insert or update one observed job, emitting the matching event.
    fn reconcile_job(&self, job: PrintJob) {
        let key = job.key();
        let change = {
            let mut tracked = self.tracked.lock().expect("tracked table lock poisoned");
            let change = match tracked.get(&key) {
                None => Some(JobEvent::Created(job.clone())),
                Some(existing) if job.differs_from(existing) => {
                    Some(JobEvent::Modified(job.clone()))
                }
                Some(_) => None,
            };
            if change.is_some() {
                tracked.insert(key, job);
            }
            change
        };

        match change {
            Some(JobEvent::Created(job)) => {
                self.events.emit_job(&JobEvent::Created(job.clone()));
                self.grouping.process_new_job(job.clone());
                let analysis = analyzer::analyze_job(&job);
                self.events.emit_analysis(&analysis);
            }
            Some(event) => self.events.emit_job(&event),
            None => {}
        }
    }

    /// Remove every tracked job for `printer` whose id was not enumerated
    /// this cycle, emitting `Deleted` for each.
    fn sweep_absent(&self, printer: &str, present: &HashSet<u32>) {
        let removed: Vec<PrintJob> = {
            let mut tracked = self.tracked.lock().expect("tracked table lock poisoned");
            let gone: Vec<JobKey> = tracked
                .keys()
                .filter(|key| key.printer_name == printer && !present.contains(&key.job_id))
                .cloned()
                .collect();
            gone.into_iter()
                .filter_map(|key| tracked.remove(&key))
                .collect()
        };

        for job in removed {
            self.events.emit_job(&JobEvent::Deleted(job));
        }
    }
}
