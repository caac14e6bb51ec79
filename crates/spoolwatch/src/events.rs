//! Observer registry for job, group, and analysis notifications.
//!
//! Subscribers register callbacks and are invoked synchronously, in
//! registration order, within the poll cycle that produced the event.
//! Delivery is fire-and-forget: zero subscribers is fine, and no subscriber
//! can fail an emit.

use spoolwatch_protocol::{DocumentAnalysis, GroupEvent, JobEvent};
use std::sync::{Arc, Mutex};
use tracing::debug;

type JobSubscriber = Arc<dyn Fn(&JobEvent) + Send + Sync>;
type GroupSubscriber = Arc<dyn Fn(&GroupEvent) + Send + Sync>;
type AnalysisSubscriber = Arc<dyn Fn(&DocumentAnalysis) + Send + Sync>;

/// Multicast hub connecting the monitor and grouping engine to event sinks.
///
/// # Lock invariant
///
/// The subscriber lists are locked only to register or to snapshot; emits
/// clone the list and invoke callbacks with no lock held, so a callback may
/// itself subscribe or query without deadlocking.
#[derive(Default)]
pub struct EventBus {
    job_subscribers: Mutex<Vec<JobSubscriber>>,
    group_subscribers: Mutex<Vec<GroupSubscriber>>,
    analysis_subscribers: Mutex<Vec<AnalysisSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for job create/modify/delete notifications.
    pub fn on_job_event(&self, subscriber: impl Fn(&JobEvent) + Send + Sync + 'static) {
        self.job_subscribers
            .lock()
            .expect("job subscriber list lock poisoned")
            .push(Arc::new(subscriber));
    }

    /// Register a callback for group lifecycle notifications.
    pub fn on_group_event(&self, subscriber: impl Fn(&GroupEvent) + Send + Sync + 'static) {
        self.group_subscribers
            .lock()
            .expect("group subscriber list lock poisoned")
            .push(Arc::new(subscriber));
    }

    /// Register a callback for per-job analysis results.
    pub fn on_analysis(&self, subscriber: impl Fn(&DocumentAnalysis) + Send + Sync + 'static) {
        self.analysis_subscribers
            .lock()
            .expect("analysis subscriber list lock poisoned")
            .push(Arc::new(subscriber));
    }

    pub fn emit_job(&self, event: &JobEvent) {
        debug!("Job event {} for {}", event.kind(), event.job().key());
        let subscribers = self
            .job_subscribers
            .lock()
            .expect("job subscriber list lock poisoned")
            .clone();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    pub fn emit_group(&self, event: &GroupEvent) {
        debug!("Group event {} for {}", event.kind(), event.group().group_id);
        let subscribers = self
            .group_subscribers
            .lock()
            .expect("group subscriber list lock poisoned")
            .clone();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    pub fn emit_analysis(&self, analysis: &DocumentAnalysis) {
        debug!("Analysis ready: {}", analysis);
        let subscribers = self
            .analysis_subscribers
            .lock()
            .expect("analysis subscriber list lock poisoned")
            .clone();
        for subscriber in subscribers {
            subscriber(analysis);
        }
    }
}
