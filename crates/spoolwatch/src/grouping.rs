//! Document grouping engine.
//!
//! Folds individual spooled jobs into logical document groups keyed by
//! `(document name, owner)` and evicts groups idle past a configurable
//! timeout. The key is an exact, case-sensitive string match - a heuristic
//! for "same document", not a hard identity guarantee.

use crate::events::EventBus;
use spoolwatch_protocol::{DocumentGroup, GroupEvent, GroupId, PrintJob};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

type GroupKey = (String, String);

/// Tracks the set of active document groups.
///
/// # Lock invariant
///
/// `groups` and `group_timeout` are locked only for brief map/field
/// operations, never across an await or a subscriber callback. The map lock
/// makes each append a single logical unit: two jobs racing into the same
/// key can never interleave partial member-list updates.
pub struct GroupingEngine {
    events: Arc<EventBus>,
    groups: Mutex<HashMap<GroupKey, DocumentGroup>>,
    group_timeout: Mutex<Duration>,
}

impl GroupingEngine {
    pub fn new(events: Arc<EventBus>, group_timeout: Duration) -> Self {
        Self {
            events,
            groups: Mutex::new(HashMap::new()),
            group_timeout: Mutex::new(group_timeout),
        }
    }

    /// Fold a newly observed job into its document group.
    ///
    /// Resolves or creates the group for the job's key, appends the member,
    /// and emits `GroupCreated` (for a fresh group), then `GroupModified`,
    /// then `GroupCompleted` when every member has now completed. Returns a
    /// snapshot of the group after the append.
    pub fn process_new_job(&self, job: PrintJob) -> DocumentGroup {
        let key = group_key(&job);

        let (snapshot, created) = {
            let mut groups = self.groups.lock().expect("group table lock poisoned");
            match groups.get_mut(&key) {
                Some(group) => {
                    group.add_job(job);
                    (group.clone(), false)
                }
                None => {
                    let group = DocumentGroup::new(GroupId::new(), job);
                    info!(
                        "Created group {} for document '{}' owned by '{}'",
                        group.group_id, group.document_name, group.owner
                    );
                    groups.insert(key, group.clone());
                    (group, true)
                }
            }
        };

        if created {
            self.events.emit_group(&GroupEvent::Created(snapshot.clone()));
        }
        self.events.emit_group(&GroupEvent::Modified(snapshot.clone()));
        if snapshot.is_complete() {
            self.events.emit_group(&GroupEvent::Completed(snapshot.clone()));
        }

        snapshot
    }

    /// Evict every group whose last activity is older than the timeout.
    ///
    /// Pure idle-timeout policy: completion state is irrelevant, and no
    /// notification is emitted for evicted groups.
    pub fn cleanup_old_groups(&self) {
        let timeout = chrono::Duration::from_std(self.group_timeout())
            .unwrap_or_else(|_| chrono::Duration::max_value());
        let cutoff = chrono::Utc::now() - timeout;

        let mut groups = self.groups.lock().expect("group table lock poisoned");
        let before = groups.len();
        groups.retain(|_, group| {
            let keep = group.last_modified_time >= cutoff;
            if !keep {
                info!(
                    "Evicted idle group {} for document '{}'",
                    group.group_id, group.document_name
                );
            }
            keep
        });
        let evicted = before - groups.len();
        if evicted > 0 {
            debug!("Group cleanup evicted {} of {} groups", evicted, before);
        }
    }

    /// Replace the idle timeout for all future cleanup passes. Already
    /// evicted groups are not re-evaluated.
    pub fn update_group_timeout(&self, timeout: Duration) {
        *self
            .group_timeout
            .lock()
            .expect("group timeout lock poisoned") = timeout;
        info!("Updated group timeout to {:?}", timeout);
    }

    /// The effective idle timeout.
    pub fn group_timeout(&self) -> Duration {
        *self
            .group_timeout
            .lock()
            .expect("group timeout lock poisoned")
    }

    /// Snapshot of all active groups.
    pub fn active_groups(&self) -> Vec<DocumentGroup> {
        self.groups
            .lock()
            .expect("group table lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

fn group_key(job: &PrintJob) -> GroupKey {
    (job.document_name.clone(), job.owner.clone())
}
