//! spoolwatch - live observation core for a host print spooler.
//!
//! Turns the spooler's flat, mutable job list into a de-duplicated,
//! semantically grouped view of documents in flight:
//!
//! - [`monitor`] polls the spooler on a fixed interval, diffs against
//!   previously observed state, and raises create/modify/delete events.
//! - [`grouping`] folds jobs into logical document groups keyed by document
//!   identity, with idle-timeout eviction.
//! - [`analyzer`] classifies each job's document type and print settings
//!   from weak job-record metadata.
//!
//! The OS call surface is abstracted behind [`spooler::SpoolBackend`];
//! presentation subscribes through [`events::EventBus`] and issues commands
//! against [`monitor::PrintJobMonitor`].

pub mod analyzer;
pub mod config;
pub mod events;
pub mod grouping;
pub mod monitor;
pub mod spooler;

pub use config::AppConfig;
pub use events::EventBus;
pub use grouping::GroupingEngine;
pub use monitor::PrintJobMonitor;
pub use spooler::SpoolBackend;

// The data model is re-exported whole so event sinks depend on one crate.
pub use spoolwatch_protocol as protocol;
