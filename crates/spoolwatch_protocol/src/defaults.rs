//! Canonical default values shared across the monitor and configuration.

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_GROUP_TIMEOUT_MINUTES: u64 = 60;
pub const DEFAULT_MAX_ANALYZED_FILE_SIZE_MB: u64 = 100;
pub const DEFAULT_PAPER_SIZE: &str = "A4";
pub const DEFAULT_ORIENTATION: &str = "Portrait";
pub const DEFAULT_COPIES: u32 = 1;
