//! Store configuration.

/// When appended records are forced to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// fsync after every append. An acknowledged write survives power loss.
    PerWrite,
    /// Flush to the OS after every append and fsync once `max_pending`
    /// appends have accumulated, on [`crate::Store::sync`], and on close.
    Batched {
        /// Appends allowed between fsyncs.
        max_pending: usize,
    },
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the log file if it doesn't exist.
    pub create_if_missing: bool,

    /// Durability granularity of appends.
    pub sync_mode: SyncMode,

    /// Fail `open` on any corrupt record instead of skipping it.
    pub strict_recovery: bool,

    /// Largest payload accepted on write.
    pub max_payload_len: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_mode: SyncMode::PerWrite,
            strict_recovery: false,
            max_payload_len: 16 * 1024 * 1024, // 16 MiB
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the log if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the sync mode.
    #[must_use]
    pub const fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Sets whether corrupt records abort recovery.
    #[must_use]
    pub const fn strict_recovery(mut self, value: bool) -> Self {
        self.strict_recovery = value;
        self
    }

    /// Sets the maximum payload length.
    #[must_use]
    pub const fn max_payload_len(mut self, len: u32) -> Self {
        self.max_payload_len = len;
        self
    }
}
