use crate::types::{BackendType, NativeLogLevel};

/// Process-level options applied when an [`Instance`](crate::Instance) is created.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verbosity of the native library's own logging
    pub native_log_level: NativeLogLevel,
    /// Route native log lines into `tracing`
    pub forward_native_logs: bool,
    /// Backend used by adapter requests that do not pick one
    pub backend: Option<BackendType>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            native_log_level: NativeLogLevel::WARN,
            forward_native_logs: true,
            backend: None,
        }
    }
}
