use std::env;

use camino::Utf8PathBuf;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default handshake budget for a freshly spawned plugin.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Default budget for a single plugin call.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Plugin API revisions accepted unless configured otherwise.
pub const DEFAULT_API_VERSION: &str = ">=0.0.1, <0.1.0";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default handshake timeout, in seconds.
#[must_use]
pub const fn default_handshake_timeout_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

/// Default call timeout, in seconds.
#[must_use]
pub const fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

/// Owned default API version requirement.
#[must_use]
pub fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_owned()
}

/// Computes the default plugin directory.
///
/// Prefers `<data dir>/pogo/plugins` and falls back to a `pogo/plugins`
/// directory under the system temporary directory.
#[must_use]
pub fn default_plugin_dir() -> Utf8PathBuf {
    let mut base = dirs::data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push("pogo");
    base.push("plugins");
    base
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
