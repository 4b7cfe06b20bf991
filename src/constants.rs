// settings defaults
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_WATCH_EXCLUDE: [&str; 2] = ["target", "node_modules"];

// periodic refresh is twice the update interval, kept within these bounds
pub const MIN_PERIODIC_MS: u64 = 1000;
pub const MAX_PERIODIC_MS: u64 = 10_000;

// one extra refresh shortly after start, in case the first ran too early
pub const STARTUP_RECHECK_MS: u64 = 1000;

// watcher
pub const WATCH_POLL_MS: u64 = 300;

// config file location under the user config directory
pub const CONFIG_DIR_NAME: &str = "git-change-count";
pub const CONFIG_FILE_NAME: &str = "config.json";

// display
pub const LABEL_ICON: &str = "⎇";
