//! Application-wide constants and default values

/// Persistent store defaults
pub mod store {
    use std::time::Duration;

    /// In-memory map is dropped after this long without an operation
    pub const DEFAULT_IDLE_UNLOAD: Duration = Duration::from_secs(5);
}

/// HTTP fetch helper defaults
pub mod fetch {
    use std::time::Duration;

    /// Total attempts on transport failure (HTTP error statuses are not retried)
    pub const DEFAULT_ATTEMPTS: u32 = 5;

    /// Fixed delay between attempts
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
}

/// Periodic synchronization defaults
pub mod sync {
    /// Default interval between scheduled syncs (milliseconds, 24h)
    pub const DEFAULT_INTERVAL_MS: u64 = 1000 * 60 * 60 * 24;

    /// Lower bound so a bogus setting cannot spin the loop
    pub const MIN_INTERVAL_MS: u64 = 1000;
}

/// App lifecycle defaults
pub mod app {
    use std::time::Duration;

    /// Pause between stop and start on a full restart
    pub const RESTART_PAUSE: Duration = Duration::from_secs(3);

    /// Delay before persisting `antidpi.active` after a toggle
    pub const ACTIVATION_SETTLE: Duration = Duration::from_secs(1);

    pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";
    pub const DEFAULT_PORT: &str = "8008";
}

/// Engine distribution defaults
pub mod engine {
    /// Release family identifier recorded in settings
    pub const FAMILY: &str = "zapret2";

    /// Repository publishing engine releases
    pub const DEFAULT_REPO: &str = "bol-van/zapret2";

    pub const GITHUB_BASE: &str = "https://github.com";
    pub const RAW_BASE: &str = "https://raw.githubusercontent.com";

    pub const BINARY_UNIX: &str = "nfqws2";
    pub const BINARY_WINDOWS: &str = "winws2.exe";

    /// Lua entries pinned to the installed release's commit
    pub const PINNED_LUA: [&str; 3] = ["zapret-lib", "zapret-antidpi", "zapret-auto"];
}

/// Self-update defaults
pub mod self_update {
    /// File name the new binary is downloaded to, next to the running executable
    pub const STAGING_FILE: &str = "update.bin";
}

/// Settings namespace keys
pub mod keys {
    pub const VERSION: &str = "version";
    pub const HOSTNAME: &str = "hostname";
    pub const PORT: &str = "port";
    pub const PROFILES: &str = "profiles";

    pub const ENGINE_FAMILY: &str = "antidpi";
    pub const ENGINE_VERSION: &str = "antidpi.version";
    pub const ENGINE_ACTIVE: &str = "antidpi.active";
    pub const ENGINE_DEBUG: &str = "antidpi.debug";

    pub const STARTUP_ARGS: &str = "startup.args";
    pub const STARTUP_SCRIPTS: &str = "startup.scripts";

    pub const UPDATE_SELF: &str = "updater.self";
    pub const UPDATE_ENGINE: &str = "updater.zapret2";
    pub const UPDATE_PROFILES: &str = "updater.profiles";
    pub const UPDATE_LISTS: &str = "updater.lists";
    pub const UPDATE_LUA: &str = "updater.lua";
    pub const UPDATE_BLOBS: &str = "updater.blobs";
    pub const UPDATE_INTERVAL: &str = "updater.interval";
}
