//! Application-wide constants
//!
//! Setting key names, revision numbers and fixed policy values live here so
//! the engine, the manager and the CLI agree on a single source of truth.

/// Persisted settings key names
pub mod keys {
    /// Global toggle for rounded corners
    pub const RADIUS_ENABLED: &str = "radius-enabled";

    /// Track modal dialogs (and transient/attached dialogs)
    pub const MODAL_ENABLED: &str = "modal-enabled";

    /// Emit per-window lifecycle messages at info level
    pub const VERBOSE_LOGGING: &str = "verbose-logging";

    pub const DEFAULT_ENABLED: &str = "default-enabled";
    pub const DEFAULT_MAXIMIZED_BORDERS: &str = "default-maximized-borders";
    pub const DEFAULT_WIDTH: &str = "default-width";
    pub const DEFAULT_MARGINS: &str = "default-margins";
    pub const DEFAULT_RADIUS: &str = "default-radius";
    pub const DEFAULT_ACTIVE_COLOR: &str = "default-active-color";
    pub const DEFAULT_INACTIVE_COLOR: &str = "default-inactive-color";

    /// JSON blob holding presets and per-application rules
    pub const APP_CONFIGS: &str = "app-configs";

    /// Integer revision of the seeded defaults
    pub const CONFIG_VERSION: &str = "config-version";
}

/// Configuration revision bookkeeping
pub mod revision {
    /// Bump when the built-in fallback table or the scalar set changes
    pub const CURRENT: i64 = 3;
}

/// Raw config table grammar
pub mod rules {
    /// Prefix of preset keys and of preset references
    pub const PRESET_SIGIL: char = '@';

    /// Base configuration key
    pub const DEFAULT_KEY: &str = "@default";

    pub const APP_PREFIX: &str = "app:";
    pub const CLASS_PREFIX: &str = "class:";
    pub const REGEX_APP_PREFIX: &str = "regex.app:";
    pub const REGEX_CLASS_PREFIX: &str = "regex.class:";
}

/// Border policy constants
pub mod policy {
    /// Minimum edge-snap tolerance in pixels
    pub const EDGE_EPSILON: i32 = 2;

    /// Smallest overlay extent on either axis
    pub const MIN_OVERLAY_EXTENT: i32 = 1;
}

/// Color constants
pub mod color {
    /// Sentinel value of `default-active-color` selecting the system accent
    pub const AUTO: &str = "auto";

    /// Works well on both dark and light themes
    pub const DEFAULT_ACCENT: &str = "rgba(51, 153, 230, 0.4)";

    pub const DEFAULT_INACTIVE: &str = "rgba(102, 102, 102, 0.2)";
}

/// Settings file location
pub mod config {
    /// Directory name under the user config dir
    pub const APP_DIR: &str = "window-borders";

    /// Settings file name
    pub const FILENAME: &str = "settings.json";
}
