//! Configuration management for window borders
//!
//! - **raw**: schema of the persisted `app-configs` JSON table
//! - **normalize**: merging and normalization into `ResolvedConfig`
//! - **settings**: typed settings store boundary
//! - **engine**: rule resolution with hot reload

pub mod accent;
pub mod engine;
pub mod normalize;
pub mod raw;
pub mod settings;

// Re-export commonly used types
pub use engine::{ConfigEngine, ListenerId, WindowIdentity};
pub use normalize::{GlobalConfig, ResolvedConfig};
pub use raw::{RawConfig, RawConfigStore, RawEntry};
pub use settings::{MemorySettings, SettingValue, SettingsStore};
