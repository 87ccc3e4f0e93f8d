//! Accent-colored borders drawn around application windows
//!
//! The compositor side is abstracted behind the traits in [`host`]; the
//! [`manager::BorderManager`] drives tracking and restyling from
//! [`host::HostEvent`]s while [`config::ConfigEngine`] resolves per-window
//! styles from the persisted settings.

#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod geometry;
pub mod host;
pub mod manager;
pub mod overlay;
pub mod persistence;
pub mod policy;
pub mod prefs;
pub mod snapping;
pub mod subscription;
pub mod types;

#[cfg(test)]
mod testing;
