//! # courier-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CourierSettings::default()`]
//! 2. **User file**: `~/.courier/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `COURIER_*` overrides (highest priority)
//!
//! Numeric values outside [`bounds`] fail loading with
//! [`SettingsError::OutOfRange`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    bounds, deep_merge, load_settings, load_settings_from_path, settings_path, validate,
};
pub use types::*;
