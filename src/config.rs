use std::time::Duration;

use serde::Deserialize;

use crate::models::ArrowDirections;

/// Plugin configuration, read from `plugins.activity-sheet` in
/// `tauri.conf.json`. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Used when a `present` call does not pass its own directions.
    pub default_arrow_directions: ArrowDirections,
    /// Directory under the system temp dir that holds shared files.
    pub temp_dir_name: String,
    /// How long to wait for the window to lose focus before assuming the
    /// share UI never opened.
    pub dismiss_grace_ms: u64,
    /// Upper bound on how long a desktop share UI is tracked.
    pub dismiss_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_arrow_directions: ArrowDirections::ANY,
            temp_dir_name: "tauri-plugin-activity-sheet".to_string(),
            dismiss_grace_ms: 250,
            dismiss_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn dismiss_timing(&self) -> DismissTiming {
        DismissTiming {
            grace: Duration::from_millis(self.dismiss_grace_ms),
            timeout: Duration::from_secs(self.dismiss_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissTiming {
    pub grace: Duration,
    pub timeout: Duration,
}

impl Default for DismissTiming {
    fn default() -> Self {
        Config::default().dismiss_timing()
    }
}
