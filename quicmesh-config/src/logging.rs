//! `[logging]` table — sink configuration for the four level-specific log
//! files plus stderr, per §6.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Logging {
    /// Directory holding `debug.log`, `info.log`, `warning.log`, `error.log`.
    pub directory: PathBuf,
    pub console_debug: bool,
    pub console_info: bool,
    pub console_warning: bool,
    pub console_error: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            console_debug: false,
            console_info: true,
            console_warning: true,
            console_error: true,
        }
    }
}
