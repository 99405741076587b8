//! Restricted-host detection
//!
//! Some IDE consoles render OSC 8 hyperlinks as garbage, so links are
//! turned off when running under one.

use std::sync::OnceLock;

/// Environment variable set by hosts that cannot render hyperlinks
pub const RESTRICTED_HOST_ENV: &str = "PYCHARM_HOSTED";

/// Whether the process runs under a restricted host; read once
pub fn is_restricted_host() -> bool {
    static RESTRICTED: OnceLock<bool> = OnceLock::new();
    *RESTRICTED.get_or_init(|| flag_set(std::env::var(RESTRICTED_HOST_ENV).ok().as_deref()))
}

fn flag_set(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "0")
}
