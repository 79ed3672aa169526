//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_agent_name() -> String {
    "irc".to_string()
}

pub fn default_nickname() -> String {
    "ircbridge".to_string()
}

pub fn default_realname() -> String {
    "ircbridge relay agent".to_string()
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_hostname() -> String {
    "irc.libera.chat".to_string()
}

pub fn default_port() -> u16 {
    6697
}

// =============================================================================
// Timeout Defaults (seconds)
// =============================================================================

pub fn default_connect_timeout() -> u64 {
    30
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_whois_timeout() -> u64 {
    30
}

pub fn default_shutdown_timeout() -> u64 {
    10
}
