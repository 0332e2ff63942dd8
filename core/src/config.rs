//! Configuration for the boxoffice engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional cap on tickets per booking (None = unlimited)
    pub max_quantity: Option<u32>,
    /// Length of generated confirmation codes
    pub code_length: usize,
    /// How many fresh codes to try when inserts collide
    pub code_retries: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_quantity: env::var("BOXOFFICE_MAX_QUANTITY")
                .ok()
                .and_then(|s| s.parse().ok()),
            code_length: env::var("BOXOFFICE_CODE_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            code_retries: env::var("BOXOFFICE_CODE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_quantity: None,
            code_length: 8,
            code_retries: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unlimited_quantity_and_eight_char_codes() {
        let config = Config::default();
        assert_eq!(config.max_quantity, None);
        assert_eq!(config.code_length, 8);
        assert_eq!(config.code_retries, 5);
    }
}
