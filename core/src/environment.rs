//! Injected dependencies for the engine.
//!
//! All external collaborators are abstracted behind traits so tests can swap
//! in deterministic implementations (see the `boxoffice-testing` crate).

use crate::types::ConfirmationCode;
use chrono::{DateTime, Utc};
use rand::Rng;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of confirmation codes.
///
/// Codes are opaque and expected to be unique across the system, but the
/// source itself makes no uniqueness guarantee: collisions are detected at
/// insert time and the engine retries with a fresh code.
pub trait ConfirmationCodes: Send + Sync {
    /// Issue a new candidate code
    fn issue(&self) -> ConfirmationCode;
}

/// Alphabet for generated codes: uppercase letters and digits
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Production code source: random uppercase-alphanumeric strings
#[derive(Debug, Clone, Copy)]
pub struct RandomCodes {
    length: usize,
}

impl RandomCodes {
    /// Creates a code source issuing codes of `length` characters
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomCodes {
    fn default() -> Self {
        Self::new(8)
    }
}

impl ConfirmationCodes for RandomCodes {
    fn issue(&self) -> ConfirmationCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[idx])
            })
            .collect();
        ConfirmationCode::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_codes_use_the_configured_length() {
        let codes = RandomCodes::new(8);
        let code = codes.issue();
        assert_eq!(code.as_str().len(), 8);
        assert!(
            code.as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn system_clock_is_monotonic_enough_for_timestamps() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
