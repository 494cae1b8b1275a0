//! ID generation utilities.

use rand::{Rng, distributions::Alphanumeric};
use ulid::Ulid;
use uuid::Uuid;

/// Length of the invite code attached to private games.
pub const INVITE_CODE_LEN: usize = 8;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are lexicographically sortable, so ordering by ID roughly
    /// follows creation time.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a cryptographically secure random token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // Use UUID v4 for tokens (no time component for security)
        Uuid::new_v4().simple().to_string()
    }

    /// Generate an invite code: uppercase ASCII letters and digits.
    #[must_use]
    pub fn generate_invite_code(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(INVITE_CODE_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect()
    }
}
