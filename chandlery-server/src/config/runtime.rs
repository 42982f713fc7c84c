//! Runtime configuration shared across handlers and background tasks.
//!
//! Each SIGHUP-reloadable section sits behind its own lock so a reload
//! never blocks unrelated readers.

use std::sync::Arc;

use chandlery_core::rails::PayeeSettings;
use chandlery_core::reconcile::PollerSettings;
use tokio::sync::RwLock;

/// Admin credentials (argon2 hash of the configured secret).
#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Verify a presented plaintext secret against the stored hash.
    pub fn verify(&self, presented: &str) -> bool {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};

        let Ok(parsed) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(presented.as_bytes(), &parsed)
            .is_ok()
    }
}

/// All reloadable configuration sections, each behind its own lock.
#[derive(Clone)]
pub struct SharedConfig {
    pub admin: Arc<RwLock<AdminConfig>>,
    pub payee: Arc<RwLock<PayeeSettings>>,
    pub poller: Arc<RwLock<PollerSettings>>,
}
