//! TOML file configuration structures.
//!
//! These structs directly map to the `chandlery-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub payee: PayeeConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Bank-transfer payee details shown to buyers on that rail.
/// SIGHUP-reloadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayeeConfig {
    pub phone_number: String,
    pub bank: String,
    pub identification_number: String,
    pub holder_name: String,
}

/// Payment provider endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub card: CardProviderConfig,
    pub crypto: CryptoProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardProviderConfig {
    pub api_base: Url,
    pub api_key: String,
    /// ISO currency code the card provider charges in.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoProviderConfig {
    pub api_base: Url,
    pub api_key: String,
}

/// Background reconciliation settings. SIGHUP-reloadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_reconcile_batch")]
    pub batch_size: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval(),
            batch_size: default_reconcile_batch(),
        }
    }
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_reconcile_batch() -> i64 {
    50
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}
