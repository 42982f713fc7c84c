//! Configuration module for chandlery-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chandlery_core::rails::PayeeSettings;
use chandlery_core::reconcile::PollerSettings;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::file::{CardProviderConfig, CryptoProviderConfig, FileConfig};
use crate::config::runtime::{AdminConfig, SharedConfig};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Read the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub admin: AdminConfig,
    pub payee: PayeeSettings,
    pub card: CardProviderConfig,
    pub crypto: CryptoProviderConfig,
    pub poller: PollerSettings,
}

impl LoadedConfig {
    /// Convert the reloadable sections into a SharedConfig.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            admin: Arc::new(RwLock::new(self.admin)),
            payee: Arc::new(RwLock::new(self.payee)),
            poller: Arc::new(RwLock::new(self.poller)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = self.hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(self.build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let payee = &config.payee;
        for (field, value) in [
            ("payee.bank", &payee.bank),
            ("payee.holder_name", &payee.holder_name),
            ("payee.identification_number", &payee.identification_number),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{field} must not be empty"
                )));
            }
        }
        if config.reconcile.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reconcile.interval_secs must be at least 1".to_string(),
            ));
        }
        if config.reconcile.batch_size <= 0 {
            return Err(ConfigError::ValidationError(
                "reconcile.batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn hash_secret(&self, plaintext: &str) -> Result<String, ConfigError> {
        use argon2::{
            Argon2, PasswordHasher,
            password_hash::{SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ConfigError::HashError(e.to_string()))
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    fn build_loaded_config(&self, file_config: FileConfig, secret_hash: String) -> LoadedConfig {
        LoadedConfig {
            listen: file_config.server.listen,
            admin: AdminConfig::new(secret_hash),
            payee: PayeeSettings {
                phone_number: file_config.payee.phone_number,
                bank: file_config.payee.bank,
                identification_number: file_config.payee.identification_number,
                holder_name: file_config.payee.holder_name,
            },
            card: file_config.providers.card,
            crypto: file_config.providers.crypto,
            poller: PollerSettings {
                interval: Duration::from_secs(file_config.reconcile.interval_secs),
                batch_size: file_config.reconcile.batch_size,
            },
        }
    }
}
