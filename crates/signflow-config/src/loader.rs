//! Loading and validating `LedgerConfig`.
//!
//! Relative paths in a config file are resolved against the file's own
//! directory, so a config can be moved together with its `var/` tree.

use std::path::Path;

use tracing::debug;

use signflow_contracts::error::{SignflowError, SignflowResult};

use crate::settings::{LedgerConfig, StorageBackend};

impl LedgerConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `SignflowError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or fails `validate`.
    pub fn from_toml_str(s: &str) -> SignflowResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| SignflowError::ConfigError {
            reason: format!("failed to parse ledger config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`.
    pub fn from_file(path: &Path) -> SignflowResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SignflowError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        debug!(
            path = %path.display(),
            backend = ?config.storage.backend,
            "ledger config loaded"
        );
        Ok(config)
    }

    /// Reject values the ledger cannot run with.
    pub fn validate(&self) -> SignflowResult<()> {
        if self.ledger.user_agent_max_chars == 0 {
            return Err(SignflowError::ConfigError {
                reason: "ledger.user_agent_max_chars must be greater than zero".to_string(),
            });
        }

        if self.client_ip.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(SignflowError::ConfigError {
                reason: "client_ip.headers must list at least one header".to_string(),
            });
        }

        if self.storage.backend == StorageBackend::Jsonl && self.storage.path.is_none() {
            return Err(SignflowError::ConfigError {
                reason: "storage.path is required for the jsonl backend".to_string(),
            });
        }

        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(path) = &self.storage.path {
            if path.is_relative() {
                self.storage.path = Some(base.join(path));
            }
        }
        if self.documents.root.is_relative() {
            self.documents.root = base.join(&self.documents.root);
        }
    }
}
