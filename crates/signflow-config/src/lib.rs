//! # signflow-config
//!
//! TOML configuration for the SignFlow audit ledger.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use signflow_config::LedgerConfig;
//!
//! let config = LedgerConfig::from_file(Path::new("signflow.toml"))?;
//! ```

pub mod loader;
pub mod settings;

pub use settings::{
    ClientIpSettings, DocumentSettings, LedgerConfig, LedgerSettings, StorageBackend,
    StorageSettings,
};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use signflow_contracts::error::SignflowError;

    use crate::{LedgerConfig, StorageBackend};

    /// An empty document produces the defaults.
    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();

        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.ledger.user_agent_max_chars, 500);
        assert_eq!(config.ledger.append_retries, 3);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.client_ip.headers[0], "client-ip");
        assert_eq!(config.client_ip.headers.len(), 5);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [ledger]
            user_agent_max_chars = 128
            append_retries = 5

            [client_ip]
            headers = ["x-real-ip"]

            [storage]
            backend = "jsonl"
            path = "/srv/signflow/audit.jsonl"

            [documents]
            root = "/srv/signflow/documents"
        "#;

        let config = LedgerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ledger.user_agent_max_chars, 128);
        assert_eq!(config.ledger.append_retries, 5);
        assert_eq!(config.client_ip.headers, vec!["x-real-ip".to_string()]);
        assert_eq!(config.storage.backend, StorageBackend::Jsonl);
        assert_eq!(
            config.storage.path.as_deref(),
            Some(Path::new("/srv/signflow/audit.jsonl"))
        );
        assert_eq!(config.documents.root, PathBuf::from("/srv/signflow/documents"));
    }

    /// The jsonl backend is useless without a file path.
    #[test]
    fn test_jsonl_requires_path() {
        let toml = r#"
            [storage]
            backend = "jsonl"
        "#;

        match LedgerConfig::from_toml_str(toml) {
            Err(SignflowError::ConfigError { reason }) => {
                assert!(reason.contains("storage.path"), "unexpected reason: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_user_agent_bound_rejected() {
        let toml = r#"
            [ledger]
            user_agent_max_chars = 0
        "#;
        assert!(matches!(
            LedgerConfig::from_toml_str(toml),
            Err(SignflowError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_empty_header_list_rejected() {
        let toml = r#"
            [client_ip]
            headers = []
        "#;
        assert!(matches!(
            LedgerConfig::from_toml_str(toml),
            Err(SignflowError::ConfigError { .. })
        ));
    }

    /// Malformed TOML must produce a `ConfigError`.
    #[test]
    fn test_toml_parse_error() {
        let bad_toml = r#"
            this is not valid toml ][[[
        "#;

        match LedgerConfig::from_toml_str(bad_toml) {
            Err(SignflowError::ConfigError { reason }) => {
                assert!(
                    reason.contains("failed to parse ledger config TOML"),
                    "expected parse error message, got: {reason}"
                );
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let toml = r#"
            [storage]
            backend = "postgres"
        "#;
        assert!(matches!(
            LedgerConfig::from_toml_str(toml),
            Err(SignflowError::ConfigError { .. })
        ));
    }

    /// Relative paths resolve against the config file's directory.
    #[test]
    fn test_from_file_resolves_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let path = dir.join("signflow.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"jsonl\"\npath = \"var/audit.jsonl\"\n",
        )
        .unwrap();

        let config = LedgerConfig::from_file(&path).unwrap();
        assert_eq!(config.storage.path, Some(dir.join("var/audit.jsonl")));
        assert_eq!(config.documents.root, dir.join("var/documents"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = LedgerConfig::from_file(Path::new("/nonexistent/signflow.toml"));
        match result {
            Err(SignflowError::ConfigError { reason }) => {
                assert!(reason.contains("failed to read config file"));
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }
}
