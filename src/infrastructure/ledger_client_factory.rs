//! Ledger Client Factory
//!
//! Builds the Google Sheets ledger driver from the configured credentials.
//! A service-account file wins over an API key; an unusable file falls back
//! to the key with a warning.

use crate::config::AppConfig;
use crate::domain::repositories::ledger::Ledger;
use crate::infrastructure::google_sheets_client::{GoogleSheetsClient, GoogleSheetsConfig};
use crate::infrastructure::service_account::{ServiceAccountError, ServiceAccountKey};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LedgerSetupError {
    #[error("no Google Sheets credentials: set GOOGLE_SERVICE_ACCOUNT_FILE or GOOGLE_API_KEY")]
    NoCredentials,

    #[error("credentials file error: {0}")]
    CredentialsFile(String),

    #[error("service account error: {0}")]
    ServiceAccount(String),

    #[error("failed to create Sheets client: {0}")]
    Client(String),
}

impl From<ServiceAccountError> for LedgerSetupError {
    fn from(err: ServiceAccountError) -> Self {
        match err {
            ServiceAccountError::Io { .. } => LedgerSetupError::CredentialsFile(err.to_string()),
            other => LedgerSetupError::ServiceAccount(other.to_string()),
        }
    }
}

/// Factory for the ledger driver
pub struct LedgerClientFactory;

impl LedgerClientFactory {
    /// Create the ledger driver selected by `config`
    pub fn create(
        config: &AppConfig,
        sheets_config: GoogleSheetsConfig,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Ledger>, LedgerSetupError> {
        let client = Self::create_sheets_client(
            &config.google_service_account_file,
            &config.google_api_key,
            sheets_config,
        )?;
        Ok(Arc::new(client.with_cancellation(cancel)))
    }

    /// Resolve credentials in precedence order: service-account file, then API key
    pub fn create_sheets_client(
        service_account_file: &str,
        api_key: &str,
        sheets_config: GoogleSheetsConfig,
    ) -> Result<GoogleSheetsClient, LedgerSetupError> {
        if !service_account_file.is_empty() {
            match Self::create_service_account_client(service_account_file, sheets_config.clone())
            {
                Ok(client) => {
                    info!(
                        "✓ Google Sheets client created with service account file {}",
                        service_account_file
                    );
                    return Ok(client);
                }
                Err(e) => {
                    warn!("Failed to use service account file: {}", e);
                }
            }
        }

        if api_key.is_empty() {
            error!("✗ No usable Google Sheets credentials");
            return Err(LedgerSetupError::NoCredentials);
        }

        let client = GoogleSheetsClient::new_with_api_key(api_key, sheets_config)
            .map_err(LedgerSetupError::Client)?;
        info!("✓ Google Sheets client created with API key");
        Ok(client)
    }

    fn create_service_account_client(
        path: &str,
        sheets_config: GoogleSheetsConfig,
    ) -> Result<GoogleSheetsClient, LedgerSetupError> {
        let key = ServiceAccountKey::from_file(path)?;
        GoogleSheetsClient::new_with_service_account(key, sheets_config)
            .map_err(LedgerSetupError::Client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::google_sheets_client::SheetsAuth;
    use std::io::Write;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trackmycoin-{}-{}.json",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_service_account_file_wins() {
        let json = serde_json::json!({
            "client_email": "tracker@example.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
        })
        .to_string();
        let path = write_temp("valid", &json);

        let client = LedgerClientFactory::create_sheets_client(
            path.to_str().unwrap(),
            "fallback-key",
            GoogleSheetsConfig::default(),
        )
        .unwrap();
        assert!(matches!(client.auth(), SheetsAuth::ServiceAccount(_)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_api_key() {
        let client = LedgerClientFactory::create_sheets_client(
            "/nonexistent/service-account-file.json",
            "fallback-key",
            GoogleSheetsConfig::default(),
        )
        .unwrap();
        assert!(matches!(client.auth(), SheetsAuth::ApiKey(_)));
    }

    #[test]
    fn test_invalid_file_falls_back_to_api_key() {
        let path = write_temp("invalid", "{ not json");
        let client = LedgerClientFactory::create_sheets_client(
            path.to_str().unwrap(),
            "fallback-key",
            GoogleSheetsConfig::default(),
        )
        .unwrap();
        assert!(matches!(client.auth(), SheetsAuth::ApiKey(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_no_credentials() {
        let result = LedgerClientFactory::create_sheets_client(
            "/nonexistent/service-account-file.json",
            "",
            GoogleSheetsConfig::default(),
        );
        assert!(matches!(result, Err(LedgerSetupError::NoCredentials)));

        let result =
            LedgerClientFactory::create_sheets_client("", "", GoogleSheetsConfig::default());
        assert!(matches!(result, Err(LedgerSetupError::NoCredentials)));
    }

    #[test]
    fn test_setup_error_mapping() {
        let io = ServiceAccountError::Io {
            path: "x.json".to_string(),
            reason: "not found".to_string(),
        };
        assert!(matches!(
            LedgerSetupError::from(io),
            LedgerSetupError::CredentialsFile(_)
        ));
        assert!(matches!(
            LedgerSetupError::from(ServiceAccountError::Parse("bad".to_string())),
            LedgerSetupError::ServiceAccount(_)
        ));
    }
}
