use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Cached OAuth2 token, stored as JSON in the token file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` means the token does not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Build a token from a token endpoint response.
    ///
    /// Refresh responses usually omit the refresh token, in which case
    /// `fallback_refresh_token` is kept.
    pub(crate) fn from_response(
        response: &BasicTokenResponse,
        fallback_refresh_token: Option<&str>,
    ) -> Self {
        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| fallback_refresh_token.map(str::to_string));

        let expiry = response
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Token {
            access_token: response.access_token().secret().clone(),
            token_type: response.token_type().as_ref().to_string(),
            refresh_token,
            expiry,
        }
    }

    /// Whether the access token is expired or expires within five minutes.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry < Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    /// Read a token from `path`. A missing or unparsable file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Auth(format!(
                    "Failed to read token file {:?}: {}",
                    path, e
                )));
            }
        };

        match serde_json::from_str(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(path = ?path, "Ignoring unreadable token file: {}", e);
                Ok(None)
            }
        }
    }

    /// Write the token to `path`, readable and writable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Auth(format!("Failed to create token cache directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Auth(format!("Failed to serialize token: {}", e)))?;

        // Create file with owner-only permissions from the start to avoid race condition
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| AppError::Auth(format!("Failed to create token file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::Auth(format!("Failed to write token file: {}", e)))?;

        debug!(path = ?path, "Saved token");
        Ok(())
    }
}

/// Clear a cached token by deleting the token file
#[instrument(name = "Clearing cached token", skip_all)]
pub fn clear_tokens(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!("No cached token to clear");
        return Ok(());
    }

    fs::remove_file(path)
        .map_err(|e| AppError::Auth(format!("Failed to delete token file: {}", e)))?;
    debug!(path = ?path, "Cleared cached token");

    Ok(())
}
