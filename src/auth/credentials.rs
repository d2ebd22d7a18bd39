use crate::error::{AppError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};
use yup_oauth2::ApplicationSecret;

pub(crate) const GOOGLE_OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth client configuration parsed from a Google client-secret file.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub secret: ApplicationSecret,
    /// Requested scopes, in the order the caller gave them.
    pub scopes: Vec<String>,
}

impl ClientConfig {
    /// Redirect URI registered for the client, or the out-of-band URI when none is.
    pub fn redirect_uri(&self) -> &str {
        self.secret
            .redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(GOOGLE_OOB_REDIRECT_URI)
    }
}

/// Load a client-secret file (`installed` or `web` application) for the given scopes.
#[instrument(name = "Loading client credentials", skip(scopes))]
pub fn load_config<S: AsRef<str>>(credentials_path: &Path, scopes: &[S]) -> Result<ClientConfig> {
    let contents = fs::read(credentials_path).map_err(|e| {
        AppError::Config(format!(
            "Unable to read client secret file {:?}: {}",
            credentials_path, e
        ))
    })?;

    let secret = yup_oauth2::parse_application_secret(&contents).map_err(|e| {
        AppError::Config(format!(
            "Unable to parse client secret file {:?}: {}",
            credentials_path, e
        ))
    })?;

    if secret.client_id.is_empty() {
        return Err(AppError::Config(format!(
            "Client secret file {:?} has an empty client_id",
            credentials_path
        )));
    }

    let scopes: Vec<String> = scopes.iter().map(|s| s.as_ref().to_string()).collect();
    debug!(client_id = %secret.client_id, scopes = scopes.len(), "Loaded client secret");

    Ok(ClientConfig { secret, scopes })
}
