use crate::auth::{CodeReceiver, ConsoleReceiver, TokenSource, TokenStore, load_config};
use crate::cancel::cancellable;
use crate::error::Result;
use crate::sheets::client::Session;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Where to find the client secret and token cache, and which scopes to request.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessConfig {
    /// Cached token. Deleting this file forces a new authorization; it must be
    /// deleted whenever `scopes` change.
    pub token_path: PathBuf,
    /// Client secret downloaded from the Google Cloud console.
    pub credentials_path: PathBuf,
    pub scopes: Vec<String>,
}

impl AccessConfig {
    pub fn new(
        token_path: impl Into<PathBuf>,
        credentials_path: impl Into<PathBuf>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            credentials_path: credentials_path.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Builds a [`Session`] from an [`AccessConfig`].
pub struct Connector {
    access: AccessConfig,
    receiver: Box<dyn CodeReceiver>,
    authorization_timeout: Option<Duration>,
    cancel: CancellationToken,
    sheets_base_url: Option<String>,
    drive_base_url: Option<String>,
}

impl Connector {
    pub fn new(access: AccessConfig) -> Self {
        Self {
            access,
            receiver: Box::new(ConsoleReceiver),
            authorization_timeout: None,
            cancel: CancellationToken::new(),
            sheets_base_url: None,
            drive_base_url: None,
        }
    }

    /// Operator collaborator used when no cached token exists.
    pub fn code_receiver(mut self, receiver: impl CodeReceiver + 'static) -> Self {
        self.receiver = Box::new(receiver);
        self
    }

    pub fn authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = Some(timeout);
        self
    }

    /// Cancels the connection and every operation on the resulting session.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn sheets_base_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_base_url = Some(url.into());
        self
    }

    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.drive_base_url = Some(url.into());
        self
    }

    /// Load credentials, obtain a token and open the session.
    #[instrument(name = "Connecting to Google Sheets", skip_all)]
    pub async fn connect(self) -> Result<Session> {
        let cancel = self.cancel.clone();
        cancellable(&cancel, self.connect_inner()).await
    }

    async fn connect_inner(self) -> Result<Session> {
        let client_config = load_config(&self.access.credentials_path, &self.access.scopes)?;
        let store = TokenStore::new(&client_config, &self.access.token_path)?
            .with_authorization_timeout(self.authorization_timeout);

        let token = store.obtain_token(self.receiver.as_ref()).await?;
        let source = TokenSource::new(store, token);

        let mut session = Session::new(source, self.cancel)?;
        if let Some(url) = self.sheets_base_url {
            session.set_sheets_base_url(url);
        }
        if let Some(url) = self.drive_base_url {
            session.set_drive_base_url(url);
        }

        Ok(session)
    }
}
