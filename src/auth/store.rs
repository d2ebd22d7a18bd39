use crate::auth::credentials::ClientConfig;
use crate::auth::receiver::CodeReceiver;
use crate::auth::token::Token;
use crate::error::{AppError, Result};
use google_sheets4::common::GetToken;
use oauth2::{
    AuthUrl, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, StandardRevocableToken, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// Reads, obtains and persists the token cached at `token_path`.
pub struct TokenStore {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    scopes: Vec<String>,
    token_path: PathBuf,
    redirect_uri: String,
    authorization_timeout: Option<Duration>,
}

impl TokenStore {
    pub fn new(config: &ClientConfig, token_path: impl Into<PathBuf>) -> Result<Self> {
        let secret = &config.secret;
        let auth_url = AuthUrl::new(secret.auth_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(secret.client_id.clone()))
            .set_client_secret(ClientSecret::new(secret.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
            scopes: config.scopes.clone(),
            token_path: token_path.into(),
            redirect_uri: config.redirect_uri().to_string(),
            authorization_timeout: None,
        })
    }

    /// Bound how long the interactive step waits for the operator.
    pub fn with_authorization_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Return the cached token, or run the interactive flow once and persist its result.
    #[instrument(name = "Obtaining token", skip_all, fields(path = ?self.token_path))]
    pub async fn obtain_token(&self, receiver: &dyn CodeReceiver) -> Result<Token> {
        if let Some(token) = Token::load(&self.token_path)? {
            debug!("Using cached token");
            return Ok(token);
        }

        debug!("No cached token found, starting authorization...");
        let token = self.authorize(receiver).await?;
        token.save(&self.token_path)?;
        info!("Authorization complete, token saved");

        Ok(token)
    }

    async fn authorize(&self, receiver: &dyn CodeReceiver) -> Result<Token> {
        let redirect_uri = receiver
            .redirect_uri()
            .unwrap_or_else(|| self.redirect_uri.clone());
        let redirect_url = RedirectUrl::new(redirect_uri)
            .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?;
        let client = self.client.clone().set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let scopes = self
            .scopes
            .iter()
            .map(|s| Scope::new(s.clone()))
            .collect::<Vec<Scope>>();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes)
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .url();

        let receive = receiver.receive_code(&auth_url, &csrf_token);
        let code = match self.authorization_timeout {
            Some(timeout) => tokio::time::timeout(timeout, receive).await.map_err(|_| {
                AppError::Auth(format!(
                    "Timed out after {:?} waiting for the authorization code",
                    timeout
                ))
            })??,
            None => receive.await?,
        };

        let response = client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;

        Ok(Token::from_response(&response, None))
    }

    /// Exchange the refresh token for a new access token and persist the result.
    #[instrument(name = "Refreshing token", skip_all)]
    pub async fn refresh(&self, token: &Token) -> Result<Token> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| AppError::Auth("No refresh token available".to_string()))?;

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        let refreshed = Token::from_response(&response, Some(refresh_token));
        refreshed.save(&self.token_path)?;

        Ok(refreshed)
    }
}

/// Token provider handed to the API hubs; refreshes expired tokens on demand.
#[derive(Clone)]
pub struct TokenSource {
    store: Arc<TokenStore>,
    token: Arc<Mutex<Token>>,
}

impl TokenSource {
    pub fn new(store: TokenStore, token: Token) -> Self {
        Self {
            store: Arc::new(store),
            token: Arc::new(Mutex::new(token)),
        }
    }

    /// Current access token, refreshed first when it has expired.
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            if token.refresh_token.is_some() {
                *token = self.store.refresh(&token).await?;
            } else {
                warn!("Access token expired and no refresh token is available");
            }
        }

        Ok(token.access_token.clone())
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type GetTokenFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Option<String>, BoxError>> + Send + 'a>>;

impl GetToken for TokenSource {
    fn get_token<'a>(&'a self, _scopes: &'a [&str]) -> GetTokenFuture<'a> {
        Box::pin(async move {
            self.access_token()
                .await
                .map(Some)
                .map_err(|e| Box::new(e) as BoxError)
        })
    }
}
