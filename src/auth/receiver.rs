use crate::error::{AppError, Result};
use async_trait::async_trait;
use dialoguer::Input;
use oauth2::{AuthorizationCode, CsrfToken};
use std::sync::Arc;
use tiny_http::{Request, Response, Server};
use tracing::debug;
use url::Url;

const CALLBACK_PATH: &str = "/callback";

/// Hands the authorization URL to the operator and waits for the resulting code.
#[async_trait]
pub trait CodeReceiver: Send + Sync {
    /// Redirect URI this receiver listens on. `None` uses the one from the client secret.
    fn redirect_uri(&self) -> Option<String> {
        None
    }

    async fn receive_code(
        &self,
        authorize_url: &Url,
        state: &CsrfToken,
    ) -> Result<AuthorizationCode>;
}

/// Prints the URL and reads the pasted authorization code from the terminal.
#[derive(Debug, Default, Clone)]
pub struct ConsoleReceiver;

#[async_trait]
impl CodeReceiver for ConsoleReceiver {
    async fn receive_code(
        &self,
        authorize_url: &Url,
        _state: &CsrfToken,
    ) -> Result<AuthorizationCode> {
        println!("Go to the following link in your browser, then paste the authorization code:");
        println!("{}", authorize_url);
        println!();

        let code = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("Authorization code")
                .interact_text()
        })
        .await
        .map_err(|e| AppError::Auth(format!("Authorization prompt failed: {}", e)))?
        .map_err(|e| AppError::Auth(format!("Failed to read authorization code: {}", e)))?;

        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Auth("Empty authorization code".to_string()));
        }

        Ok(AuthorizationCode::new(code.to_string()))
    }
}

/// Receives the authorization code on a local HTTP listener.
pub struct LoopbackReceiver {
    server: Arc<Server>,
    port: u16,
}

impl LoopbackReceiver {
    /// Listen on `127.0.0.1:<port>`. Port `0` picks a free port.
    pub fn bind(port: u16) -> Result<Self> {
        let bind_addr = format!("127.0.0.1:{}", port);
        let server = Server::http(&bind_addr)
            .map_err(|e| AppError::Auth(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AppError::Auth(format!("No TCP address bound for {}", bind_addr)))?;

        Ok(Self {
            server: Arc::new(server),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn next_request(&self) -> Result<Request> {
        let server = Arc::clone(&self.server);
        let waiting = tokio::task::spawn_blocking(move || server.recv());

        // Wakes the blocked recv if this future is dropped before a request arrives
        let mut guard = UnblockOnDrop {
            server: &self.server,
            armed: true,
        };
        let result = waiting.await;
        guard.armed = false;

        result
            .map_err(|e| AppError::Auth(format!("Callback listener failed: {}", e)))?
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))
    }

    fn respond(request: Request, status: u16, body: &str) -> Result<()> {
        let response = Response::from_string(body).with_status_code(status);
        request
            .respond(response)
            .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))
    }
}

impl Drop for LoopbackReceiver {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

struct UnblockOnDrop<'a> {
    server: &'a Server,
    armed: bool,
}

impl Drop for UnblockOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.server.unblock();
        }
    }
}

#[async_trait]
impl CodeReceiver for LoopbackReceiver {
    fn redirect_uri(&self) -> Option<String> {
        Some(format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH))
    }

    async fn receive_code(
        &self,
        authorize_url: &Url,
        state: &CsrfToken,
    ) -> Result<AuthorizationCode> {
        println!("Open this URL in your browser:\n{}", authorize_url);
        println!();
        println!("Waiting for authorization...");

        loop {
            let request = self.next_request().await?;

            let callback_url = format!("http://127.0.0.1:{}{}", self.port, request.url());
            let url = Url::parse(&callback_url)
                .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;

            if url.path() != CALLBACK_PATH {
                debug!(path = url.path(), "Ignoring request outside the callback path");
                Self::respond(request, 404, "Not found")?;
                continue;
            }

            let param = |name: &str| {
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            };

            if let Some(error) = param("error") {
                Self::respond(request, 400, "Authorization failed. You can close this window.")?;
                return Err(AppError::Auth(format!("Authorization denied: {}", error)));
            }

            let Some(code) = param("code") else {
                Self::respond(request, 400, "Missing authorization code.")?;
                return Err(AppError::Auth("No code in callback".to_string()));
            };

            if param("state").as_deref() != Some(state.secret().as_str()) {
                Self::respond(request, 400, "Invalid state.")?;
                return Err(AppError::Auth("CSRF token mismatch".to_string()));
            }

            Self::respond(
                request,
                200,
                "Authentication successful! You can close this window.",
            )?;

            return Ok(AuthorizationCode::new(code));
        }
    }
}
