//! OAuth 2.0 authorization code flow with PKCE for an installed app.
//!
//! The consent page redirects to a short-lived HTTP listener on the
//! loopback interface, which hands the authorization code back to us. The
//! code is then exchanged, together with the PKCE verifier, for an access
//! and refresh token.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes, before encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long the user gets to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

/// Talks to Google's OAuth endpoints on behalf of one client.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client whose token requests time out after `timeout`.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the browser consent flow and returns fresh tokens.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port can be bound, the user denies access or does not answer in time, the callback state does not match,
    /// or the code exchange is refused.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{port}{CALLBACK_PATH}");
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("opening browser for Google sign-in");
        debug!(url = %auth_url, "authorization URL");
        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser to continue:\n\n{auth_url}\n");
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, accept_callback(&listener))
            .await
            .map_err(|_| ProviderError::authentication("timed out waiting for the OAuth callback"))??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication("OAuth state mismatch"));
        }

        info!("received authorization code, exchanging for tokens");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let response = self.post_token_form(&params, "token exchange").await?;

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Trades a refresh token for a new access token.
    ///
    /// Returns the access token and its lifetime in seconds, if given.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_form(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{what} request failed")).with_source(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("{what}: failed to read response")).with_source(e))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{what} failed ({status}): {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("{what}: invalid token response")).with_source(e)
        })
    }
}

/// Binds the first free port of `port_range`, or any free port once the
/// range is exhausted. Google accepts any port for loopback redirects.
async fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            return bound(listener);
        }
    }
    debug!(
        start = port_range.0,
        end = port_range.1,
        "loopback port range busy, using an ephemeral port"
    );
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.map_err(|e| {
        ProviderError::configuration("failed to bind a loopback port").with_source(e)
    })?;
    bound(listener)
}

fn bound(listener: TcpListener) -> ProviderResult<(TcpListener, u16)> {
    let port = listener
        .local_addr()
        .map_err(|e| ProviderError::internal("loopback listener has no address").with_source(e))?
        .port();
    debug!(port, "loopback listener bound");
    Ok((listener, port))
}

/// Serves connections until one of them is the OAuth redirect.
async fn accept_callback(listener: &TcpListener) -> ProviderResult<AuthorizationCallback> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| ProviderError::internal("loopback accept failed").with_source(e))?;

        let (read_half, mut write_half) = stream.into_split();
        let mut request_line = String::new();
        if BufReader::new(read_half)
            .read_line(&mut request_line)
            .await
            .is_err()
        {
            continue;
        }

        let Some(outcome) = parse_callback_request(&request_line) else {
            debug!(%peer, "ignoring unrelated request on loopback listener");
            continue;
        };

        let page = match &outcome {
            Ok(_) => {
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
                <html><body><h1>Signed in</h1>\
                <p>You can close this window and return to the terminal.</p></body></html>"
            }
            Err(_) => {
                "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
                <html><body><h1>Sign-in failed</h1>\
                <p>You can close this window.</p></body></html>"
            }
        };
        let _ = write_half.write_all(page.as_bytes()).await;
        let _ = write_half.shutdown().await;

        return outcome;
    }
}

/// Code and state carried by the redirect.
#[derive(Debug, PartialEq, Eq)]
struct AuthorizationCallback {
    code: String,
    state: String,
}

/// Parses `GET /callback?... HTTP/1.1`.
///
/// Returns `None` for requests that are not the redirect (favicon fetches
/// and the like), which the listener keeps waiting through.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<AuthorizationCallback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {error}"
        ))));
    }

    Some(match code {
        Some(code) => Ok(AuthorizationCallback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// RFC 7636 verifier, challenge and CSRF state for one sign-in.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Builds the consent page URL. Requests offline access so a refresh
    /// token is issued.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{GOOGLE_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
