//! Google implementation of [`Authenticator`].

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Authenticator, BoxFuture, Credential};

use super::client::GoogleApiClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{CredentialState, TokenInfo, TokenStorage};

/// Signs in to Google, caching tokens on disk between runs.
#[derive(Debug)]
pub struct GoogleAuthenticator {
    config: GoogleConfig,
    api: GoogleApiClient,
    storage: TokenStorage,
}

impl GoogleAuthenticator {
    /// # Errors
    ///
    /// Returns a configuration error if the config does not validate.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let api = GoogleApiClient::new(config.timeout, &config.user_agent)?;
        let storage = TokenStorage::new(&config.token_path);
        Ok(Self {
            config,
            api,
            storage,
        })
    }

    /// Token endpoint client. Client secrets are only needed from here on,
    /// so a valid cached token never touches them.
    fn oauth_client(&self) -> ProviderResult<OAuthClient> {
        OAuthClient::new(self.config.credentials.load()?, self.config.timeout)
    }

    /// Reads the token cache and classifies it for this run's scopes.
    pub fn credential_state(&self) -> ProviderResult<CredentialState> {
        let cached = self.storage.load()?;
        Ok(CredentialState::classify(cached, &self.config.scopes, Utc::now()))
    }

    async fn refresh(&self, mut tokens: TokenInfo) -> ProviderResult<TokenInfo> {
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or_else(|| ProviderError::internal("refreshable token without refresh token"))?;
        let (access_token, expires_in) = self.oauth_client()?.refresh_token(&refresh_token).await?;
        tokens.update_access_token(access_token, expires_in);
        Ok(tokens)
    }

    async fn sign_in(&self) -> ProviderResult<TokenInfo> {
        info!("Google sign-in required");
        self.oauth_client()?
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
    }

    async fn obtain(&self) -> ProviderResult<Credential> {
        let tokens = match self.credential_state()? {
            CredentialState::Valid(tokens) => {
                debug!("using cached access token");
                return Ok(Credential::new(tokens.access_token));
            }
            CredentialState::Refreshable(tokens) => match self.refresh(tokens).await {
                Ok(tokens) => tokens,
                Err(e) if e.is_auth() => {
                    warn!(error = %e, "token refresh rejected, signing in again");
                    self.sign_in().await?
                }
                Err(e) => return Err(e),
            },
            CredentialState::InteractiveRequired => self.sign_in().await?,
        };

        self.storage.save(&tokens)?;
        Ok(Credential::new(tokens.access_token))
    }
}

impl Authenticator for GoogleAuthenticator {
    fn obtain_credential(&self) -> BoxFuture<'_, ProviderResult<Credential>> {
        Box::pin(async move { self.obtain().await.map_err(|e| e.with_provider("google")) })
    }

    fn resolve_user_email<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.api
                .user_email(credential.access_token())
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }
}
