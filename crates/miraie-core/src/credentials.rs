// ── Credential lifecycle ──
//
// The provider owns the current token pair. It is the only component that
// talks to the identity endpoint; the messaging session reaches it through
// the `CredentialSource` seam.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use miraie_api::{ApiClient, AuthType, Credentials};

use crate::error::CoreError;

/// Something that can hand out the current credentials and mint fresh ones.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// The most recently issued credentials, if a login has happened.
    fn current(&self) -> Option<Arc<Credentials>>;

    /// Log in again and replace the current credentials.
    async fn reauthenticate(&self) -> Result<Arc<Credentials>, CoreError>;
}

/// Logs in against the identity endpoint and caches the result.
pub struct CredentialProvider {
    api: Arc<ApiClient>,
    auth_type: AuthType,
    identifier: String,
    secret: SecretString,
    current: ArcSwapOption<Credentials>,
}

impl CredentialProvider {
    pub fn new(
        api: Arc<ApiClient>,
        auth_type: AuthType,
        identifier: impl Into<String>,
        secret: SecretString,
    ) -> Self {
        Self {
            api,
            auth_type,
            identifier: identifier.into(),
            secret,
            current: ArcSwapOption::empty(),
        }
    }

    /// Log in and store the issued credentials, replacing any previous ones.
    pub async fn login(&self) -> Result<Arc<Credentials>, CoreError> {
        debug!(auth_type = %self.auth_type, "requesting credentials");
        let credentials = self
            .api
            .login(self.auth_type, &self.identifier, &self.secret)
            .await
            .map_err(CoreError::from)?;

        let credentials = Arc::new(credentials);
        self.current.store(Some(Arc::clone(&credentials)));
        info!(user_id = %credentials.user_id, "logged in");
        Ok(credentials)
    }
}

#[async_trait]
impl CredentialSource for CredentialProvider {
    fn current(&self) -> Option<Arc<Credentials>> {
        self.current.load_full()
    }

    async fn reauthenticate(&self) -> Result<Arc<Credentials>, CoreError> {
        self.login().await.inspect_err(|e| {
            warn!(error = %e, "re-login failed");
        })
    }
}
