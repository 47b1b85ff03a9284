use anyhow::Result;
use std::env;
use std::sync::OnceLock;
use tracing::error;

use crate::client::ApiClient;
use crate::config::ConfigError;

pub const API_KEY_ENV: &str = "MK_CSM_KEY";

type CredentialSource = Box<dyn Fn() -> Option<String>>;

/// Owns the single Dashboard API handle for the process.
///
/// The credential is read on the first call to [`Session::client`], not when
/// the session is built, so commands that never talk to the API work without it.
pub struct Session {
    base_url: String,
    credential: CredentialSource,
    client: OnceLock<ApiClient>,
}

impl Session {
    pub fn from_env(base_url: &str) -> Self {
        Self::with_credential(base_url, || env::var(API_KEY_ENV).ok())
    }

    pub fn with_credential<F>(base_url: &str, credential: F) -> Self
    where
        F: Fn() -> Option<String> + 'static,
    {
        Self {
            base_url: base_url.to_string(),
            credential: Box::new(credential),
            client: OnceLock::new(),
        }
    }

    pub fn client(&self) -> Result<&ApiClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let Some(api_key) = (self.credential)()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
        else {
            error!("Environment variable '{}' not found.", API_KEY_ENV);
            return Err(ConfigError::MissingApiKey.into());
        };

        let client = ApiClient::new(&self.base_url, &api_key)?;
        Ok(self.client.get_or_init(|| client))
    }
}

/// Whether the credential is present, without reading its value into a client.
pub fn api_key_configured() -> bool {
    env::var(API_KEY_ENV)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}
