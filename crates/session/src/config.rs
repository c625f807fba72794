//! Session configuration.
//!
//! Values come from a builder or from the environment (`.env` supported).
//! A missing service URL is not a load error: it is reported when `connect`
//! is attempted, so the rest of the application can still start.

use secrecy::SecretString;
use std::collections::HashMap;
use std::path::Path;

pub const URL_VAR: &str = "LIVEKIT_URL";
pub const TOKEN_ENDPOINT_VAR: &str = "LIVEKIT_TOKEN_ENDPOINT";
pub const API_KEY_VAR: &str = "LIVEKIT_API_KEY";
pub const API_SECRET_VAR: &str = "LIVEKIT_API_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("{0} is set but {1} is not; both are needed for local token signing")]
    IncompleteCredentials(&'static str, &'static str),
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    url: Option<String>,
    token_endpoint: Option<String>,
    api_key: Option<String>,
    api_secret: Option<SecretString>,
}

pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = Some(url.to_string());
        self
    }

    pub fn with_token_endpoint(mut self, endpoint: &str) -> Self {
        self.config.token_endpoint = Some(endpoint.to_string());
        self
    }

    /// Development only: lets the client sign its own tokens.
    pub fn with_api_credentials(mut self, key: &str, secret: &str) -> Self {
        self.config.api_key = Some(key.to_string());
        self.config.api_secret = Some(SecretString::from(secret.to_string()));
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Loads configuration from the process environment.
    ///
    // *   `LIVEKIT_URL`: realtime service URL. Required at connect time.
    // *   `LIVEKIT_TOKEN_ENDPOINT`: (Optional) server-side token endpoint. Preferred.
    // *   `LIVEKIT_API_KEY` / `LIVEKIT_API_SECRET`: (Optional) local signing pair,
    //     development only.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignored if there is no .env file.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from a specific env file. Values in the file win
    /// over the process environment; the process environment is not modified.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path.as_ref())? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Self::from_lookup(|name| vars.get(name).cloned().or_else(|| std::env::var(name).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset.
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_VAR);
        let api_secret = var(API_SECRET_VAR);
        match (&api_key, &api_secret) {
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials(API_KEY_VAR, API_SECRET_VAR));
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials(API_SECRET_VAR, API_KEY_VAR));
            }
            _ => {}
        }

        Ok(Self {
            url: var(URL_VAR),
            token_endpoint: var(TOKEN_ENDPOINT_VAR),
            api_key,
            api_secret: api_secret.map(SecretString::from),
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn token_endpoint(&self) -> Option<&str> {
        self.token_endpoint.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn api_secret(&self) -> Option<&SecretString> {
        self.api_secret.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    fn env_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_values_from_env_file() {
        let file = env_file(
            "LIVEKIT_URL=wss://example.livekit.cloud\n\
             LIVEKIT_TOKEN_ENDPOINT=https://example.com/token\n\
             LIVEKIT_API_KEY=devkey\n\
             LIVEKIT_API_SECRET=devsecret\n",
        );
        let config = SessionConfig::from_env_file(file.path()).unwrap();

        assert_eq!(config.url(), Some("wss://example.livekit.cloud"));
        assert_eq!(config.token_endpoint(), Some("https://example.com/token"));
        assert_eq!(config.api_key(), Some("devkey"));
        assert_eq!(config.api_secret().unwrap().expose_secret(), "devsecret");
    }

    #[test]
    fn half_a_credential_pair_is_rejected() {
        let file = env_file("LIVEKIT_URL=wss://x\nLIVEKIT_API_KEY=devkey\nLIVEKIT_API_SECRET=\n");
        let err = SessionConfig::from_env_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IncompleteCredentials(API_KEY_VAR, API_SECRET_VAR)
        ));
    }

    #[test]
    fn missing_url_is_not_a_load_error() {
        let config = SessionConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.url(), None);
        assert_eq!(config.token_endpoint(), None);
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SessionConfig::from_env_file(dir.path().join("absent.env"));
        assert!(matches!(result, Err(ConfigError::EnvFile(_))));
    }

    #[test]
    fn builder_sets_fields() {
        let config = SessionConfig::builder()
            .with_url("wss://room")
            .with_api_credentials("k", "s")
            .build();
        assert_eq!(config.url(), Some("wss://room"));
        assert_eq!(config.token_endpoint(), None);
        assert_eq!(config.api_key(), Some("k"));
    }
}
