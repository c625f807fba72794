use crate::config::SessionConfig;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// How long a locally signed token stays valid.
pub const LOCAL_TOKEN_TTL_HOURS: i64 = 6;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token endpoint returned {0}")]
    Endpoint(reqwest::StatusCode),
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to sign access token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(
        "no way to obtain an access token: set LIVEKIT_TOKEN_ENDPOINT to a server-side \
         endpoint, or LIVEKIT_API_KEY and LIVEKIT_API_SECRET for local development"
    )]
    MissingCredentials,
}

// Anything that can hand out a room access credential. The session client
// only depends on this trait, so tests swap in `MockTokenIssuer`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, room: &str, identity: &str) -> Result<SecretString, TokenError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    room_name: &'a str,
    participant_name: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Asks a server-side endpoint for a token. The recommended setup.
pub struct EndpointTokenIssuer {
    client: reqwest::Client,
    endpoint: String,
}

impl EndpointTokenIssuer {
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl TokenIssuer for EndpointTokenIssuer {
    async fn issue(&self, room: &str, identity: &str) -> Result<SecretString, TokenError> {
        tracing::debug!("requesting token for {} in {}", identity, room);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TokenRequest {
                room_name: room,
                participant_name: identity,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Endpoint(status));
        }
        let body: TokenResponse = response.json().await?;
        Ok(SecretString::from(body.token))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant {
    room: String,
    room_join: bool,
    can_publish: bool,
    can_subscribe: bool,
    can_publish_data: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    nbf: i64,
    exp: i64,
    video: VideoGrant,
}

/// Signs tokens in-process with the API key pair.
///
/// Development only: whoever runs this holds the API secret.
pub struct LocalTokenSigner {
    api_key: String,
    api_secret: SecretString,
}

impl LocalTokenSigner {
    pub fn new(api_key: &str, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret,
        }
    }

    fn sign(&self, room: &str, identity: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let claims = Claims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now.timestamp(),
            exp: (now + chrono::Duration::hours(LOCAL_TOKEN_TTL_HOURS)).timestamp(),
            video: VideoGrant {
                room: room.to_string(),
                room_join: true,
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
            },
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes()),
        )
    }
}

#[async_trait]
impl TokenIssuer for LocalTokenSigner {
    async fn issue(&self, room: &str, identity: &str) -> Result<SecretString, TokenError> {
        tracing::warn!("signing access token locally; use a token endpoint in production");
        Ok(SecretString::from(self.sign(room, identity)?))
    }
}

/// Picks the token source from configuration: endpoint first, then the local
/// signing pair. With neither, every `issue` fails.
pub enum ConfiguredIssuer {
    Endpoint(EndpointTokenIssuer),
    Local(LocalTokenSigner),
    Unconfigured,
}

impl ConfiguredIssuer {
    pub fn from_config(config: &SessionConfig) -> Self {
        if let Some(endpoint) = config.token_endpoint() {
            return Self::Endpoint(EndpointTokenIssuer::new(endpoint));
        }
        match (config.api_key(), config.api_secret()) {
            (Some(key), Some(secret)) => Self::Local(LocalTokenSigner::new(key, secret.clone())),
            _ => Self::Unconfigured,
        }
    }
}

#[async_trait]
impl TokenIssuer for ConfiguredIssuer {
    async fn issue(&self, room: &str, identity: &str) -> Result<SecretString, TokenError> {
        match self {
            Self::Endpoint(issuer) => issuer.issue(room, identity).await,
            Self::Local(signer) => signer.issue(room, identity).await,
            Self::Unconfigured => Err(TokenError::MissingCredentials),
        }
    }
}
