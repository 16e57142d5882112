//! Identity provider client: JWKS-based token verification and the OAuth2
//! authorization-code exchange.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing {0} token")]
    MissingToken(&'static str),

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("unknown signing key '{0}'")]
    UnknownKey(String),

    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("expected an {expected} token")]
    WrongTokenUse { expected: &'static str },

    #[error("access and identity tokens name different subjects")]
    SubjectMismatch,

    #[error("code exchange failed: {0}")]
    Exchange(String),

    #[error("failed to load signing keys: {0}")]
    Jwks(String),
}

impl AuthError {
    /// Failures on our side of the wire rather than a bad credential.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Jwks(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Identity,
}

impl TokenKind {
    fn token_use(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Identity => "id",
        }
    }
}

/// Claims read from either token. Profile fields are only present on identity tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub email_verified: Option<bool>,
    pub token_use: Option<String>,
}

/// Some providers send `email_verified` as `"true"` rather than `true`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Text(String),
    }

    Ok(
        Option::<BoolOrString>::deserialize(deserializer)?.map(|value| match value {
            BoolOrString::Bool(b) => b,
            BoolOrString::Text(s) => s.eq_ignore_ascii_case("true"),
        }),
    )
}

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies signature, expiry and issuer, and returns the claims.
    async fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError>;

    /// Trades an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;
}

/// Minimum gap between two JWKS fetches triggered by unknown key ids.
const JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// The cached key set and when it was last fetched.
struct KeyCache {
    keys: JwkSet,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn refresh_allowed(&self) -> bool {
        self.fetched_at
            .map_or(true, |at| at.elapsed() >= JWKS_REFRESH_INTERVAL)
    }
}

/// OIDC provider backed by a published JWKS.
///
/// The key set is loaded once and re-fetched when a token names a key id we have not
/// seen (key rotation), at most once per `JWKS_REFRESH_INTERVAL`.
pub struct OidcProvider {
    http: Client,
    config: AuthConfig,
    cache: RwLock<KeyCache>,
}

impl OidcProvider {
    /// Loads the key set from `config.jwks_url`.
    pub async fn connect(config: AuthConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Jwks(e.to_string()))?;
        let keys = fetch_jwks(&http, &config.jwks_url).await?;
        info!("Loaded {} signing keys from {}", keys.keys.len(), config.jwks_url);
        Ok(Self::with_keys(http, config, keys))
    }

    /// Starts from an already fetched key set.
    pub fn with_keys(http: Client, config: AuthConfig, keys: JwkSet) -> Self {
        Self {
            http,
            config,
            cache: RwLock::new(KeyCache {
                keys,
                fetched_at: Some(Instant::now()),
            }),
        }
    }

    /// Resolves `kid`, refreshing the key set if it is unknown and the refresh interval
    /// has passed. An unknown key is always a credential failure, even if the refresh fails.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(jwk) = self.cache.read().await.keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if cache.keys.find(kid).is_none() && cache.refresh_allowed() {
            debug!("Signing key '{kid}' not cached, refreshing JWKS");
            cache.fetched_at = Some(Instant::now());
            match fetch_jwks(&self.http, &self.config.jwks_url).await {
                Ok(fresh) => cache.keys = fresh,
                Err(e) => warn!("JWKS refresh failed: {e}"),
            }
        }
        let jwk = cache
            .keys
            .find(kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

async fn fetch_jwks(http: &Client, url: &str) -> Result<JwkSet, AuthError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AuthError::Jwks(e.to_string()))?;
    if !response.status().is_success() {
        return Err(AuthError::Jwks(format!(
            "JWKS endpoint returned {}",
            response.status()
        )));
    }
    response
        .json::<JwkSet>()
        .await
        .map_err(|e| AuthError::Jwks(e.to_string()))
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.required_spec_claims.insert("iss".to_string());
        match kind {
            TokenKind::Identity => {
                validation.set_audience(&[self.config.client_id.as_str()]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            // Access tokens from hosted pools carry `client_id` rather than `aud`.
            TokenKind::Access => validation.validate_aud = false,
        }

        let claims = decode::<TokenClaims>(token, &key, &validation)?.claims;

        if let Some(token_use) = claims.token_use.as_deref() {
            if token_use != kind.token_use() {
                return Err(AuthError::WrongTokenUse {
                    expected: kind.token_use(),
                });
            }
        }
        Ok(claims)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let mut request = self.http.post(&self.config.token_url).form(&form);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(&self.config.client_id, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("token endpoint returned {status}: {body}")));
        }
        response
            .json::<TokenSet>()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))
    }
}
